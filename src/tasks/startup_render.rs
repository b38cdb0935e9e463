use log::{error, info};
use std::sync::Arc;

use crate::handlers::AppState;
use crate::wordcloud::BatchPolicy;

// Gives the results page an image before the first vote of this run.
pub async fn render_startup_clouds(state: Arc<AppState>) {
    info!("Rendering word clouds from persisted votes...");

    let result = tokio::task::spawn_blocking(move || {
        let record = state.store.load();
        state.renderer.render_all(&record, BatchPolicy::LogAndContinue)
    })
    .await;

    match result {
        Ok(Ok(written)) => info!("Startup render wrote {} image(s)", written.len()),
        Ok(Err(e)) => error!("Startup render failed: {}", e),
        Err(e) => error!("Startup render task failed: {}", e),
    }
}
