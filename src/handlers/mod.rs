pub mod vote;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::Config;
use crate::db::{JsonFileStore, VoteStore};
use crate::error::AppError;
use crate::models::LanguageCode;
use crate::translations::{TranslationTable, resolve_table};
use crate::wordcloud::CloudRenderer;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn VoteStore>,
    pub renderer: CloudRenderer,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let store = Arc::new(JsonFileStore::new(&config.votes_file));
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn VoteStore>) -> Arc<Self> {
        let renderer = CloudRenderer::new(&config);
        Arc::new(Self { config, store, renderer })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let templates = &state.config.templates_dir;

    Router::new()
        .route_service("/", ServeFile::new(templates.join("index.html")))
        .route_service("/wordcloud", ServeFile::new(templates.join("wordcloud.html")))
        .route("/translations/{file}", get(translations_handler))
        .route("/submit-vote", post(vote::submit_vote))
        .route("/preview-wordcloud", post(vote::preview_wordcloud))
        .route("/regenerate-wordcloud", post(vote::regenerate_wordcloud))
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .with_state(state)
}

// Serves `<lang>.json`, substituting the default language when it is missing.
async fn translations_handler(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<Json<TranslationTable>, AppError> {
    let code = file
        .strip_suffix(".json")
        .ok_or_else(|| AppError::InvalidLanguage(file.clone()))?;
    let language = LanguageCode::parse(code)?;

    let table = blocking(move || Ok(resolve_table(&state.config.translations_dir, &language))).await?;
    Ok(Json(table))
}

// File IO and rendering stay off the async workers.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
}
