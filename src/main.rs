use cloud_vote::config::Config;
use log::error;

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return;
        }
    };

    if let Err(e) = cloud_vote::start_server(config).await {
        error!("Server error: {}", e);
    }
}
