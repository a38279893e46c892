use log::*;
use service::{config::Config, logging::Logger};

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("Starting chat relay in {} mode", config.runtime_env());

    let app_state = web::AppState::new(service::AppState::new(config));

    // The default channel always exists so the first subscriber never lands
    // in an empty directory.
    app_state
        .directory
        .create_channel(
            &app_state.publisher,
            domain::DEFAULT_CHANNEL_ID,
            &app_state.service.config.default_channel_name,
        )
        .await;

    if let Err(e) = web::init_server(app_state).await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}
