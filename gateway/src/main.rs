use tracing::{error, info};
use warden_bootstrap::{init_runtime, shutdown_signal};
use warden_config::AppConfig;
use warden_gateway::app::App;

#[tokio::main]
async fn main() {
    let config = match AppConfig::load("config") {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_runtime(&config);

    let app = match App::build(&config).await {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "failed to build application");
            std::process::exit(1);
        }
    };

    info!(app_name = %config.app_name, "gateway started");

    shutdown_signal().await;

    app.stop();
    info!("gateway stopped");
}
