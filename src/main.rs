use std::error::Error;

use clap::Parser;
use health_sphere::config::Config;
use health_sphere::server::{self, AppState};
use health_sphere::RecordRepository;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let repo = RecordRepository::new(config.open_store());
    let state = AppState::new(repo, config.timing());

    info!("starting Health Sphere on http://{}:{}", config.host, config.port);
    info!("predictions are simulated, no model is loaded");

    server::start_api(state, &config.host, config.port).await?;

    Ok(())
}
