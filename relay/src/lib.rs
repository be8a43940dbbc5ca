pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod notion;
pub mod service;
pub mod task;

#[cfg(test)]
mod testutils;

use errors::RelayError;
use notion::NotionClient;
use service::RelayService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;

/// Runs the relay and admin listeners until one of them fails.
///
/// `config` is expected to have passed [`config::Config::validate`].
pub async fn run(config: config::Config) -> Result<(), RelayError> {
    let notion = NotionClient::new(&config.notion)?;

    tracing::info!(
        listener = %config.listener,
        admin_listener = %config.admin_listener,
        notion = ?config.notion,
        public_url = config.public_url().as_deref(),
        "Starting relay"
    );

    let relay_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        RelayService::new(notion),
    );
    // Nothing to warm up: the relay is ready once it is listening.
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, RelayError>::new(|| true),
    );

    tokio::try_join!(relay_task, admin_task)?;
    Ok(())
}
