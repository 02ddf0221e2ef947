use order_service::{config::OrderServiceConfig, startup::Application};
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Fail fast on invalid configuration
    let config = OrderServiceConfig::load()?;

    init_tracing(
        &config.service_name,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    )?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting order service"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;
    Ok(())
}
