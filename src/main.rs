/// Battery OS API server
///
/// Serves battery diagnostics, alert thresholds and simulated telemetry,
/// and proxies documentation requests to the external docs service.
use battery_os::{
    config::{LogFormat, ServerConfig},
    context::AppContext,
    error::ApiResult,
    server,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ApiResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let filter = EnvFilter::try_new(&config.logging.filter)
        .unwrap_or_else(|_| EnvFilter::new("battery_os=debug,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    print_banner();

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    tracing::info!(
        "Battery OS API v{} starting",
        env!("CARGO_PKG_VERSION")
    );
}
