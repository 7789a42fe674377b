use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use medcert_api::config::ServiceConfig;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("MEDCERT_LOG_JSON").is_ok_and(|v| v == "1") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = ServiceConfig::load()?;
    let state = medcert_api::build_state(&config)?;
    let cors = medcert_api::cors_layer(config.frontend_url.as_deref());
    let app = medcert_api::app(state, cors);

    let listener = TcpListener::bind(&config.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        output_dir = %config.export.output_dir.display(),
        "medcert listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
