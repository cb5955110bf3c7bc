use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;

use style_consult::config::{ServerConfiguration, ServerSettings};
#[cfg(feature = "proxy-server")]
use style_consult::proxy::server::{create_proxy_router, CONSULT_PATH};
use style_consult::services::OpenAiService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first so RUST_LOG from .env applies
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("🚀 Starting Style Consultation Proxy...");

    let settings = ServerSettings::from_env()?;

    // Only a heads-up: the key is read again for every request
    let startup_config = ServerConfiguration::from_env();
    if startup_config.api_key.is_none() {
        log::warn!("⚠️ OPENAI_API_KEY not set, consultations will fail until it is configured");
    }
    log::info!("✅ Model service: {} at {}", startup_config.model, startup_config.api_url);

    let model_service = Arc::new(OpenAiService::new());

    #[cfg(feature = "proxy-server")]
    {
        let app = create_proxy_router(
            model_service,
            Arc::new(ServerConfiguration::from_env),
            settings.max_body_bytes,
        );

        let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
        log::info!("🌐 Proxy listening on http://{}{}", settings.bind_addr, CONSULT_PATH);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                log::info!("🛑 Shutting down...");
            })
            .await?;
    }

    #[cfg(not(feature = "proxy-server"))]
    {
        let _ = (model_service, settings);
        anyhow::bail!("built without the proxy-server feature, nothing to serve");
    }

    Ok(())
}
