use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::ServerConfiguration;
use crate::models::{ConsultationRequest, ErrorBody, InlineImage};
use crate::services::openai::build_consultation_request;
use crate::services::ModelService;

pub const MISSING_API_KEY_MESSAGE: &str =
    "OpenAI API Key is not configured in Cloudflare environment.";

/// Status and JSON body the HTTP layer writes back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Value,
}

impl ProxyResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(message: impl Into<String>) -> Self {
        let body = serde_json::to_value(ErrorBody::new(message))
            .unwrap_or_else(|_| Value::Null);
        Self { status: 500, body }
    }
}

/// Relay one consultation to the model service.
///
/// Every failure comes back as a 500 with an `{"error": ...}` body; a missing
/// api key is reported before any outbound call is made. Whatever JSON the
/// model service answers with (including its own error objects) is passed
/// through untouched.
pub async fn handle_consultation(
    config: &ServerConfiguration,
    model: &dyn ModelService,
    body: &str,
) -> ProxyResponse {
    match relay(config, model, body).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("❌ Consultation failed: {:#}", e);
            ProxyResponse::error(format!("{:#}", e))
        }
    }
}

async fn relay(
    config: &ServerConfiguration,
    model: &dyn ModelService,
    body: &str,
) -> Result<ProxyResponse> {
    let request: ConsultationRequest =
        serde_json::from_str(body).context("Invalid consultation request body")?;

    let Some(api_key) = config.api_key.as_deref() else {
        log::error!("❌ OPENAI_API_KEY is not set, refusing consultation");
        return Ok(ProxyResponse::error(MISSING_API_KEY_MESSAGE));
    };

    match InlineImage::parse(&request.image) {
        Some(image) => log::info!(
            "📸 Consultation request: image={} ({} base64 bytes)",
            image.mime_type,
            image.data.len()
        ),
        None => log::warn!(
            "⚠️ Consultation image is not a base64 data URL ({} bytes), forwarding as is",
            request.image.len()
        ),
    }

    log::debug!("📏 Body details: height={} weight={}", request.height, request.weight);

    let chat_request = build_consultation_request(
        &config.model,
        config.max_tokens,
        &request.height,
        &request.weight,
        &request.image,
    );

    let data = model.complete(&config.api_url, api_key, &chat_request).await?;
    log::info!("✅ Relaying model response to client");

    Ok(ProxyResponse::ok(data))
}
