use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::ai_service::ModelService;

pub const STYLIST_SYSTEM_PROMPT: &str = "You are an expert personal stylist and image consultant. \
     Analyze the user's physical details (height, weight) and their photo to provide a concise, \
     premium style report in Korean. Focus on silhouette, color palette, and specific item recommendations.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageData },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(parts),
        }
    }
}

/// Text half of the user turn; height is in cm and weight in kg.
pub fn body_details_text(height: &str, weight: &str) -> String {
    format!(
        "사용자 신체 정보: 키 {}cm, 몸무게 {}kg. \
         이 데이터를 바탕으로 현재 스타일을 분석하고, 가장 잘 어울리는 스타일(체형 보정, 추천 아이템 등)을 상세히 제안해줘. \
         답변은 마크다운 형식으로 작성해줘.",
        height, weight
    )
}

/// Build the stylist prompt. The image string is forwarded as is.
pub fn build_consultation_request(
    model: &str,
    max_tokens: u32,
    height: &str,
    weight: &str,
    image: &str,
) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(STYLIST_SYSTEM_PROMPT),
            ChatMessage::user(vec![
                ContentPart::Text {
                    text: body_details_text(height, weight),
                },
                ContentPart::ImageUrl {
                    image_url: ImageData {
                        url: image.to_string(),
                    },
                },
            ]),
        ],
        max_tokens,
    }
}

pub struct OpenAiService {
    client: reqwest::Client,
}

impl OpenAiService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for OpenAiService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ModelService for OpenAiService {
    async fn complete(
        &self,
        api_url: &str,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<serde_json::Value> {
        log::info!("🤖 Sending request to model service with model: {}", request.model);
        log::debug!("📤 Request payload size: {} bytes", serde_json::to_string(request)?.len());

        let response = self
            .client
            .post(api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .context("Model service request failed")?;

        let status = response.status();
        log::info!("📥 Model service response status: {}", status);

        let response_text = response.text().await?;
        log::debug!("📄 Raw model response size: {} bytes", response_text.len());

        // Error bodies are relayed too, the client reads the `error` field
        if !status.is_success() {
            log::error!("❌ Model service error ({}): {}", status, response_text);
        }

        let body: serde_json::Value = serde_json::from_str(&response_text)
            .with_context(|| format!("Model service returned a non-JSON body (HTTP {})", status))?;

        Ok(body)
    }
}
