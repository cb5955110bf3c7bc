use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown to the user whenever the response cannot be understood.
pub const FALLBACK_ERROR_MESSAGE: &str =
    "Could not get a style report right now. Please try again.";

/// Body the composer sends to the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationRequest {
    pub height: String,
    pub weight: String,
    pub image: String,  // data:<mime>;base64,<payload>
}

/// Uniform error body returned by the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

/// Borrowed view of a `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage<'a> {
    pub mime_type: &'a str,
    pub data: &'a str,
}

impl<'a> InlineImage<'a> {
    pub fn parse(data_url: &'a str) -> Option<Self> {
        let rest = data_url.strip_prefix("data:")?;
        let (mime_type, data) = rest.split_once(";base64,")?;
        Some(Self { mime_type, data })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsultError {
    /// Form incomplete, never reaches the network
    #[error("Please enter your {0} before requesting a consultation.")]
    MissingField(FormField),

    /// Detail is kept for logs, the user only sees the fallback text
    #[error("{}", FALLBACK_ERROR_MESSAGE)]
    Transport(String),

    /// Reported by the proxy (including a missing api key) or the model
    /// service, shown verbatim
    #[error("{0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Height,
    Weight,
    Image,
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FormField::Height => "height",
            FormField::Weight => "weight",
            FormField::Image => "photo",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsultationResult {
    Success { report: String },
    Failure(ConsultError),
}

impl ConsultationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConsultationResult::Success { .. })
    }

    /// The markdown report or the user-visible error text
    pub fn message(&self) -> String {
        match self {
            ConsultationResult::Success { report } => report.clone(),
            ConsultationResult::Failure(err) => err.to_string(),
        }
    }
}
