//! Client side of a consultation: owns the form, sends it to the proxy and
//! turns whatever comes back into a [`SubmissionState`] the UI can render.

pub mod image;

use anyhow::Result;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::models::{ConsultError, ConsultationRequest, ConsultationResult, FormField};

pub const DEFAULT_PROXY_URL: &str = "http://localhost:8080/api/consult";

/// Seam between the composer and the consultation proxy.
#[async_trait::async_trait]
pub trait ConsultationTransport: Send + Sync {
    /// Post one request and return the raw response body, whatever the status.
    async fn send(&self, request: &ConsultationRequest) -> Result<String>;
}

pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl ConsultationTransport for HttpTransport {
    async fn send(&self, request: &ConsultationRequest) -> Result<String> {
        log::info!("📤 Sending consultation to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        log::debug!("📥 Proxy response status: {}", response.status());
        Ok(response.text().await?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Loading,
    Success { report: String },
    Error(ConsultError),
}

impl SubmissionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SubmissionState::Loading)
    }
}

impl From<&ConsultationResult> for SubmissionState {
    fn from(result: &ConsultationResult) -> Self {
        match result {
            ConsultationResult::Success { report } => SubmissionState::Success {
                report: report.clone(),
            },
            ConsultationResult::Failure(err) => SubmissionState::Error(err.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsultationForm {
    pub height: String,
    pub weight: String,
    pub image: Option<String>,
}

/// Read a proxy response. An `error` field wins over any report.
pub fn interpret_response(body: &str) -> ConsultationResult {
    let data: Value = match serde_json::from_str(body) {
        Ok(data) => data,
        Err(e) => {
            log::error!("❌ Proxy response is not JSON: {}", e);
            return ConsultationResult::Failure(ConsultError::Transport(e.to_string()));
        }
    };

    match data.get("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            let message = error
                .as_str()
                .or_else(|| error.get("message").and_then(Value::as_str))
                .filter(|message| !message.is_empty());

            return match message {
                Some(message) => {
                    log::warn!("⚠️ Consultation failed upstream: {}", message);
                    ConsultationResult::Failure(ConsultError::Upstream(message.to_string()))
                }
                None => ConsultationResult::Failure(ConsultError::Transport(format!(
                    "unrecognized error field: {}",
                    error
                ))),
            };
        }
    }

    let report = data
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.pointer("/message/content"))
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty());

    match report {
        Some(report) => ConsultationResult::Success {
            report: report.to_string(),
        },
        None => {
            log::error!("❌ Proxy response has neither a report nor an error");
            ConsultationResult::Failure(ConsultError::Transport(
                "response has neither a report nor an error".to_string(),
            ))
        }
    }
}

fn validate(height: &str, weight: &str, image: Option<&str>) -> Result<ConsultationRequest, ConsultError> {
    let image = image.unwrap_or_default();

    if height.trim().is_empty() {
        return Err(ConsultError::MissingField(FormField::Height));
    }
    if weight.trim().is_empty() {
        return Err(ConsultError::MissingField(FormField::Weight));
    }
    if image.trim().is_empty() {
        return Err(ConsultError::MissingField(FormField::Image));
    }

    // Whitespace only decides emptiness, the values go out as typed
    Ok(ConsultationRequest {
        height: height.to_string(),
        weight: weight.to_string(),
        image: image.to_string(),
    })
}

/// One submission's claim on the published state. Only the most recent
/// submission may write; an abandoned one drops back to `Idle` if it still
/// owns the state.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<SubmissionState>,
    latest: &'a AtomicU64,
    ticket: u64,
    finished: bool,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a watch::Sender<SubmissionState>, latest: &'a AtomicU64) -> Self {
        let ticket = claim(state, latest, SubmissionState::Loading);
        Self {
            state,
            latest,
            ticket,
            finished: false,
        }
    }

    fn finish(mut self, outcome: SubmissionState) {
        self.finished = true;
        self.publish(outcome);
    }

    fn publish(&self, outcome: SubmissionState) {
        let superseded = !self.state.send_if_modified(|current| {
            if self.latest.load(Ordering::SeqCst) != self.ticket {
                return false;
            }
            *current = outcome;
            true
        });
        if superseded {
            log::debug!("⏭️ Submission #{} superseded, outcome dropped", self.ticket);
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.publish(SubmissionState::Idle);
        }
    }
}

/// Take the next ticket and write `next`, both under the channel's lock.
fn claim(state: &watch::Sender<SubmissionState>, latest: &AtomicU64, next: SubmissionState) -> u64 {
    let mut ticket = 0;
    state.send_modify(|current| {
        ticket = latest.fetch_add(1, Ordering::SeqCst) + 1;
        *current = next;
    });
    ticket
}

pub struct RequestComposer {
    transport: Arc<dyn ConsultationTransport>,
    form: ConsultationForm,
    state: watch::Sender<SubmissionState>,
    latest_submission: AtomicU64,
}

impl RequestComposer {
    pub fn new(transport: Arc<dyn ConsultationTransport>) -> Self {
        let (state, _) = watch::channel(SubmissionState::Idle);
        Self {
            transport,
            form: ConsultationForm::default(),
            state,
            latest_submission: AtomicU64::new(0),
        }
    }

    /// Composer talking to a proxy over HTTP.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpTransport::new(endpoint)))
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SubmissionState {
        self.state.borrow().clone()
    }

    pub fn form(&self) -> &ConsultationForm {
        &self.form
    }

    pub fn set_height(&mut self, height: impl Into<String>) {
        self.form.height = height.into();
    }

    pub fn set_weight(&mut self, weight: impl Into<String>) {
        self.form.weight = weight.into();
    }

    pub fn set_image(&mut self, data_url: impl Into<String>) {
        self.form.image = Some(data_url.into());
    }

    /// Load a photo from disk into the form.
    pub async fn capture_image(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let data_url = image::capture_image(path).await?;
        self.form.image = Some(data_url);
        Ok(())
    }

    pub async fn submit_form(&self) -> ConsultationResult {
        let form = self.form.clone();
        self.submit(&form.height, &form.weight, form.image.as_deref()).await
    }

    /// Run one consultation. Incomplete input fails without touching the
    /// network; otherwise exactly one request goes to the proxy. When calls
    /// overlap, only the most recently started one updates the state.
    pub async fn submit(&self, height: &str, weight: &str, image: Option<&str>) -> ConsultationResult {
        let request = match validate(height, weight, image) {
            Ok(request) => request,
            Err(err) => {
                log::debug!("📝 Form incomplete: {}", err);
                claim(&self.state, &self.latest_submission, SubmissionState::Error(err.clone()));
                return ConsultationResult::Failure(err);
            }
        };

        let loading = LoadingGuard::start(&self.state, &self.latest_submission);

        let result = match self.transport.send(&request).await {
            Ok(body) => interpret_response(&body),
            Err(e) => {
                log::error!("❌ Could not reach consultation proxy: {:#}", e);
                ConsultationResult::Failure(ConsultError::Transport(format!("{:#}", e)))
            }
        };

        loading.finish(SubmissionState::from(&result));
        result
    }
}
