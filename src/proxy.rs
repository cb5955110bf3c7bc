//! axum surface of the consultation proxy.

pub mod server {
    use axum::{
        body::Bytes,
        extract::{rejection::BytesRejection, DefaultBodyLimit, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use std::sync::Arc;

    use crate::config::ServerConfiguration;
    use crate::handlers::{handle_consultation, ProxyResponse};
    use crate::models::ErrorBody;
    use crate::services::ModelService;

    pub const CONSULT_PATH: &str = "/api/consult";

    pub type ConfigLoader = Arc<dyn Fn() -> ServerConfiguration + Send + Sync>;

    pub struct AppState {
        pub model_service: Arc<dyn ModelService>,
        pub load_config: ConfigLoader,
    }

    pub fn create_proxy_router(
        model_service: Arc<dyn ModelService>,
        load_config: ConfigLoader,
        max_body_bytes: usize,
    ) -> Router {
        let state = Arc::new(AppState {
            model_service,
            load_config,
        });

        Router::new()
            .route("/", get(root_handler))
            .route(CONSULT_PATH, post(consult_handler))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::max(max_body_bytes))
            .with_state(state)
    }

    async fn consult_handler(
        State(state): State<Arc<AppState>>,
        body: Result<Bytes, BytesRejection>,
    ) -> Response {
        let response = match body {
            Ok(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => {
                    log::info!("🔔 Consultation received ({} bytes)", text.len());
                    // Credential is looked up per request, never cached
                    let config = (state.load_config)();
                    handle_consultation(&config, state.model_service.as_ref(), text).await
                }
                Err(e) => {
                    log::error!("❌ Consultation body is not UTF-8: {}", e);
                    error_response(format!("Request body is not valid UTF-8: {}", e))
                }
            },
            Err(rejection) => {
                log::error!("❌ Could not read consultation body: {}", rejection);
                error_response(rejection.body_text())
            }
        };

        let status = StatusCode::from_u16(response.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(response.body)).into_response()
    }

    fn error_response(message: String) -> ProxyResponse {
        ProxyResponse {
            status: 500,
            body: serde_json::to_value(ErrorBody::new(message)).unwrap_or_default(),
        }
    }

    async fn root_handler() -> &'static str {
        "Style Consultation Proxy - POST /api/consult with {height, weight, image}"
    }

    async fn health_check() -> &'static str {
        "OK"
    }
}

#[cfg(test)]
mod tests {
    use super::server::*;
    use crate::composer::{image::capture_image_bytes, RequestComposer, SubmissionState};
    use crate::config::ServerConfiguration;
    use crate::services::openai::ChatRequest;
    use crate::services::{ModelService, OpenAiService};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::post,
        Json, Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct NeverCalled(AtomicUsize);

    #[async_trait::async_trait]
    impl ModelService for NeverCalled {
        async fn complete(&self, _: &str, _: &str, _: &ChatRequest) -> anyhow::Result<serde_json::Value> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("model service should not be called")
        }
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn spawn(router: Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn consult_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(CONSULT_PATH)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_returns_configured_message() {
        let model = Arc::new(NeverCalled(AtomicUsize::new(0)));
        let app = create_proxy_router(model.clone(), Arc::new(ServerConfiguration::default), 1024 * 1024);

        let body = serde_json::json!({ "height": "175", "weight": "70", "image": "data:image/png;base64,AAAA" });
        let response = app.oneshot(consult_request(body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_json(response).await,
            serde_json::json!({ "error": "OpenAI API Key is not configured in Cloudflare environment." })
        );
        assert_eq!(model.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_body_is_json_error() {
        let model = Arc::new(NeverCalled(AtomicUsize::new(0)));
        let app = create_proxy_router(model, Arc::new(|| ServerConfiguration::with_api_key("sk-test")), 16);

        let body = serde_json::json!({ "height": "175", "weight": "70", "image": "data:image/png;base64,AAAAAAAAAAAA" });
        let response = app.oneshot(consult_request(body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_health_check() {
        let model = Arc::new(NeverCalled(AtomicUsize::new(0)));
        let app = create_proxy_router(model, Arc::new(ServerConfiguration::default), 1024);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_full_consultation_flow() {
        let upstream_calls = Arc::new(AtomicUsize::new(0));
        let counter = upstream_calls.clone();
        let upstream = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(request): Json<serde_json::Value>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let text = request["messages"][1]["content"][0]["text"].as_str().unwrap_or_default();
                    let report = format!("## 스타일 리포트\n\n- 입력: {}", text);
                    Json(serde_json::json!({
                        "choices": [{ "index": 0, "message": { "role": "assistant", "content": report } }]
                    }))
                }
            }),
        );
        let upstream_addr = spawn(upstream).await;
        let api_url = format!("http://{}/v1/chat/completions", upstream_addr);

        let load_config: ConfigLoader = Arc::new(move || ServerConfiguration {
            api_url: api_url.clone(),
            ..ServerConfiguration::with_api_key("sk-test")
        });
        let proxy = create_proxy_router(Arc::new(OpenAiService::new()), load_config, 1024 * 1024);
        let proxy_addr = spawn(proxy).await;

        let mut composer = RequestComposer::with_endpoint(format!("http://{}{}", proxy_addr, CONSULT_PATH));
        composer.set_height("175");
        composer.set_weight("70");
        composer.set_image("data:image/png;base64,AAAA");

        let result = composer.submit_form().await;

        let SubmissionState::Success { report } = composer.state() else {
            panic!("expected success, got {:?}", result);
        };
        assert!(report.starts_with("## 스타일 리포트"));
        assert!(report.contains("175") && report.contains("70"));
        assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);

        // Image captured from bytes goes through the same path
        composer.set_image(capture_image_bytes(b"\x89PNG\r\n\x1a\n", "me.png"));
        assert!(composer.submit_form().await.is_success());
        assert_eq!(upstream_calls.load(Ordering::SeqCst), 2);
    }
}
