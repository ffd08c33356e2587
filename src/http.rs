use crate::completion::CompletionBackend;
use crate::embeddings::EmbeddingBackend;
use crate::error::{GimpaError, Result};
use crate::index::IndexManager;
use crate::qa::QaChain;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const GREETING: &str = "Hello, Gimpa Assist!";
const MISSING_QUESTION: &str = "Question is required in the request body.";

/// Application state shared across handlers.
///
/// Everything here is constructed once at startup: the backend clients and
/// the index manager are reused by every request.
pub struct AppState<E, C> {
    pub manager: Arc<IndexManager<E>>,
    pub embedder: Arc<E>,
    pub qa: Arc<QaChain<C>>,
    pub source_path: PathBuf,
    pub index_path: PathBuf,
}

impl<E, C> Clone for AppState<E, C> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            embedder: Arc::clone(&self.embedder),
            qa: Arc::clone(&self.qa),
            source_path: self.source_path.clone(),
            index_path: self.index_path.clone(),
        }
    }
}

#[derive(Deserialize)]
struct AskRequest {
    question: Option<String>,
}

/// Build the axum router: greeting, /ask, permissive CORS, request tracing.
pub fn router<E, C>(state: AppState<E, C>) -> Router
where
    E: EmbeddingBackend + 'static,
    C: CompletionBackend + 'static,
{
    // All origins permitted; the service carries no credentials or cookies
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/ask", post(handle_ask::<E, C>))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

/// Bind and run the HTTP server until shutdown.
pub async fn serve<E, C>(state: AppState<E, C>, port: u16) -> Result<()>
where
    E: EmbeddingBackend + 'static,
    C: CompletionBackend + 'static,
{
    let app = router(state);
    let addr = format!("0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        GimpaError::Config(format!(
            "Failed to bind to {}: {}. Is the port already in use?",
            addr, e
        ))
    })?;

    log::info!("Server is running on http://localhost:{}", port);

    axum::serve(listener, app).await.map_err(|e| {
        GimpaError::Io(std::io::Error::other(format!("HTTP server error: {}", e)))
    })?;

    Ok(())
}

async fn handle_root() -> &'static str {
    GREETING
}

/// `POST /ask`: answer a question about the source document.
///
/// The question is validated before any index or backend work happens, so a
/// bad request can never trigger a build or an API call.
async fn handle_ask<E, C>(
    State(state): State<AppState<E, C>>,
    body: Option<Json<AskRequest>>,
) -> Response
where
    E: EmbeddingBackend + 'static,
    C: CompletionBackend + 'static,
{
    // Any malformed/absent body or missing/empty question gets the fixed 400
    let question = match body
        .and_then(|Json(req)| req.question)
        .filter(|q| !q.trim().is_empty())
    {
        Some(q) => q,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": MISSING_QUESTION })),
            )
                .into_response();
        }
    };

    let index = match state.manager.obtain(&state.source_path, &state.index_path).await {
        Ok(index) => index,
        Err(e) => return internal_error(e),
    };

    match state.qa.answer(&index, state.embedder.as_ref(), &question).await {
        Ok(answer) => (
            StatusCode::OK,
            Json(serde_json::json!({ "response": answer })),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

fn internal_error(e: GimpaError) -> Response {
    log::error!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "Internal Server Error",
            "message": e.to_string()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CHUNK_SIZE_CHARS, RETRIEVAL_K};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct MockEmbedder {
        calls: AtomicUsize,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    fn embed(text: &str) -> Vec<f32> {
        let sum: u32 = text.bytes().map(u32::from).sum();
        vec![sum as f32, text.len() as f32, 1.0]
    }

    impl EmbeddingBackend for MockEmbedder {
        async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| embed(t)).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(embed(text))
        }
    }

    struct MockCompletions {
        calls: AtomicUsize,
    }

    impl MockCompletions {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CompletionBackend for MockCompletions {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("A mocked answer.".to_string())
        }
    }

    struct TestApp {
        router: Router,
        embedder: Arc<MockEmbedder>,
        completions: Arc<MockCompletions>,
        _temp_dir: TempDir,
        index_path: PathBuf,
    }

    fn test_app(source_content: Option<&str>) -> TestApp {
        let temp_dir = TempDir::new().unwrap();
        let source_path = temp_dir.path().join("data.txt");
        let index_path = temp_dir.path().join("data.index");
        if let Some(content) = source_content {
            std::fs::write(&source_path, content).unwrap();
        }

        let embedder = Arc::new(MockEmbedder::new());
        let completions = Arc::new(MockCompletions::new());
        let state = AppState {
            manager: Arc::new(IndexManager::new(
                Arc::clone(&embedder),
                "test-model".to_string(),
                CHUNK_SIZE_CHARS,
            )),
            embedder: Arc::clone(&embedder),
            qa: Arc::new(QaChain::new(Arc::clone(&completions), RETRIEVAL_K)),
            source_path,
            index_path: index_path.clone(),
        };

        TestApp {
            router: router(state),
            embedder,
            completions,
            _temp_dir: temp_dir,
            index_path,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn ask_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ask")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_greeting() {
        let app = test_app(Some("doc"));
        let response = app
            .router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], GREETING.as_bytes());
    }

    #[tokio::test]
    async fn test_ask_missing_question() {
        let app = test_app(Some("doc"));
        let response = app.router.clone().oneshot(ask_request("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], MISSING_QUESTION);
        // No index build, no backend call
        assert_eq!(app.embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.completions.calls.load(Ordering::SeqCst), 0);
        assert!(!app.index_path.exists());
    }

    #[tokio::test]
    async fn test_ask_empty_question() {
        let app = test_app(Some("doc"));
        let response = app
            .router
            .clone()
            .oneshot(ask_request(r#"{"question": "   "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], MISSING_QUESTION);
        assert_eq!(app.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_malformed_body() {
        let app = test_app(Some("doc"));
        let response = app
            .router
            .clone()
            .oneshot(ask_request("this is not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_success_builds_index_and_answers() {
        let app = test_app(Some("Gimpa is a university in Ghana."));
        let response = app
            .router
            .clone()
            .oneshot(ask_request(r#"{"question": "What is Gimpa?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["response"]["text"], "A mocked answer.");
        assert!(json["response"]["sources"]
            .as_array()
            .unwrap()
            .iter()
            .any(|s| s.as_str().unwrap().contains("Gimpa")));
        assert!(app.index_path.exists(), "first ask persists the index");
        assert_eq!(app.completions.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ask_reuses_index_across_requests() {
        let app = test_app(Some("Gimpa is a university in Ghana."));

        for _ in 0..2 {
            let response = app
                .router
                .clone()
                .oneshot(ask_request(r#"{"question": "What is Gimpa?"}"#))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        // One batch embed for the build, plus one query embed per request
        assert_eq!(app.embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_ask_source_missing_is_500() {
        let app = test_app(None);
        let response = app
            .router
            .clone()
            .oneshot(ask_request(r#"{"question": "What is Gimpa?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal Server Error");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("Source document unavailable"));
    }
}
