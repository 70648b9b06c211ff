//! Remote backend against an in-process stub of the inference service.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crossrank::{
    BackendError, BackendState, ModelBackend, Orchestrator, OrchestratorConfig, QueryRequest,
    RemoteBackend, RerankService, Scorer,
};

const MODEL: &str = "bge-reranker";
const BUDGET: usize = 8192;

/// Model-management and rerank endpoints backed by in-memory state.
struct StubService {
    models: Mutex<Vec<String>>,
    pull_status: Mutex<String>,
    rerank_bodies: Mutex<Vec<Value>>,
}

impl StubService {
    fn new(models: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            models: Mutex::new(models.iter().map(|m| m.to_string()).collect()),
            pull_status: Mutex::new("success".to_string()),
            rerank_bodies: Mutex::new(Vec::new()),
        })
    }

    fn failing_pulls(self: Arc<Self>, status: &str) -> Arc<Self> {
        *self.pull_status.lock().unwrap() = status.to_string();
        self
    }

    fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

async fn version() -> Json<Value> {
    Json(json!({ "version": "0.0.0-stub" }))
}

async fn tags(State(stub): State<Arc<StubService>>) -> Json<Value> {
    let models: Vec<Value> = stub.models().into_iter().map(|name| json!({ "name": name })).collect();
    Json(json!({ "models": models }))
}

async fn pull(State(stub): State<Arc<StubService>>, Json(body): Json<Value>) -> Json<Value> {
    let status = stub.pull_status.lock().unwrap().clone();
    if status == "success" {
        let name = body["name"].as_str().unwrap_or_default().to_string();
        stub.models.lock().unwrap().push(name);
    }
    Json(json!({ "status": status }))
}

async fn remove(State(stub): State<Arc<StubService>>, Json(body): Json<Value>) -> StatusCode {
    let name = body["name"].as_str().unwrap_or_default();
    let mut models = stub.models.lock().unwrap();
    match models.iter().position(|m| m == name) {
        Some(pos) => {
            models.remove(pos);
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// Scores each text by its length and answers best-first, like the real service.
async fn rerank(State(stub): State<Arc<StubService>>, Json(body): Json<Value>) -> Json<Value> {
    let mut entries: Vec<(usize, f32)> = body["texts"]
        .as_array()
        .map(|texts| {
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| (i, t.as_str().unwrap_or_default().len() as f32))
                .collect()
        })
        .unwrap_or_default();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));

    stub.rerank_bodies.lock().unwrap().push(body);
    Json(Value::Array(
        entries
            .into_iter()
            .map(|(index, score)| json!({ "index": index, "score": score }))
            .collect(),
    ))
}

async fn spawn_stub(stub: Arc<StubService>) -> String {
    let app = Router::new()
        .route("/api/version", get(version))
        .route("/api/tags", get(tags))
        .route("/api/pull", post(pull))
        .route("/api/delete", delete(remove))
        .route("/rerank", post(rerank))
        .with_state(stub);

    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

async fn backend_for(stub: Arc<StubService>) -> RemoteBackend {
    let url = spawn_stub(stub).await;
    RemoteBackend::new(&url, BUDGET).unwrap()
}

#[tokio::test]
async fn test_ping_reaches_version_endpoint() {
    let backend = backend_for(StubService::new(&[])).await;

    backend.ping().await.unwrap();
}

#[tokio::test]
async fn test_has_model_reads_tags() {
    let backend = backend_for(StubService::new(&["bge-reranker:latest", "other:7b"])).await;

    assert!(backend.has_model(MODEL).await.unwrap());
    assert!(!backend.has_model("other").await.unwrap());
    assert!(!backend.has_model("missing").await.unwrap());
}

#[tokio::test]
async fn test_pull_with_non_success_status_fails_acquisition() {
    let stub = StubService::new(&[]).failing_pulls("pulling manifest");
    let backend = backend_for(Arc::clone(&stub)).await;

    let err = backend.acquire(MODEL).await.unwrap_err();

    assert!(
        matches!(err, BackendError::AcquisitionFailed { ref model, .. } if model == MODEL),
        "unexpected error: {err:?}"
    );
    assert!(stub.models().is_empty());
}

#[tokio::test]
async fn test_pull_success_makes_model_present() {
    let backend = backend_for(StubService::new(&[])).await;

    backend.acquire(MODEL).await.unwrap();

    assert!(backend.has_model(MODEL).await.unwrap());
}

#[tokio::test]
async fn test_cleanup_of_absent_model_is_ok() {
    let stub = StubService::new(&["kept"]);
    let backend = backend_for(Arc::clone(&stub)).await;

    backend.cleanup(MODEL).await.unwrap();
    backend.cleanup("kept").await.unwrap();

    assert!(stub.models().is_empty());
}

#[tokio::test]
async fn test_load_of_absent_model_is_not_found() {
    let backend = backend_for(StubService::new(&[])).await;

    let err = backend.load(MODEL).await.err().unwrap();

    assert!(matches!(err, BackendError::ModelNotFound { .. }));
}

#[tokio::test]
async fn test_rerank_scores_returned_in_passage_order() {
    let stub = StubService::new(&[MODEL]);
    let backend = backend_for(Arc::clone(&stub)).await;
    let scorer = backend.load(MODEL).await.unwrap();

    let passages = vec!["a".to_string(), "ccc".to_string(), "bb".to_string()];
    let scores = scorer.score_batch("query", &passages).await.unwrap();

    assert_eq!(scores, vec![1.0, 3.0, 2.0]);
    assert_eq!(scorer.max_input_chars(), Some(BUDGET));

    let bodies = stub.rerank_bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], MODEL);
    assert_eq!(bodies[0]["query"], "query");
    assert_eq!(bodies[0]["raw_scores"], true);
}

#[tokio::test]
async fn test_orchestrator_pulls_and_serves_over_http() {
    let stub = StubService::new(&[]);
    let backend: Arc<dyn ModelBackend> = Arc::new(backend_for(Arc::clone(&stub)).await);
    let orchestrator = Orchestrator::new(OrchestratorConfig::for_testing(MODEL, None), backend);

    let served = orchestrator.run().await.unwrap();

    assert_eq!(served, MODEL);
    assert_eq!(orchestrator.state(), BackendState::Ready);
    assert_eq!(stub.models(), vec![MODEL.to_string()]);

    let service = RerankService::new(orchestrator.gate(), Duration::from_secs(5));
    let ranked = service
        .rerank_query(&QueryRequest {
            query: "rust".to_string(),
            passages: vec!["mid".to_string(), "longest".to_string(), "s".to_string()],
            normalize: false,
        })
        .await
        .unwrap();

    let order: Vec<&str> = ranked.iter().map(|r| r.passage.as_str()).collect();
    assert_eq!(order, vec!["longest", "mid", "s"]);
    assert_eq!(ranked[0].score, 7.0);
}
