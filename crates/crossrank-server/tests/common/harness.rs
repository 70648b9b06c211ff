//! Test server harness.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crossrank::{
    BackendKind, Clock, CorsOrigins, MockBackend, MockClock, ModelBackend, Orchestrator,
    OrchestratorConfig, ReadinessGate, RerankService, TokioClock,
};
use crossrank_server::gateway::{HandlerState, create_router_with_state};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;
pub const TEST_MODEL: &str = "mock-reranker";

pub struct TestServerConfig {
    pub port: u16,
    pub backend: Arc<dyn ModelBackend>,
    pub backend_kind: BackendKind,
    pub orchestrator: OrchestratorConfig,
    /// Retry delays and deadlines elapse instantly when `true`.
    pub mock_clock: bool,
    /// Spawn the readiness sequence on startup. When `false` the gate stays in `Starting`.
    pub start_orchestrator: bool,
    pub normalize_default: bool,
    pub score_timeout: Duration,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            backend: Arc::new(MockBackend::new()),
            backend_kind: BackendKind::Local,
            orchestrator: OrchestratorConfig::for_testing(TEST_MODEL, None),
            mock_clock: true,
            start_orchestrator: true,
            normalize_default: true,
            score_timeout: Duration::from_secs(5),
        }
    }
}

impl TestServerConfig {
    pub fn with_backend(mut self, backend: MockBackend) -> Self {
        self.backend = Arc::new(backend);
        self
    }

    pub fn with_fallback(mut self, fallback: &str) -> Self {
        self.orchestrator = OrchestratorConfig::for_testing(TEST_MODEL, Some(fallback));
        self
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub orchestrator: Arc<Orchestrator>,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn gate(&self) -> ReadinessGate {
        self.orchestrator.gate()
    }

    /// Waits until the readiness sequence reaches `Ready` or `Failed`.
    pub async fn settled(&self) -> crossrank::Readiness {
        let gate = self.gate();
        tokio::time::timeout(
            Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
            gate.settled(),
        )
        .await
        .expect("readiness did not settle")
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn find_available_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    Ok(addr.port())
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
}

/// Spawns a server over an in-memory backend.
///
/// The HTTP listener is up before the readiness sequence finishes, as in
/// production; tests that need a serving backend should await
/// [`TestServer::settled`] first.
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let port = if config.port == 0 {
        find_available_port().await?
    } else {
        config.port
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let device = config.backend.device();
    let clock: Arc<dyn Clock> = if config.mock_clock {
        Arc::new(MockClock::new())
    } else {
        Arc::new(TokioClock)
    };
    let orchestrator = Arc::new(Orchestrator::new_with_clock(
        config.orchestrator,
        config.backend,
        clock,
    ));
    if config.start_orchestrator {
        let _ = Arc::clone(&orchestrator).spawn();
    }

    let service = RerankService::new(orchestrator.gate(), config.score_timeout);
    let state = HandlerState::new(
        service,
        device,
        config.backend_kind,
        config.normalize_default,
    );
    let app = create_router_with_state(state, &CorsOrigins::Any);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        orchestrator,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
