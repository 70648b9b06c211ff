//! Crossrank HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use crossrank::{BackendConfig, Config, Orchestrator, OrchestratorConfig, RerankService, build_backend};
use crossrank_server::gateway::{HandlerState, create_router_with_state};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const DEFAULT_PORT: u16 = 8000;

fn main() -> anyhow::Result<()> {
    // Checked before any runtime exists; the check builds its own.
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve())
}

async fn serve() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    let backend_config = BackendConfig::from_env()?;
    backend_config.validate()?;
    let orchestrator_config = OrchestratorConfig::from_env()?;
    orchestrator_config.validate()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        backend = %backend_config.kind,
        model = %orchestrator_config.primary_model,
        fallback = ?orchestrator_config.fallback_model,
        "Crossrank starting"
    );

    let backend = build_backend(&backend_config)?;
    let device = backend.device();
    let orchestrator = Arc::new(Orchestrator::new(orchestrator_config, backend));

    // The listener comes up immediately; scoring stays closed until the gate opens.
    let readiness_task = Arc::clone(&orchestrator).spawn();

    let service = RerankService::new(orchestrator.gate(), config.score_timeout);
    let state = HandlerState::new(service, device, backend_config.kind, config.normalize_default);
    let app = create_router_with_state(state, &config.cors_origins);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_task.abort();
    tracing::info!("Crossrank shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("CROSSRANK_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let url = format!("http://127.0.0.1:{}/health", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
