use fitscore_backend::services::ai_service::{CandidateAnalyzer, OpenAiAnalyzer};
use fitscore_backend::services::notification_service::LogNotifier;
use fitscore_backend::services::queue_service::PgCandidateQueue;
use fitscore_backend::worker::Worker;
use fitscore_backend::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    routes, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    init_config()?;
    let config = get_config();
    info!(mode = ?config.mode, scoring_model = ?config.scoring_model, "starting fitscore backend");

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker_handles = Vec::new();

    if config.mode.runs_worker() {
        let http_client = reqwest::Client::builder()
            .timeout(config.worker.analysis_timeout)
            .build()?;

        let analyzer = config.openai_api_key.clone().map(|key| {
            Arc::new(
                OpenAiAnalyzer::new(key, config.openai_model.clone(), http_client)
                    .with_base_url(config.openai_base_url.clone())
                    .with_timeout(config.worker.analysis_timeout),
            ) as Arc<dyn CandidateAnalyzer>
        });

        let worker = Arc::new(Worker::new(
            Arc::new(PgCandidateQueue::new(pool.clone())),
            Arc::new(LogNotifier::new()),
            analyzer,
            config.worker.clone(),
        ));
        worker_handles = worker.spawn(shutdown_rx.clone());
        info!(loops = worker_handles.len(), "worker loops started");
    }

    if config.mode.runs_api() {
        let app = routes::router(
            AppState::new(pool.clone(), config.scoring_model),
            config.public_rps,
        );

        let addr: SocketAddr = config.server_address.parse()?;
        info!("Server listening on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        shutdown_signal().await;
    }

    let _ = shutdown_tx.send(true);
    for handle in worker_handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "worker loop ended abnormally");
        }
    }

    pool.close().await;
    info!("shutdown complete");
    Ok(())
}
