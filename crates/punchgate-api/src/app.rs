//! Application bootstrap — wires state, router, and the forwarder task into
//! a running server.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::watch;
use tracing::{error, info};

use punchgate_auth::jwt::{TokenDecoder, TokenEncoder};
use punchgate_auth::session::{SessionAuthority, SessionStore};
use punchgate_core::config::AppConfig;
use punchgate_core::error::AppError;
use punchgate_database::repositories::{QueueRepository, SessionRepository};
use punchgate_forwarder::Forwarder;
use punchgate_upstream::ErpClient;

use crate::middleware::rate_limit::RateLimiter;
use crate::router::build_router;
use crate::state::AppState;

/// Construct the shared application state from configuration and an open
/// database pool.
///
/// Every shared singleton (queue, upstream limiter, session authority,
/// forwarder) is built exactly once here and handed out as an explicit
/// dependency.
pub fn build_state(config: AppConfig, pool: PgPool) -> Result<AppState, AppError> {
    let queue_repo = Arc::new(QueueRepository::new(pool.clone()));
    let session_repo = Arc::new(SessionRepository::new(pool.clone()));

    let encoder = Arc::new(TokenEncoder::new(&config.auth));
    let decoder = Arc::new(TokenDecoder::new(&config.auth));
    let session_store = Arc::new(SessionStore::new(Arc::clone(&session_repo), &config.auth));
    let authority = Arc::new(SessionAuthority::new(
        encoder,
        decoder,
        session_store,
        &config.auth,
    ));

    let upstream = Arc::new(ErpClient::new(&config.upstream)?);

    let forwarder = Arc::new(Forwarder::new(
        Arc::clone(&queue_repo),
        Arc::clone(&upstream),
        Arc::clone(&authority),
        &config.forwarder,
    ));

    let rate_limiter = RateLimiter::new(&config.rate_limit);

    Ok(AppState {
        config: Arc::new(config),
        db_pool: pool,
        queue_repo,
        authority,
        upstream,
        forwarder,
        rate_limiter,
    })
}

/// Run the HTTP server and the forwarder task until shutdown.
///
/// One watch channel carries the shutdown signal to both: the server's
/// graceful-shutdown future and the forwarder's run loop watch the same
/// flag, flipped by a spawned signal listener. The forwarder gets the
/// configured grace period to finish its in-flight drain cycle.
pub async fn run_server(config: AppConfig, pool: PgPool) -> Result<(), AppError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let shutdown_grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let forwarder_enabled = config.forwarder.enabled;

    let state = build_state(config, pool)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(flip_on_signal(shutdown_tx.clone()));

    let forwarder_task = if forwarder_enabled {
        let forwarder = Arc::clone(&state.forwarder);
        let forwarder_shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            forwarder.run(forwarder_shutdown).await;
        }))
    } else {
        info!("Forwarder disabled by configuration");
        None
    };

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(
            punchgate_core::error::ErrorKind::Internal,
            format!("Failed to bind {addr}: {e}"),
            e,
        )
    })?;

    info!(addr = %addr, forwarder = forwarder_enabled, "Accepting device traffic");

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // The server only returns once the flag flipped (or on error); make
    // sure the forwarder sees it too, then give it the grace period.
    let _ = shutdown_tx.send(true);
    if let Some(task) = forwarder_task {
        info!(
            grace_seconds = shutdown_grace.as_secs(),
            "Waiting for the forwarder to finish its cycle"
        );
        if tokio::time::timeout(shutdown_grace, task).await.is_err() {
            error!("Forwarder did not stop within the shutdown grace period");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Flips the shutdown flag on SIGINT or SIGTERM.
async fn flip_on_signal(shutdown_tx: watch::Sender<bool>) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);
}
