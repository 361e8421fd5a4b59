mod poller;
mod readiness;

use std::sync::Arc;

use evrd_api::{build_app, AppState};
use evrd_bus::{AdcTokenProvider, LoggingPublisher, PubSubPublisher, Publisher};
use evrd_config::Config;
use evrd_engine::{Activity, Coalescer, Expander};
use evrd_store::{EventQueue, PostgresStore, SiteDirectory};
use poller::Poller;
use readiness::PoolReadiness;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            // Tracing isn't set up until we know the configured log level,
            // so this one failure path prints straight to stderr.
            eprintln!("configuration error: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run(config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "daemon exited with error");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .max_lifetime(config.db_max_lifetime)
        .connect(&config.database_url)
        .await?;
    let store = PostgresStore::from_pool(pool.clone());
    store.migrate().await?;

    let publisher: Arc<dyn Publisher> = match &config.project_id {
        Some(project_id) => {
            let token = match AdcTokenProvider::new().await {
                Ok(t) => Box::new(t) as Box<dyn evrd_bus::TokenProvider>,
                Err(e) => {
                    warn!(error = %e, "falling back to unauthenticated publisher credentials");
                    Box::new(evrd_bus::StaticToken(String::new()))
                }
            };
            Arc::new(PubSubPublisher::new(project_id.clone(), token))
        }
        None => {
            warn!("PROJECT_ID not set, publishing to logs only");
            Arc::new(LoggingPublisher::new())
        }
    };

    let directory: Arc<dyn SiteDirectory> = Arc::new(store.clone());
    let queue: Arc<dyn EventQueue> = Arc::new(store.clone());

    let expander = Expander::new(directory);
    let activity = Arc::new(Activity::new(expander, publisher));
    let coalescer = Coalescer::new(activity);

    let poller = Poller::new(
        queue,
        coalescer,
        config.poll_interval,
        config.max_concurrent_events,
        config.stale_recovery_window,
    );

    let cancel = CancellationToken::new();
    let poller_cancel = cancel.clone();
    let poller_task = tokio::spawn(async move { poller.run(poller_cancel).await });

    let app_state = AppState {
        readiness: Arc::new(PoolReadiness::new(pool)),
    };
    let app = build_app(app_state);
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "health server listening");

    let server_cancel = cancel.clone();
    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining");
    cancel.cancel();

    let drain = tokio::time::timeout(config.drain_timeout, poller_task);
    match drain.await {
        Ok(Ok(())) => info!("poller drained cleanly"),
        Ok(Err(e)) => error!(error = %e, "poller task panicked"),
        Err(_) => warn!("drain timeout elapsed, exiting anyway"),
    }

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "health server exited with error"),
        Err(e) => error!(error = %e, "health server task panicked"),
    }

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
