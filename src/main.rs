use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mail_gate::bootstrap::InitOutcome;
use mail_gate::clock::SystemClock;
use mail_gate::{api, config::Config, expiration, storage::Database, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "mail-gate starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize database
    let db = Database::open(&config.node.data_dir)?;
    info!("Database opened at: {}", config.node.data_dir);

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(db),
        Arc::new(SystemClock),
    ));

    bootstrap_from_env(&state)?;

    // Where admitted requests go when no local route handles them
    let downstream = match &config.upstream_url {
        Some(url) => {
            let http_client = reqwest::Client::builder()
                .pool_idle_timeout(std::time::Duration::from_secs(30))
                .redirect(reqwest::redirect::Policy::none())
                .timeout(std::time::Duration::from_secs(30))
                .build()?;
            info!(upstream = %url, "Forwarding admitted requests upstream");
            api::upstream_router(api::Upstream::new(url.as_str(), http_client))
        }
        None => {
            tracing::warn!("UPSTREAM_URL not set; admitted requests without a local route get 404");
            api::not_found_router()
        }
    };

    // Start background tasks
    let sweeper_handle = expiration::start_cache_sweeper(Arc::clone(&state));

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state), downstream);
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!("Listening on: {}", config.node.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down background tasks");
    sweeper_handle.abort();

    info!("Shutdown complete");
    Ok(())
}

/// Initialize from `ADMIN_PASSWORD` when set, so unattended deployments
/// never expose the setup page.
fn bootstrap_from_env(state: &AppState) -> anyhow::Result<()> {
    let Ok(password) = std::env::var("ADMIN_PASSWORD") else {
        if !state.setup.is_initialized()? {
            info!("System not initialized; complete setup at {}", state.config.gate.setup_path);
        }
        return Ok(());
    };

    match state.setup.initialize(Some(&password))? {
        InitOutcome::AlreadyInitialized => {
            info!("ADMIN_PASSWORD ignored; system is already initialized");
        }
        InitOutcome::Initialized { .. } => {
            info!("System initialized from ADMIN_PASSWORD");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
