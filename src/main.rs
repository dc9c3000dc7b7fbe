use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};

use simona_checkout as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);
    api::handlers::health::init_start_time();

    if cfg.has_cors_allowed_origins() {
        info!("CORS restricted to configured origins");
    } else if cfg.is_development() {
        info!("Using permissive CORS because explicit origins were not configured (development environment)");
    } else {
        error!("No CORS origins configured outside development; set APP__CORS_ALLOWED_ORIGINS");
    }

    let app_state = api::AppState::new(cfg.clone()).context("failed to build services")?;
    info!(
        usd_to_amd_rate = %cfg.payments.usd_to_amd_rate,
        storage = %cfg.storage.backend,
        wallet_simulation = %cfg.payments.wallet_simulation,
        "Checkout services ready"
    );

    app_state
        .services
        .sessions
        .start_sweeper(cfg.session_sweep_interval(), cfg.session_idle_timeout());

    let app = api::build_router(app_state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!("simona-checkout listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("simona-checkout stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {}", e);
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
}
