use std::sync::Arc;

use anyhow::Context;
use cita_checker::{
    BotContext,
    dispatcher::{build_router, run_scheduler},
};
use dotenv::dotenv;
use log::{LevelFilter, error, info};
use tokio::{net::TcpListener, signal};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let ctx = Arc::new(BotContext::new().context("failed to build bot context")?);

    let bind_addr = ctx.bot_env.bind_addr.clone();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind webhook listener to {bind_addr}"))?;
    info!("Webhook listening on {}", bind_addr);

    let scheduler = tokio::spawn(run_scheduler(ctx.clone()));

    axum::serve(listener, build_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server failed")?;

    scheduler.abort();
    Ok(())
}
