use crate::handler::{build_router, AppState};
use crate::translate::Translator;
use crate::types::Config;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Binds the configured address and serves until Ctrl-C or SIGTERM.
pub async fn serve(config: Config, translator: Arc<dyn Translator>) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr.as_str())
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    serve_on(listener, config, translator).await
}

/// Serves on an already bound listener.
pub async fn serve_on(
    listener: TcpListener,
    config: Config,
    translator: Arc<dyn Translator>,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let sub_path = config.url_sub_path.clone();
    let state = AppState::new(config, translator)?;
    let app = build_router(state);

    log::info!("yaml2json-server is listening on {addr}{sub_path}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    log::info!("yaml2json-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {e}");
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
    log::info!("shutdown signal received");
}
