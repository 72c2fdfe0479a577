use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is received.
/// Every loop of the node selects on this token and stops at its next await point.
pub fn install_shutdown_handler() -> std::io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down");
            }
        }

        token_clone.cancel();
    });

    Ok(token)
}

/// Sleep for `duration`, returning false if the token fired first.
pub async fn sleep_or_cancel(token: &CancellationToken, duration: std::time::Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
