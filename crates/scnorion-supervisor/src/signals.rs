use tokio::sync::watch;
use tracing::info;

/// A receiver that flips to `true` once SIGINT/SIGTERM (or, on Windows,
/// Ctrl-C) has been observed. Handlers select on this alongside their
/// normal work instead of being killed outright, so an in-flight message
/// finishes before the process exits.
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received ctrl-c, shutting down");
        }
        let _ = tx.send(true);
    });

    rx
}
