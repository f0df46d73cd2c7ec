use tokio_util::sync::CancellationToken;

/// Cancels the token once the process receives ctrl-c, letting the run loop
/// finish its current check pass and exit cleanly.
pub async fn detect_shutdown(shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        shutdown.cancel();
    }
}
