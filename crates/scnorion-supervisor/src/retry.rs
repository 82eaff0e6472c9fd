use std::time::Duration;

use tracing::{error, info, warn};

/// Default interval between reconnect attempts, matching the 2-minute
/// cadence of the original scheduled retry jobs.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(120);

/// Retries `connect` on a fixed interval until it succeeds. This is
/// deliberately not a general-purpose scheduler: a successful connection
/// ends the loop for good, there is no job registry, and a failed
/// attempt only ever logs and waits for the next tick.
pub async fn connect_with_retry<T, E, F, Fut>(label: &str, mut connect: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match connect().await {
        Ok(value) => {
            info!(label, "connected on first attempt");
            return value;
        }
        Err(e) => warn!(label, error = %e, "initial connection attempt failed, retrying"),
    }

    let mut interval = tokio::time::interval(RECONNECT_INTERVAL);
    interval.tick().await; // first tick fires immediately; already consumed above
    loop {
        interval.tick().await;
        match connect().await {
            Ok(value) => {
                info!(label, "reconnected");
                return value;
            }
            Err(e) => error!(label, error = %e, "connection attempt failed, will retry"),
        }
    }
}
