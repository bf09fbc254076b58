//! Retry utility with exponential backoff

use std::time::Duration;
use tracing::warn;

const MAX_DELAY: Duration = Duration::from_secs(30);

/// Retry an async operation with exponential backoff.
///
/// Returns `Ok` on first success, or the last `Err` once `max_attempts` is
/// reached (a value of 0 still makes one attempt).
/// Delays: `initial_delay`, `2 * initial_delay`, `4 * initial_delay`, ... capped at 30s.
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    max_attempts: u32,
    initial_delay: Duration,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = initial_delay;
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(val) => return Ok(val),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    operation_name, attempt, max_attempts, e
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay);
                attempt += 1;
            }
        }
    }
}

fn next_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}
