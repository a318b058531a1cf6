//! Single-retry handling for upstream rate limits.
//!
//! Every platform gets exactly one retry after a fixed, platform-specific
//! cooldown. A second rate-limit response is returned to the caller as-is.
//! Any other error is propagated immediately without sleeping.

use std::future::Future;
use std::time::Duration;

use clientpulse_core::Platform;

use crate::error::PlatformError;

/// Runs `operation`, and if it reports [`PlatformError::RateLimited`], sleeps
/// for `cooldown` and runs it once more.
pub(crate) async fn retry_once_on_rate_limit<T, F, Fut>(
    platform: Platform,
    cooldown: Duration,
    mut operation: F,
) -> Result<T, PlatformError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlatformError>>,
{
    match operation().await {
        Err(err) if err.is_rate_limited() => {
            tracing::warn!(
                platform = %platform,
                cooldown_ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX),
                "rate limited; retrying once after cooldown"
            );
            tokio::time::sleep(cooldown).await;
            operation().await
        }
        other => other,
    }
}
