use async_trait::async_trait;
use clientpulse_core::{DateRange, FetchOutcome, Platform};
use uuid::Uuid;

use crate::error::PlatformError;

/// One platform's query-and-normalize step.
///
/// Expected failures (credentials, rate limits, upstream errors, malformed
/// responses) come back as [`FetchOutcome::Failure`]. Implementations never
/// write connection health; the orchestrator owns that.
#[async_trait]
pub trait PlatformFetcher: Send + Sync {
    type Metrics: Send + 'static;

    fn platform(&self) -> Platform;

    async fn fetch(
        &self,
        connection_id: Uuid,
        current: DateRange,
        previous: DateRange,
    ) -> FetchOutcome<Self::Metrics>;
}

/// Converts a fetcher's internal result into its public outcome, logging failures.
pub(crate) fn into_outcome<T>(
    platform: Platform,
    connection_id: Uuid,
    result: Result<T, PlatformError>,
) -> FetchOutcome<T> {
    match result {
        Ok(data) => FetchOutcome::success(data),
        Err(err) => {
            match &err {
                PlatformError::Credentials { reason, .. } => tracing::warn!(
                    platform = %platform,
                    connection_id = %connection_id,
                    reason = %reason,
                    "credentials rejected"
                ),
                other => tracing::warn!(
                    platform = %platform,
                    connection_id = %connection_id,
                    error = %other,
                    "fetch failed"
                ),
            }
            FetchOutcome::failure(platform, err.to_string())
        }
    }
}
