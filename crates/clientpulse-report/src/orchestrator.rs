//! Runs every connected platform for one client and assembles the report.
//!
//! Platforms are fetched concurrently and settled independently: a failure or
//! panic in one never cancels the others. Connection health is written here,
//! once per platform per run, never by the fetchers.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use clientpulse_core::{
    Connection, ConnectionStatus, DateRange, FetchErrorRecord, FetchOutcome, Ga4Metrics,
    LinkedInMetrics, MetaMetrics, Platform, UnifiedReportData,
};
use clientpulse_db::{ConnectionStore, ConnectionUpdate};
use clientpulse_platforms::PlatformFetcher;
use futures::FutureExt;
use uuid::Uuid;

use crate::mock::MockData;

/// Client name used when the client record cannot be read.
pub const UNKNOWN_CLIENT_NAME: &str = "Unknown Client";

pub type Ga4Source = Arc<dyn PlatformFetcher<Metrics = Ga4Metrics>>;
pub type MetaSource = Arc<dyn PlatformFetcher<Metrics = MetaMetrics>>;
pub type LinkedInSource = Arc<dyn PlatformFetcher<Metrics = LinkedInMetrics>>;

/// One fetcher per platform.
#[derive(Clone)]
pub struct Fetchers {
    pub ga4: Ga4Source,
    pub meta: MetaSource,
    pub linkedin: LinkedInSource,
}

pub struct Orchestrator {
    store: Arc<dyn ConnectionStore>,
    fetchers: Fetchers,
    mock_mode: bool,
}

impl Orchestrator {
    #[must_use]
    pub fn new(store: Arc<dyn ConnectionStore>, fetchers: Fetchers) -> Self {
        Self {
            store,
            fetchers,
            mock_mode: false,
        }
    }

    /// When enabled, live fetchers are bypassed and every platform slot is
    /// filled with seeded mock data.
    #[must_use]
    pub fn with_mock_mode(mut self, enabled: bool) -> Self {
        self.mock_mode = enabled;
        self
    }

    /// Fetches every connected platform for `client_id` over `current`, using
    /// `previous` for period-over-period comparisons.
    ///
    /// Never fails. Platforms without a connected record are skipped silently;
    /// platforms whose fetch fails are listed in `fetch_errors`. Whether a
    /// report with no successful platform is usable is the caller's decision
    /// (see [`UnifiedReportData::is_total_failure`]).
    pub async fn fetch_all_platform_data(
        &self,
        client_id: Uuid,
        agency_id: Uuid,
        current: DateRange,
        previous: DateRange,
    ) -> UnifiedReportData {
        let client_name = self.client_name(client_id).await;
        let mut report = UnifiedReportData {
            client_id,
            client_name,
            agency_id,
            period_start: current.start(),
            period_end: current.end(),
            generated_at: Utc::now(),
            ga4: None,
            meta: None,
            linkedin: None,
            fetch_errors: Vec::new(),
        };

        if self.mock_mode {
            tracing::info!(client_id = %client_id, "mock mode enabled, skipping live fetchers");
            let mock = MockData::generate(client_id, &current);
            report.ga4 = Some(mock.ga4);
            report.meta = Some(mock.meta);
            report.linkedin = Some(mock.linkedin);
            return report;
        }

        let connections = self.connected(client_id).await;
        let ga4_id = connection_for(&connections, Platform::Ga4);
        let meta_id = connection_for(&connections, Platform::Meta);
        let linkedin_id = connection_for(&connections, Platform::LinkedIn);

        let period = format!("{}..{}", current.start_iso(), current.end_iso());
        tracing::info!(
            client_id = %client_id,
            period = %period,
            ga4 = ga4_id.is_some(),
            meta = meta_id.is_some(),
            linkedin = linkedin_id.is_some(),
            "fetching platform data"
        );

        let (ga4, meta, linkedin) = tokio::join!(
            guarded_fetch(self.fetchers.ga4.as_ref(), Platform::Ga4, ga4_id, current, previous),
            guarded_fetch(self.fetchers.meta.as_ref(), Platform::Meta, meta_id, current, previous),
            guarded_fetch(
                self.fetchers.linkedin.as_ref(),
                Platform::LinkedIn,
                linkedin_id,
                current,
                previous
            ),
        );

        report.ga4 = self
            .settle(Platform::Ga4, ga4, &mut report.fetch_errors)
            .await;
        report.meta = self
            .settle(Platform::Meta, meta, &mut report.fetch_errors)
            .await;
        report.linkedin = self
            .settle(Platform::LinkedIn, linkedin, &mut report.fetch_errors)
            .await;

        let succeeded = report.succeeded_platforms().len();
        let failed = report.fetch_errors.len();
        if report.is_total_failure() {
            tracing::error!(client_id = %client_id, failed, "every connected platform failed");
        } else {
            tracing::info!(client_id = %client_id, succeeded, failed, "platform fetch complete");
        }

        report
    }

    async fn client_name(&self, client_id: Uuid) -> String {
        match self.store.get_client(client_id).await {
            Ok(Some(client)) => client.name,
            Ok(None) => {
                tracing::warn!(client_id = %client_id, "client not found, using placeholder name");
                UNKNOWN_CLIENT_NAME.to_string()
            }
            Err(e) => {
                tracing::warn!(
                    client_id = %client_id,
                    error = %e,
                    "client lookup failed, using placeholder name"
                );
                UNKNOWN_CLIENT_NAME.to_string()
            }
        }
    }

    /// Connections currently marked healthy. A failed listing yields none.
    async fn connected(&self, client_id: Uuid) -> Vec<Connection> {
        match self.store.list_client_connections(client_id).await {
            Ok(connections) => connections
                .into_iter()
                .filter(|c| c.status == ConnectionStatus::Connected)
                .collect(),
            Err(e) => {
                tracing::error!(client_id = %client_id, error = %e, "failed to list connections");
                Vec::new()
            }
        }
    }

    /// Records one platform's outcome: fills the slot on success, otherwise
    /// appends an error record. Either way the connection's health is updated.
    async fn settle<M>(
        &self,
        platform: Platform,
        attempt: Option<(Uuid, FetchOutcome<M>)>,
        errors: &mut Vec<FetchErrorRecord>,
    ) -> Option<M> {
        let (connection_id, outcome) = attempt?;
        match outcome {
            FetchOutcome::Success { data } => {
                self.record_health(platform, connection_id, ConnectionUpdate::synced(Utc::now()))
                    .await;
                Some(data)
            }
            FetchOutcome::Failure { error, .. } => {
                errors.push(FetchErrorRecord {
                    platform,
                    error: error.clone(),
                    timestamp: Utc::now(),
                });
                self.record_health(platform, connection_id, ConnectionUpdate::failed(error))
                    .await;
                None
            }
        }
    }

    async fn record_health(&self, platform: Platform, connection_id: Uuid, update: ConnectionUpdate) {
        if let Err(e) = self.store.update_connection(connection_id, update).await {
            tracing::error!(
                platform = %platform,
                connection_id = %connection_id,
                error = %e,
                "failed to record connection health"
            );
        }
    }
}

fn connection_for(connections: &[Connection], platform: Platform) -> Option<Uuid> {
    connections
        .iter()
        .find(|c| c.platform == platform)
        .map(|c| c.id)
}

/// Runs one fetcher if the platform is connected, turning a panic into a
/// failure outcome.
async fn guarded_fetch<M>(
    fetcher: &dyn PlatformFetcher<Metrics = M>,
    platform: Platform,
    connection_id: Option<Uuid>,
    current: DateRange,
    previous: DateRange,
) -> Option<(Uuid, FetchOutcome<M>)>
where
    M: Send + 'static,
{
    let connection_id = connection_id?;
    let outcome = AssertUnwindSafe(fetcher.fetch(connection_id, current, previous))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            let detail = panic_detail(payload.as_ref());
            tracing::error!(
                platform = %platform,
                connection_id = %connection_id,
                panic = %detail,
                "fetcher panicked"
            );
            FetchOutcome::failure(
                platform,
                format!("Unexpected error while fetching {platform} data: {detail}"),
            )
        });
    Some((connection_id, outcome))
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_detail_reads_str_and_string_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_detail(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_detail(boxed.as_ref()), "kaboom");

        let boxed: Box<dyn Any + Send> = Box::new(17_u8);
        assert_eq!(panic_detail(boxed.as_ref()), "unknown panic");
    }
}
