//! Fetch outcomes and the unified report assembled from them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::Platform;
use crate::metrics::{Ga4Metrics, LinkedInMetrics, MetaMetrics};

/// Result of one platform fetch: normalized data or a displayable failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchOutcome<T> {
    Success { data: T },
    Failure { platform: Platform, error: String },
}

impl<T> FetchOutcome<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    #[must_use]
    pub fn failure(platform: Platform, error: impl Into<String>) -> Self {
        Self::Failure {
            platform,
            error: error.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the data on success, or the error message on failure.
    ///
    /// # Errors
    ///
    /// Returns the failure message when the outcome is [`FetchOutcome::Failure`].
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure { error, .. } => Err(error),
        }
    }
}

/// A connected platform that could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchErrorRecord {
    pub platform: Platform,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything the commentary, PDF, and email stages need for one report.
///
/// A platform slot is `Some` exactly when that platform was connected and
/// fetched successfully; connected platforms that failed appear in
/// `fetch_errors` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedReportData {
    pub client_id: Uuid,
    pub client_name: String,
    pub agency_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub ga4: Option<Ga4Metrics>,
    pub meta: Option<MetaMetrics>,
    pub linkedin: Option<LinkedInMetrics>,
    pub fetch_errors: Vec<FetchErrorRecord>,
}

impl UnifiedReportData {
    #[must_use]
    pub fn has_data_for(&self, platform: Platform) -> bool {
        match platform {
            Platform::Ga4 => self.ga4.is_some(),
            Platform::Meta => self.meta.is_some(),
            Platform::LinkedIn => self.linkedin.is_some(),
        }
    }

    /// Platforms with a populated metric set, in [`Platform::ALL`] order.
    #[must_use]
    pub fn succeeded_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.has_data_for(*p))
            .collect()
    }

    #[must_use]
    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.fetch_errors.iter().map(|e| e.platform).collect()
    }

    /// `true` when at least one platform was attempted and none succeeded.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        !self.fetch_errors.is_empty() && self.succeeded_platforms().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_report() -> UnifiedReportData {
        UnifiedReportData {
            client_id: Uuid::new_v4(),
            client_name: "Acme".to_string(),
            agency_id: Uuid::new_v4(),
            period_start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            generated_at: Utc::now(),
            ga4: None,
            meta: None,
            linkedin: None,
            fetch_errors: vec![],
        }
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome: FetchOutcome<u32> = FetchOutcome::failure(Platform::Meta, "boom");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["platform"], "meta");
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn outcome_into_result() {
        assert_eq!(FetchOutcome::success(3).into_result(), Ok(3));
        let failed: FetchOutcome<u8> = FetchOutcome::failure(Platform::Ga4, "nope");
        assert_eq!(failed.into_result(), Err("nope".to_string()));
    }

    #[test]
    fn report_with_no_connections_is_not_a_total_failure() {
        assert!(!empty_report().is_total_failure());
    }

    #[test]
    fn report_with_only_errors_is_a_total_failure() {
        let mut report = empty_report();
        report.fetch_errors.push(FetchErrorRecord {
            platform: Platform::LinkedIn,
            error: "LinkedIn Ads rate limit reached".to_string(),
            timestamp: Utc::now(),
        });
        assert!(report.is_total_failure());
        assert_eq!(report.failed_platforms(), vec![Platform::LinkedIn]);
    }

    #[test]
    fn report_serializes_camel_case_slots() {
        let json = serde_json::to_value(empty_report()).unwrap();
        assert!(json.get("clientName").is_some());
        assert!(json.get("fetchErrors").is_some());
        assert!(json["ga4"].is_null());
        assert_eq!(json["periodStart"], "2026-01-01");
    }
}
