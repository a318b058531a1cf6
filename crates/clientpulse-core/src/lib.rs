//! Domain types, period arithmetic, token encryption, and configuration
//! shared by every `clientpulse` crate.

pub mod app_config;
pub mod config;
pub mod connection;
pub mod crypto;
pub mod dates;
pub mod metrics;
pub mod report;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use connection::{ClientRecord, Connection, ConnectionStatus, Platform};
pub use crypto::{CryptoError, TokenCipher};
pub use dates::{
    current_period, current_period_today, days_in_range, format_period_label, percent_change,
    previous_period, safe_divide, DateRange, DateRangeError, Granularity,
};
pub use metrics::{
    CampaignRow, DailyAdPoint, DailyTrafficPoint, Ga4Metrics, Ga4Summary, Ga4Totals,
    LinkedInMetrics, LinkedInSummary, LinkedInTotals, MetaMetrics, MetaSummary, MetaTotals,
    MetricValue, PageRow, TrafficSourceRow,
};
pub use report::{FetchErrorRecord, FetchOutcome, UnifiedReportData};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid platform: {0}")]
    InvalidPlatform(String),

    #[error("invalid connection status: {0}")]
    InvalidConnectionStatus(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
