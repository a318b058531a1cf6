//! Google Analytics 4 fetcher (Data API v1beta `runReport`).

mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use clientpulse_core::{
    days_in_range, DailyTrafficPoint, DateRange, FetchOutcome, Ga4Metrics, Ga4Summary, Ga4Totals,
    PageRow, Platform, TrafficSourceRow,
};
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use crate::error::PlatformError;
use crate::fetcher::{into_outcome, PlatformFetcher};
use crate::http::{read_json, summarize_body, ApiSettings};
use crate::rate_limit::retry_once_on_rate_limit;
use crate::token::TokenProvider;

use self::types::{ga4_date_to_iso, ApiErrorBody, RunReportRequest, RunReportResponse};

const TOP_N: u32 = 10;

const TOTAL_METRICS: [&str; 7] = [
    "sessions",
    "totalUsers",
    "newUsers",
    "screenPageViews",
    "engagedSessions",
    "userEngagementDuration",
    "conversions",
];

pub struct Ga4Fetcher {
    http: Client,
    settings: ApiSettings,
    tokens: Arc<TokenProvider>,
}

impl Ga4Fetcher {
    #[must_use]
    pub fn new(http: Client, settings: ApiSettings, tokens: Arc<TokenProvider>) -> Self {
        Self {
            http,
            settings,
            tokens,
        }
    }

    async fn fetch_inner(
        &self,
        connection_id: Uuid,
        current: DateRange,
        previous: DateRange,
    ) -> Result<Ga4Metrics, PlatformError> {
        let connection = self.tokens.connection(Platform::Ga4, connection_id).await?;
        let token = self
            .tokens
            .ensure_valid_token(connection_id)
            .await
            .ok_or_else(|| PlatformError::credentials(Platform::Ga4, "no valid access token"))?;
        let property = normalize_property_id(&connection.external_account_id);

        let (current_totals, previous_totals, top_sources, top_pages, daily) = tokio::try_join!(
            self.totals(&token, &property, current),
            self.totals(&token, &property, previous),
            self.top_sources(&token, &property, current),
            self.top_pages(&token, &property, current),
            self.daily(&token, &property, current),
        )?;

        tracing::debug!(
            connection_id = %connection_id,
            property = %property,
            sessions = current_totals.sessions,
            "fetched GA4 report"
        );

        Ok(Ga4Metrics {
            summary: Ga4Summary::from_totals(&current_totals, &previous_totals),
            top_sources,
            top_pages,
            daily,
        })
    }

    async fn totals(
        &self,
        token: &str,
        property: &str,
        range: DateRange,
    ) -> Result<Ga4Totals, PlatformError> {
        const CONTEXT: &str = "totals";
        let request = RunReportRequest::new(range, &TOTAL_METRICS);
        let response = self.run_report(token, property, &request, CONTEXT).await?;

        let Some(row) = response.rows.first() else {
            return Ok(Ga4Totals::default());
        };

        Ok(Ga4Totals {
            sessions: row.metric(0, TOTAL_METRICS[0], CONTEXT)?,
            users: row.metric(1, TOTAL_METRICS[1], CONTEXT)?,
            new_users: row.metric(2, TOTAL_METRICS[2], CONTEXT)?,
            pageviews: row.metric(3, TOTAL_METRICS[3], CONTEXT)?,
            engaged_sessions: row.metric(4, TOTAL_METRICS[4], CONTEXT)?,
            engagement_duration_secs: row.metric(5, TOTAL_METRICS[5], CONTEXT)?,
            conversions: row.metric(6, TOTAL_METRICS[6], CONTEXT)?,
        })
    }

    async fn top_sources(
        &self,
        token: &str,
        property: &str,
        range: DateRange,
    ) -> Result<Vec<TrafficSourceRow>, PlatformError> {
        const CONTEXT: &str = "top sources";
        let request = RunReportRequest::new(range, &["sessions", "totalUsers"])
            .dimensions(&["sessionSource", "sessionMedium"])
            .order_by_metric_desc("sessions")
            .limit(TOP_N);
        let response = self.run_report(token, property, &request, CONTEXT).await?;

        response
            .rows
            .iter()
            .map(|row| {
                Ok(TrafficSourceRow {
                    source: row.dimension(0, "sessionSource", CONTEXT)?.to_string(),
                    medium: row.dimension(1, "sessionMedium", CONTEXT)?.to_string(),
                    sessions: row.metric(0, "sessions", CONTEXT)?,
                    users: row.metric(1, "totalUsers", CONTEXT)?,
                })
            })
            .collect()
    }

    async fn top_pages(
        &self,
        token: &str,
        property: &str,
        range: DateRange,
    ) -> Result<Vec<PageRow>, PlatformError> {
        const CONTEXT: &str = "top pages";
        let request = RunReportRequest::new(range, &["screenPageViews", "sessions"])
            .dimensions(&["pagePath"])
            .order_by_metric_desc("screenPageViews")
            .limit(TOP_N);
        let response = self.run_report(token, property, &request, CONTEXT).await?;

        response
            .rows
            .iter()
            .map(|row| {
                Ok(PageRow {
                    path: row.dimension(0, "pagePath", CONTEXT)?.to_string(),
                    pageviews: row.metric(0, "screenPageViews", CONTEXT)?,
                    sessions: row.metric(1, "sessions", CONTEXT)?,
                })
            })
            .collect()
    }

    async fn daily(
        &self,
        token: &str,
        property: &str,
        range: DateRange,
    ) -> Result<Vec<DailyTrafficPoint>, PlatformError> {
        const CONTEXT: &str = "daily series";
        let request = RunReportRequest::new(range, &["sessions", "totalUsers"])
            .dimensions(&["date"])
            .order_by_dimension("date");
        let response = self.run_report(token, property, &request, CONTEXT).await?;

        let mut by_date: HashMap<String, DailyTrafficPoint> = HashMap::new();
        for row in &response.rows {
            let raw_date = row.dimension(0, "date", CONTEXT)?;
            let date = ga4_date_to_iso(raw_date).ok_or_else(|| {
                PlatformError::invalid_field(Platform::Ga4, CONTEXT, "date", raw_date)
            })?;
            by_date.insert(
                date.clone(),
                DailyTrafficPoint {
                    date,
                    sessions: row.metric(0, "sessions", CONTEXT)?,
                    users: row.metric(1, "totalUsers", CONTEXT)?,
                },
            );
        }

        Ok(days_in_range(&range)
            .into_iter()
            .map(|day| {
                by_date
                    .remove(&day)
                    .unwrap_or_else(|| DailyTrafficPoint::empty(day))
            })
            .collect())
    }

    async fn run_report(
        &self,
        token: &str,
        property: &str,
        request: &RunReportRequest,
        context: &str,
    ) -> Result<RunReportResponse, PlatformError> {
        retry_once_on_rate_limit(Platform::Ga4, self.settings.rate_limit_cooldown, || {
            self.run_report_once(token, property, request, context)
        })
        .await
    }

    async fn run_report_once(
        &self,
        token: &str,
        property: &str,
        request: &RunReportRequest,
        context: &str,
    ) -> Result<RunReportResponse, PlatformError> {
        let url = self
            .settings
            .url(&format!("v1beta/properties/{property}:runReport"));
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|e| PlatformError::http(Platform::Ga4, e))?;

        let status = response.status();
        if status.is_success() {
            return read_json(Platform::Ga4, context, response).await;
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }
}

fn classify_error(status: StatusCode, body: &str) -> PlatformError {
    match status {
        StatusCode::UNAUTHORIZED => {
            PlatformError::credentials(Platform::Ga4, format!("runReport returned {status}"))
        }
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited {
            platform: Platform::Ga4,
        },
        _ => {
            let message = serde_json::from_str::<ApiErrorBody>(body)
                .map(|b| b.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| summarize_body(body));
            PlatformError::Upstream {
                platform: Platform::Ga4,
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Accepts either `123456` or `properties/123456`.
fn normalize_property_id(raw: &str) -> String {
    raw.trim()
        .trim_start_matches("properties/")
        .to_string()
}

#[async_trait]
impl PlatformFetcher for Ga4Fetcher {
    type Metrics = Ga4Metrics;

    fn platform(&self) -> Platform {
        Platform::Ga4
    }

    async fn fetch(
        &self,
        connection_id: Uuid,
        current: DateRange,
        previous: DateRange,
    ) -> FetchOutcome<Ga4Metrics> {
        into_outcome(
            Platform::Ga4,
            connection_id,
            self.fetch_inner(connection_id, current, previous).await,
        )
    }
}
