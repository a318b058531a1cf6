//! LinkedIn Ads fetcher (`adAnalyticsV2` finder plus campaign-name lookups).

mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;
use clientpulse_core::{
    days_in_range, CampaignRow, DailyAdPoint, DateRange, FetchOutcome, LinkedInMetrics,
    LinkedInSummary, LinkedInTotals, Platform,
};
use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use crate::error::PlatformError;
use crate::fetcher::{into_outcome, PlatformFetcher};
use crate::http::{read_json, summarize_body, ApiSettings};
use crate::rate_limit::retry_once_on_rate_limit;
use crate::token::TokenProvider;

use self::types::{AnalyticsElement, AnalyticsResponse, ApiErrorBody, CampaignResponse};

const TOP_N: usize = 10;

/// Campaign-name lookups in flight at once.
const NAME_LOOKUP_CONCURRENCY: usize = 3;

const ACCOUNT_URN_PREFIX: &str = "urn:li:sponsoredAccount:";

const ANALYTICS_FIELDS: &str =
    "costInLocalCurrency,impressions,clicks,externalWebsiteConversions,oneClickLeads,pivotValues,dateRange";

#[derive(Debug, Clone, Copy)]
enum Pivot {
    Account,
    Campaign,
}

#[derive(Debug, Clone, Copy)]
enum TimeGranularity {
    All,
    Daily,
}

pub struct LinkedInFetcher {
    http: Client,
    settings: ApiSettings,
    tokens: Arc<TokenProvider>,
}

impl LinkedInFetcher {
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
    ) -> Result<LinkedInMetrics, PlatformError> {
        let connection = self
            .tokens
            .connection(Platform::LinkedIn, connection_id)
            .await?;
        let token = self.tokens.long_lived_token(&connection)?;
        let account_urn = normalize_account_urn(&connection.external_account_id);

        let (current_totals, previous_totals, top_campaigns, daily) = tokio::try_join!(
            self.totals(&token, &account_urn, current),
            self.totals(&token, &account_urn, previous),
            self.top_campaigns(&token, &account_urn, current),
            self.daily(&token, &account_urn, current),
        )?;

        tracing::debug!(
            connection_id = %connection_id,
            account = %account_urn,
            spend = current_totals.spend,
            campaigns = top_campaigns.len(),
            "fetched LinkedIn analytics"
        );

        Ok(LinkedInMetrics {
            summary: LinkedInSummary::from_totals(&current_totals, &previous_totals),
            top_campaigns,
            daily,
        })
    }

    async fn totals(
        &self,
        token: &str,
        account_urn: &str,
        range: DateRange,
    ) -> Result<LinkedInTotals, PlatformError> {
        const CONTEXT: &str = "totals";
        let elements = self
            .analytics(token, account_urn, range, Pivot::Account, TimeGranularity::All, CONTEXT)
            .await?;

        let mut totals = LinkedInTotals::default();
        for element in &elements {
            let n = element.numbers(CONTEXT)?;
            totals.spend += n.spend;
            totals.impressions += n.impressions;
            totals.clicks += n.clicks;
            totals.conversions += n.conversions;
            totals.leads += n.leads;
        }
        Ok(totals)
    }

    async fn top_campaigns(
        &self,
        token: &str,
        account_urn: &str,
        range: DateRange,
    ) -> Result<Vec<CampaignRow>, PlatformError> {
        const CONTEXT: &str = "campaigns";
        let elements = self
            .analytics(token, account_urn, range, Pivot::Campaign, TimeGranularity::All, CONTEXT)
            .await?;

        // Rows for the same campaign are merged so each id is looked up once.
        let mut by_id: HashMap<String, types::ElementNumbers> = HashMap::new();
        for element in &elements {
            let id = element.campaign_id().ok_or_else(|| {
                PlatformError::invalid_field(Platform::LinkedIn, CONTEXT, "pivotValues", "<missing>")
            })?;
            let n = element.numbers(CONTEXT)?;
            let entry = by_id.entry(id.to_string()).or_default();
            entry.spend += n.spend;
            entry.impressions += n.impressions;
            entry.clicks += n.clicks;
            entry.conversions += n.conversions;
        }

        let mut ranked: Vec<(String, types::ElementNumbers)> = by_id.into_iter().collect();
        ranked.sort_by(|a, b| b.1.spend.total_cmp(&a.1.spend).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(TOP_N);

        let rows = stream::iter(ranked)
            .map(|(id, n)| async move {
                let name = self.campaign_name(token, &id).await;
                CampaignRow::new(id, name, n.spend, n.impressions, n.clicks, n.conversions)
            })
            .buffered(NAME_LOOKUP_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        Ok(rows)
    }

    /// Resolves a campaign's display name, falling back to `Campaign <id>`.
    async fn campaign_name(&self, token: &str, id: &str) -> String {
        match self.lookup_campaign_name(token, id).await {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => format!("Campaign {id}"),
            Err(err) => {
                tracing::debug!(campaign_id = %id, error = %err, "campaign name lookup failed");
                format!("Campaign {id}")
            }
        }
    }

    async fn lookup_campaign_name(&self, token: &str, id: &str) -> Result<String, PlatformError> {
        let url = self.settings.url(&format!("v2/adCampaignsV2/{id}"));
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PlatformError::http(Platform::LinkedIn, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }
        let campaign: CampaignResponse =
            read_json(Platform::LinkedIn, "campaign name", response).await?;
        Ok(campaign.name)
    }

    async fn daily(
        &self,
        token: &str,
        account_urn: &str,
        range: DateRange,
    ) -> Result<Vec<DailyAdPoint>, PlatformError> {
        const CONTEXT: &str = "daily series";
        let elements = self
            .analytics(token, account_urn, range, Pivot::Account, TimeGranularity::Daily, CONTEXT)
            .await?;

        let mut by_date: HashMap<String, DailyAdPoint> = HashMap::new();
        for element in &elements {
            let date = element.start_date().ok_or_else(|| {
                PlatformError::invalid_field(Platform::LinkedIn, CONTEXT, "dateRange", "<missing>")
            })?;
            let n = element.numbers(CONTEXT)?;
            let point = by_date
                .entry(date.clone())
                .or_insert_with(|| DailyAdPoint::empty(date));
            point.spend += n.spend;
            point.impressions += n.impressions;
            point.clicks += n.clicks;
            point.conversions += n.conversions;
        }

        Ok(days_in_range(&range)
            .into_iter()
            .map(|day| by_date.remove(&day).unwrap_or_else(|| DailyAdPoint::empty(day)))
            .collect())
    }

    async fn analytics(
        &self,
        token: &str,
        account_urn: &str,
        range: DateRange,
        pivot: Pivot,
        granularity: TimeGranularity,
        context: &str,
    ) -> Result<Vec<AnalyticsElement>, PlatformError> {
        let query = analytics_query(account_urn, range, pivot, granularity);
        let url = self.settings.url("v2/adAnalyticsV2");

        let response: AnalyticsResponse = retry_once_on_rate_limit(
            Platform::LinkedIn,
            self.settings.rate_limit_cooldown,
            || {
                let url = url.as_str();
                let query = query.as_slice();
                async move {
                    let response = self
                        .http
                        .get(url)
                        .bearer_auth(token)
                        .query(query)
                        .send()
                        .await
                        .map_err(|e| PlatformError::http(Platform::LinkedIn, e))?;
                    let status = response.status();
                    if status.is_success() {
                        return read_json(Platform::LinkedIn, context, response).await;
                    }
                    let body = response.text().await.unwrap_or_default();
                    Err(classify_error(status, &body))
                }
            },
        )
        .await?;

        Ok(response.elements)
    }
}

fn analytics_query(
    account_urn: &str,
    range: DateRange,
    pivot: Pivot,
    granularity: TimeGranularity,
) -> Vec<(&'static str, String)> {
    let (start, end) = (range.start(), range.end());
    vec![
        ("q", "analytics".to_string()),
        (
            "pivot",
            match pivot {
                Pivot::Account => "ACCOUNT",
                Pivot::Campaign => "CAMPAIGN",
            }
            .to_string(),
        ),
        (
            "timeGranularity",
            match granularity {
                TimeGranularity::All => "ALL",
                TimeGranularity::Daily => "DAILY",
            }
            .to_string(),
        ),
        ("dateRange.start.year", start.year().to_string()),
        ("dateRange.start.month", start.month().to_string()),
        ("dateRange.start.day", start.day().to_string()),
        ("dateRange.end.year", end.year().to_string()),
        ("dateRange.end.month", end.month().to_string()),
        ("dateRange.end.day", end.day().to_string()),
        ("accounts[0]", account_urn.to_string()),
        ("fields", ANALYTICS_FIELDS.to_string()),
    ]
}

fn classify_error(status: StatusCode, body: &str) -> PlatformError {
    match status {
        StatusCode::UNAUTHORIZED => PlatformError::credentials(
            Platform::LinkedIn,
            format!("adAnalytics returned {status}"),
        ),
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited {
            platform: Platform::LinkedIn,
        },
        _ => {
            let message = serde_json::from_str::<ApiErrorBody>(body)
                .map(|b| b.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| summarize_body(body));
            PlatformError::Upstream {
                platform: Platform::LinkedIn,
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Accepts either `123456` or `urn:li:sponsoredAccount:123456`.
fn normalize_account_urn(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with(ACCOUNT_URN_PREFIX) {
        raw.to_string()
    } else {
        format!("{ACCOUNT_URN_PREFIX}{raw}")
    }
}

#[async_trait]
impl PlatformFetcher for LinkedInFetcher {
    type Metrics = LinkedInMetrics;

    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn fetch(
        &self,
        connection_id: Uuid,
        current: DateRange,
        previous: DateRange,
    ) -> FetchOutcome<LinkedInMetrics> {
        into_outcome(
            Platform::LinkedIn,
            connection_id,
            self.fetch_inner(connection_id, current, previous).await,
        )
    }
}
