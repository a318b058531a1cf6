//! Meta Ads fetcher (Graph API ad-account `insights`).

mod types;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use clientpulse_core::{
    days_in_range, CampaignRow, DailyAdPoint, DateRange, FetchOutcome, MetaMetrics, MetaSummary,
    MetaTotals, Platform,
};
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use crate::error::PlatformError;
use crate::fetcher::{into_outcome, PlatformFetcher};
use crate::http::{read_json, summarize_body, ApiSettings};
use crate::rate_limit::retry_once_on_rate_limit;
use crate::token::TokenProvider;

use self::types::{GraphErrorBody, InsightRow, InsightsPage};

/// Graph error codes meaning "slow down": app, user, page, and ad-account
/// level throttles.
const RATE_LIMIT_CODES: [i64; 5] = [4, 17, 32, 613, 80004];

/// Graph error code for an invalid or expired access token.
const INVALID_TOKEN_CODE: i64 = 190;

const TOP_N: usize = 10;
const PAGE_LIMIT: &str = "100";

/// Upper bound on `paging.next` follows for a single query.
const MAX_PAGES: usize = 20;

const TOTAL_FIELDS: &str = "spend,impressions,reach,clicks,actions,action_values";
const CAMPAIGN_FIELDS: &str = "campaign_id,campaign_name,spend,impressions,clicks,actions";
const DAILY_FIELDS: &str = "spend,impressions,clicks,actions";

#[derive(Debug, Clone, Copy)]
enum Level {
    Account,
    Campaign,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Account => "account",
            Level::Campaign => "campaign",
        }
    }
}

pub struct MetaFetcher {
    http: Client,
    settings: ApiSettings,
    tokens: Arc<TokenProvider>,
}

impl MetaFetcher {
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
    ) -> Result<MetaMetrics, PlatformError> {
        let connection = self.tokens.connection(Platform::Meta, connection_id).await?;
        let token = self.tokens.long_lived_token(&connection)?;
        let account = normalize_ad_account_id(&connection.external_account_id);

        let (current_totals, previous_totals, top_campaigns, daily) = tokio::try_join!(
            self.totals(&token, &account, current),
            self.totals(&token, &account, previous),
            self.top_campaigns(&token, &account, current),
            self.daily(&token, &account, current),
        )?;

        tracing::debug!(
            connection_id = %connection_id,
            account = %account,
            spend = current_totals.spend,
            campaigns = top_campaigns.len(),
            "fetched Meta insights"
        );

        Ok(MetaMetrics {
            summary: MetaSummary::from_totals(&current_totals, &previous_totals),
            top_campaigns,
            daily,
        })
    }

    async fn totals(
        &self,
        token: &str,
        account: &str,
        range: DateRange,
    ) -> Result<MetaTotals, PlatformError> {
        const CONTEXT: &str = "totals";
        let rows = self
            .insights(token, account, range, Level::Account, TOTAL_FIELDS, false, CONTEXT)
            .await?;

        let mut totals = MetaTotals::default();
        for row in &rows {
            let n = row.numbers(CONTEXT)?;
            totals.spend += n.spend;
            totals.impressions += n.impressions;
            totals.reach += n.reach;
            totals.clicks += n.clicks;
            totals.conversions += n.conversions;
            totals.revenue += n.revenue;
        }
        Ok(totals)
    }

    async fn top_campaigns(
        &self,
        token: &str,
        account: &str,
        range: DateRange,
    ) -> Result<Vec<CampaignRow>, PlatformError> {
        const CONTEXT: &str = "campaigns";
        let rows = self
            .insights(token, account, range, Level::Campaign, CAMPAIGN_FIELDS, false, CONTEXT)
            .await?;

        let mut campaigns = rows
            .iter()
            .map(|row| {
                let id = row.campaign_id.clone().ok_or_else(|| {
                    PlatformError::invalid_field(Platform::Meta, CONTEXT, "campaign_id", "<missing>")
                })?;
                let name = row
                    .campaign_name
                    .clone()
                    .unwrap_or_else(|| format!("Campaign {id}"));
                let n = row.numbers(CONTEXT)?;
                Ok(CampaignRow::new(
                    id,
                    name,
                    n.spend,
                    n.impressions,
                    n.clicks,
                    n.conversions,
                ))
            })
            .collect::<Result<Vec<_>, PlatformError>>()?;

        campaigns.sort_by(|a, b| b.spend.total_cmp(&a.spend));
        campaigns.truncate(TOP_N);
        Ok(campaigns)
    }

    async fn daily(
        &self,
        token: &str,
        account: &str,
        range: DateRange,
    ) -> Result<Vec<DailyAdPoint>, PlatformError> {
        const CONTEXT: &str = "daily series";
        let rows = self
            .insights(token, account, range, Level::Account, DAILY_FIELDS, true, CONTEXT)
            .await?;

        let mut by_date: HashMap<String, DailyAdPoint> = HashMap::new();
        for row in &rows {
            let date = row.date_start.clone().ok_or_else(|| {
                PlatformError::invalid_field(Platform::Meta, CONTEXT, "date_start", "<missing>")
            })?;
            let n = row.numbers(CONTEXT)?;
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

    /// Runs one insights query and follows `paging.next` until exhausted.
    #[allow(clippy::too_many_arguments)]
    async fn insights(
        &self,
        token: &str,
        account: &str,
        range: DateRange,
        level: Level,
        fields: &str,
        daily: bool,
        context: &str,
    ) -> Result<Vec<InsightRow>, PlatformError> {
        let time_range = serde_json::json!({
            "since": range.start_iso(),
            "until": range.end_iso(),
        })
        .to_string();

        let mut query: Vec<(&str, &str)> = vec![
            ("access_token", token),
            ("fields", fields),
            ("time_range", time_range.as_str()),
            ("level", level.as_str()),
            ("limit", PAGE_LIMIT),
        ];
        if daily {
            query.push(("time_increment", "1"));
        }

        let url = self.settings.url(&format!("{account}/insights"));
        let first = self.get_page(&url, Some(query.as_slice()), context).await?;
        let mut next = first.next_url().map(str::to_string);
        let mut rows = first.data;
        let mut pages = 1;

        while let Some(next_url) = next.take() {
            if pages >= MAX_PAGES {
                tracing::warn!(
                    account = %account,
                    context,
                    max_pages = MAX_PAGES,
                    "insights pagination limit reached; truncating"
                );
                break;
            }
            if !self.settings.owns(&next_url) {
                tracing::warn!(
                    account = %account,
                    context,
                    "paging.next points outside the Graph API base URL; not following"
                );
                break;
            }
            let page = self.get_page(&next_url, None, context).await?;
            next = page.next_url().map(str::to_string);
            rows.extend(page.data);
            pages += 1;
        }

        Ok(rows)
    }

    async fn get_page(
        &self,
        url: &str,
        query: Option<&[(&str, &str)]>,
        context: &str,
    ) -> Result<InsightsPage, PlatformError> {
        retry_once_on_rate_limit(Platform::Meta, self.settings.rate_limit_cooldown, || async move {
            let mut request = self.http.get(url);
            if let Some(query) = query {
                request = request.query(query);
            }
            let response = request
                .send()
                .await
                .map_err(|e| PlatformError::http(Platform::Meta, e))?;

            let status = response.status();
            if status.is_success() {
                return read_json(Platform::Meta, context, response).await;
            }
            let body = response.text().await.unwrap_or_default();
            Err(classify_error(status, &body))
        })
        .await
    }
}

fn classify_error(status: StatusCode, body: &str) -> PlatformError {
    let graph_error = serde_json::from_str::<GraphErrorBody>(body).ok().map(|b| b.error);
    let code = graph_error.as_ref().and_then(|e| e.code);

    if status == StatusCode::TOO_MANY_REQUESTS || code.is_some_and(|c| RATE_LIMIT_CODES.contains(&c))
    {
        return PlatformError::RateLimited {
            platform: Platform::Meta,
        };
    }
    if code == Some(INVALID_TOKEN_CODE) || status == StatusCode::UNAUTHORIZED {
        return PlatformError::credentials(
            Platform::Meta,
            format!("insights returned {status} (code {code:?})"),
        );
    }

    let message = graph_error
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| summarize_body(body));
    PlatformError::Upstream {
        platform: Platform::Meta,
        status: status.as_u16(),
        message,
    }
}

/// Accepts either `123456` or `act_123456`.
fn normalize_ad_account_id(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("act_") {
        raw.to_string()
    } else {
        format!("act_{raw}")
    }
}

#[async_trait]
impl PlatformFetcher for MetaFetcher {
    type Metrics = MetaMetrics;

    fn platform(&self) -> Platform {
        Platform::Meta
    }

    async fn fetch(
        &self,
        connection_id: Uuid,
        current: DateRange,
        previous: DateRange,
    ) -> FetchOutcome<MetaMetrics> {
        into_outcome(
            Platform::Meta,
            connection_id,
            self.fetch_inner(connection_id, current, previous).await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ad_account_id_gets_act_prefix_once() {
        assert_eq!(normalize_ad_account_id("123"), "act_123");
        assert_eq!(normalize_ad_account_id("act_123"), "act_123");
    }

    #[test]
    fn throttle_codes_are_rate_limits() {
        for code in RATE_LIMIT_CODES {
            let body = format!(r#"{{"error":{{"message":"slow down","code":{code}}}}}"#);
            let err = classify_error(StatusCode::BAD_REQUEST, &body);
            assert!(err.is_rate_limited(), "code {code} gave {err:?}");
        }
    }

    #[test]
    fn code_190_is_a_credential_failure() {
        let body = r#"{"error":{"message":"Error validating access token","type":"OAuthException","code":190}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body);
        assert!(err.is_credentials());
        assert!(err.to_string().contains("reconnect"));
    }

    #[test]
    fn other_codes_pass_message_through() {
        let body = r#"{"error":{"message":"Invalid parameter","code":100}}"#;
        let err = classify_error(StatusCode::BAD_REQUEST, body);
        assert!(
            matches!(err, PlatformError::Upstream { status: 400, ref message, .. } if message == "Invalid parameter"),
            "got {err:?}"
        );
    }

    #[test]
    fn bare_401_is_a_credential_failure() {
        assert!(classify_error(StatusCode::UNAUTHORIZED, "").is_credentials());
    }
}
