//! Wire types for LinkedIn Marketing `adAnalyticsV2` and `adCampaignsV2`.

use clientpulse_core::Platform;
use serde::Deserialize;

use crate::error::PlatformError;

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyticsResponse {
    #[serde(default)]
    pub elements: Vec<AnalyticsElement>,
}

/// One analytics row. Cost, impressions, and clicks are required; LinkedIn
/// omits conversion and lead counts when they are zero.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyticsElement {
    pub cost_in_local_currency: Numeric,
    pub impressions: Numeric,
    pub clicks: Numeric,
    #[serde(default)]
    pub external_website_conversions: Option<Numeric>,
    #[serde(default)]
    pub one_click_leads: Option<Numeric>,
    #[serde(default)]
    pub pivot_values: Vec<String>,
    #[serde(default)]
    pub date_range: Option<ElementDateRange>,
}

/// LinkedIn sends cost as a decimal string and counts as integers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    /// The value as a finite number; `NaN` and infinities are rejected.
    pub fn value(&self, field: &str, context: &str) -> Result<f64, PlatformError> {
        let parsed = match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse::<f64>().ok(),
        };
        parsed.filter(|v| v.is_finite()).ok_or_else(|| {
            let raw = match self {
                Numeric::Number(n) => n.to_string(),
                Numeric::Text(s) => s.clone(),
            };
            PlatformError::invalid_field(Platform::LinkedIn, context, field, raw)
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ElementNumbers {
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub leads: f64,
}

impl AnalyticsElement {
    pub fn numbers(&self, context: &str) -> Result<ElementNumbers, PlatformError> {
        let optional = |v: &Option<Numeric>, field: &str| {
            v.as_ref().map_or(Ok(0.0), |n| n.value(field, context))
        };
        Ok(ElementNumbers {
            spend: self
                .cost_in_local_currency
                .value("costInLocalCurrency", context)?,
            impressions: self.impressions.value("impressions", context)?,
            clicks: self.clicks.value("clicks", context)?,
            conversions: optional(
                &self.external_website_conversions,
                "externalWebsiteConversions",
            )?,
            leads: optional(&self.one_click_leads, "oneClickLeads")?,
        })
    }

    /// The campaign id from a `urn:li:sponsoredCampaign:<id>` pivot value.
    pub fn campaign_id(&self) -> Option<&str> {
        self.pivot_values
            .first()
            .map(|urn| urn.rsplit(':').next().unwrap_or(urn.as_str()))
    }

    /// `YYYY-MM-DD` of the row's start day, for daily-granularity rows.
    pub fn start_date(&self) -> Option<String> {
        let start = &self.date_range.as_ref()?.start;
        Some(format!(
            "{:04}-{:02}-{:02}",
            start.year, start.month, start.day
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ElementDateRange {
    pub start: DateParts,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DateParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CampaignResponse {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}
