//! Wire types for the Meta Marketing API `insights` edge.
//!
//! Meta encodes every number as a decimal string. `spend`, `impressions`, and
//! `clicks` are required on every row; a row missing one fails the fetch.

use clientpulse_core::Platform;
use serde::Deserialize;

use crate::error::PlatformError;

/// Action types counted as conversions.
pub(crate) const CONVERSION_ACTIONS: [&str; 3] = ["purchase", "lead", "complete_registration"];

/// Action type whose value is counted as revenue.
pub(crate) const REVENUE_ACTION: &str = "purchase";

#[derive(Debug, Deserialize)]
pub(crate) struct InsightsPage {
    #[serde(default)]
    pub data: Vec<InsightRow>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl InsightsPage {
    pub fn next_url(&self) -> Option<&str> {
        self.paging.as_ref().and_then(|p| p.next.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InsightRow {
    pub spend: String,
    pub impressions: String,
    pub clicks: String,
    #[serde(default)]
    pub reach: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub date_start: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionStat>,
    #[serde(default)]
    pub action_values: Vec<ActionStat>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionStat {
    pub action_type: String,
    pub value: String,
}

/// Parsed numeric view of one insights row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RowNumbers {
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub reach: f64,
    pub conversions: f64,
    pub revenue: f64,
}

impl InsightRow {
    pub fn numbers(&self, context: &str) -> Result<RowNumbers, PlatformError> {
        let conversions = self
            .actions
            .iter()
            .filter(|a| CONVERSION_ACTIONS.contains(&a.action_type.as_str()))
            .map(|a| parse_number(&a.value, "actions.value", context))
            .sum::<Result<f64, _>>()?;
        let revenue = self
            .action_values
            .iter()
            .filter(|a| a.action_type == REVENUE_ACTION)
            .map(|a| parse_number(&a.value, "action_values.value", context))
            .sum::<Result<f64, _>>()?;

        Ok(RowNumbers {
            spend: parse_number(&self.spend, "spend", context)?,
            impressions: parse_number(&self.impressions, "impressions", context)?,
            clicks: parse_number(&self.clicks, "clicks", context)?,
            reach: self
                .reach
                .as_deref()
                .map_or(Ok(0.0), |r| parse_number(r, "reach", context))?,
            conversions,
            revenue,
        })
    }
}

pub(crate) fn parse_number(raw: &str, field: &str, context: &str) -> Result<f64, PlatformError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PlatformError::invalid_field(Platform::Meta, context, field, raw))
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphErrorBody {
    pub error: GraphError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversions_and_revenue_come_from_actions() {
        let row: InsightRow = serde_json::from_value(json!({
            "spend": "100.50",
            "impressions": "10000",
            "clicks": "250",
            "reach": "4000",
            "actions": [
                {"action_type": "purchase", "value": "5"},
                {"action_type": "lead", "value": "3"},
                {"action_type": "link_click", "value": "250"}
            ],
            "action_values": [
                {"action_type": "purchase", "value": "420.00"},
                {"action_type": "lead", "value": "99"}
            ]
        }))
        .unwrap();

        let n = row.numbers("totals").unwrap();
        assert!((n.spend - 100.5).abs() < f64::EPSILON);
        assert!((n.impressions - 10_000.0).abs() < f64::EPSILON);
        assert!((n.reach - 4000.0).abs() < f64::EPSILON);
        assert!((n.conversions - 8.0).abs() < f64::EPSILON);
        assert!((n.revenue - 420.0).abs() < f64::EPSILON);
    }

    #[test]
    fn row_without_spend_fails_to_parse() {
        let result = serde_json::from_value::<InsightRow>(json!({
            "impressions": "10",
            "clicks": "1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn non_numeric_spend_is_rejected() {
        let row: InsightRow = serde_json::from_value(json!({
            "spend": "n/a",
            "impressions": "10",
            "clicks": "1"
        }))
        .unwrap();
        let err = row.numbers("totals").unwrap_err();
        assert!(matches!(err, PlatformError::InvalidField { ref field, .. } if field == "spend"));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        for raw in ["NaN", "inf", "Infinity", "-inf"] {
            let err = parse_number(raw, "spend", "totals").unwrap_err();
            assert!(matches!(err, PlatformError::InvalidField { ref field, .. } if field == "spend"));
        }
        assert!((parse_number(" 12.5 ", "spend", "totals").unwrap() - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn paging_next_is_exposed() {
        let page: InsightsPage = serde_json::from_value(json!({
            "data": [],
            "paging": {"cursors": {"after": "abc"}, "next": "https://graph.facebook.com/next"}
        }))
        .unwrap();
        assert_eq!(page.next_url(), Some("https://graph.facebook.com/next"));
    }
}
