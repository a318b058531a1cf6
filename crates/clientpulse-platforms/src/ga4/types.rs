//! Wire types for the GA4 Data API `runReport` method.

use clientpulse_core::{DateRange, Platform};
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunReportRequest {
    pub date_ranges: Vec<ApiDateRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Named>,
    pub metrics: Vec<Named>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_bys: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl RunReportRequest {
    pub fn new(range: DateRange, metrics: &[&str]) -> Self {
        Self {
            date_ranges: vec![ApiDateRange {
                start_date: range.start_iso(),
                end_date: range.end_iso(),
            }],
            dimensions: Vec::new(),
            metrics: metrics.iter().map(|m| Named::new(m)).collect(),
            order_bys: Vec::new(),
            limit: None,
        }
    }

    pub fn dimensions(mut self, names: &[&str]) -> Self {
        self.dimensions = names.iter().map(|d| Named::new(d)).collect();
        self
    }

    pub fn order_by_metric_desc(mut self, metric: &str) -> Self {
        self.order_bys.push(OrderBy {
            metric: Some(MetricOrderBy {
                metric_name: metric.to_string(),
            }),
            dimension: None,
            desc: true,
        });
        self
    }

    pub fn order_by_dimension(mut self, dimension: &str) -> Self {
        self.order_bys.push(OrderBy {
            metric: None,
            dimension: Some(DimensionOrderBy {
                dimension_name: dimension.to_string(),
            }),
            desc: false,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiDateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Named {
    pub name: String,
}

impl Named {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderBy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<MetricOrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<DimensionOrderBy>,
    pub desc: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetricOrderBy {
    pub metric_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DimensionOrderBy {
    pub dimension_name: String,
}

/// GA4 omits `rows` entirely when the range has no data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportRow {
    #[serde(default)]
    pub dimension_values: Vec<CellValue>,
    pub metric_values: Vec<CellValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CellValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}

impl ReportRow {
    /// The metric at `index`, parsed as a finite number. Absent, non-numeric,
    /// `NaN` and infinite values are an error rather than a zero.
    pub fn metric(&self, index: usize, name: &str, context: &str) -> Result<f64, PlatformError> {
        let raw = self
            .metric_values
            .get(index)
            .ok_or_else(|| PlatformError::invalid_field(Platform::Ga4, context, name, "<missing>"))?;
        raw.value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| PlatformError::invalid_field(Platform::Ga4, context, name, &raw.value))
    }

    pub fn dimension(&self, index: usize, name: &str, context: &str) -> Result<&str, PlatformError> {
        self.dimension_values
            .get(index)
            .map(|d| d.value.as_str())
            .ok_or_else(|| PlatformError::invalid_field(Platform::Ga4, context, name, "<missing>"))
    }
}

/// Converts GA4's `YYYYMMDD` date dimension to `YYYY-MM-DD`.
pub(crate) fn ga4_date_to_iso(raw: &str) -> Option<String> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_in_api_shape() {
        let range = DateRange::parse("2026-01-01", "2026-01-31").unwrap();
        let request = RunReportRequest::new(range, &["sessions"])
            .dimensions(&["pagePath"])
            .order_by_metric_desc("sessions")
            .limit(10);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "dateRanges": [{"startDate": "2026-01-01", "endDate": "2026-01-31"}],
                "dimensions": [{"name": "pagePath"}],
                "metrics": [{"name": "sessions"}],
                "orderBys": [{"metric": {"metricName": "sessions"}, "desc": true}],
                "limit": 10
            })
        );
    }

    #[test]
    fn totals_request_omits_empty_sections() {
        let range = DateRange::parse("2026-01-01", "2026-01-31").unwrap();
        let value = serde_json::to_value(RunReportRequest::new(range, &["sessions"])).unwrap();
        assert!(value.get("dimensions").is_none());
        assert!(value.get("orderBys").is_none());
        assert!(value.get("limit").is_none());
    }

    #[test]
    fn response_without_rows_parses_as_empty() {
        let parsed: RunReportResponse = serde_json::from_value(json!({"kind": "analyticsData#runReport"})).unwrap();
        assert!(parsed.rows.is_empty());
    }

    #[test]
    fn non_numeric_metric_is_rejected() {
        let row: ReportRow = serde_json::from_value(json!({
            "metricValues": [{"value": "abc"}]
        }))
        .unwrap();
        let err = row.metric(0, "sessions", "totals").unwrap_err();
        assert!(matches!(err, PlatformError::InvalidField { ref field, .. } if field == "sessions"));
    }

    #[test]
    fn non_finite_metric_is_rejected() {
        for raw in ["NaN", "inf", "-infinity", "1e400"] {
            let row: ReportRow = serde_json::from_value(json!({
                "metricValues": [{"value": raw}]
            }))
            .unwrap();
            assert!(row.metric(0, "sessions", "totals").is_err(), "accepted {raw}");
        }
    }

    #[test]
    fn missing_metric_is_rejected() {
        let row: ReportRow = serde_json::from_value(json!({"metricValues": []})).unwrap();
        assert!(row.metric(0, "sessions", "totals").is_err());
    }

    #[test]
    fn ga4_dates_convert_to_iso() {
        assert_eq!(ga4_date_to_iso("20260105").as_deref(), Some("2026-01-05"));
        assert_eq!(ga4_date_to_iso("2026-01-05"), None);
        assert_eq!(ga4_date_to_iso("(other)"), None);
    }
}
