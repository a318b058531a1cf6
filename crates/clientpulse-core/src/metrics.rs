//! Normalized per-platform metric sets.
//!
//! All numeric values are `f64` so ratios and counts share one comparison
//! type; upstream APIs report most counts as decimal strings anyway.

use serde::{Deserialize, Serialize};

use crate::dates::{percent_change, safe_divide};

/// A metric's value in the current and comparison periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    pub current: f64,
    pub previous: f64,
    /// Percentage change rounded to one decimal; `0.0` when `previous` is zero.
    pub change_percent: f64,
}

impl MetricValue {
    #[must_use]
    pub fn compare(current: f64, previous: f64) -> Self {
        Self {
            current,
            previous,
            change_percent: percent_change(current, previous),
        }
    }
}

/// Click-through rate as a percentage.
#[must_use]
pub fn ctr(clicks: f64, impressions: f64) -> f64 {
    safe_divide(clicks, impressions) * 100.0
}

/// Cost per click.
#[must_use]
pub fn cpc(spend: f64, clicks: f64) -> f64 {
    safe_divide(spend, clicks)
}

/// Cost per thousand impressions.
#[must_use]
pub fn cpm(spend: f64, impressions: f64) -> f64 {
    safe_divide(spend, impressions) * 1000.0
}

/// Return on ad spend.
#[must_use]
pub fn roas(revenue: f64, spend: f64) -> f64 {
    safe_divide(revenue, spend)
}

/// Average impressions per reached user.
#[must_use]
pub fn frequency(impressions: f64, reach: f64) -> f64 {
    safe_divide(impressions, reach)
}

// ---------------------------------------------------------------------------
// Google Analytics
// ---------------------------------------------------------------------------

/// Period totals for one GA4 property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ga4Totals {
    pub sessions: f64,
    pub users: f64,
    pub new_users: f64,
    pub pageviews: f64,
    pub engaged_sessions: f64,
    pub engagement_duration_secs: f64,
    pub conversions: f64,
}

impl Ga4Totals {
    /// Share of sessions that were not engaged, as a percentage.
    #[must_use]
    pub fn bounce_rate(&self) -> f64 {
        safe_divide(self.sessions - self.engaged_sessions, self.sessions) * 100.0
    }

    #[must_use]
    pub fn avg_session_duration_secs(&self) -> f64 {
        safe_divide(self.engagement_duration_secs, self.sessions)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ga4Summary {
    pub sessions: MetricValue,
    pub users: MetricValue,
    pub new_users: MetricValue,
    pub pageviews: MetricValue,
    pub bounce_rate: MetricValue,
    pub avg_session_duration: MetricValue,
    pub conversions: MetricValue,
}

impl Ga4Summary {
    #[must_use]
    pub fn from_totals(current: &Ga4Totals, previous: &Ga4Totals) -> Self {
        Self {
            sessions: MetricValue::compare(current.sessions, previous.sessions),
            users: MetricValue::compare(current.users, previous.users),
            new_users: MetricValue::compare(current.new_users, previous.new_users),
            pageviews: MetricValue::compare(current.pageviews, previous.pageviews),
            bounce_rate: MetricValue::compare(current.bounce_rate(), previous.bounce_rate()),
            avg_session_duration: MetricValue::compare(
                current.avg_session_duration_secs(),
                previous.avg_session_duration_secs(),
            ),
            conversions: MetricValue::compare(current.conversions, previous.conversions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSourceRow {
    pub source: String,
    pub medium: String,
    pub sessions: f64,
    pub users: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRow {
    pub path: String,
    pub pageviews: f64,
    pub sessions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTrafficPoint {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub sessions: f64,
    pub users: f64,
}

impl DailyTrafficPoint {
    #[must_use]
    pub fn empty(date: String) -> Self {
        Self {
            date,
            sessions: 0.0,
            users: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ga4Metrics {
    pub summary: Ga4Summary,
    pub top_sources: Vec<TrafficSourceRow>,
    pub top_pages: Vec<PageRow>,
    pub daily: Vec<DailyTrafficPoint>,
}

// ---------------------------------------------------------------------------
// Ad platforms (shared rows)
// ---------------------------------------------------------------------------

/// One campaign in a top-N breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRow {
    pub id: String,
    pub name: String,
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub ctr: f64,
    pub cpc: f64,
}

impl CampaignRow {
    #[must_use]
    pub fn new(
        id: String,
        name: String,
        spend: f64,
        impressions: f64,
        clicks: f64,
        conversions: f64,
    ) -> Self {
        Self {
            id,
            name,
            spend,
            impressions,
            clicks,
            conversions,
            ctr: ctr(clicks, impressions),
            cpc: cpc(spend, clicks),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAdPoint {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
}

impl DailyAdPoint {
    #[must_use]
    pub fn empty(date: String) -> Self {
        Self {
            date,
            spend: 0.0,
            impressions: 0.0,
            clicks: 0.0,
            conversions: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Meta Ads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaTotals {
    pub spend: f64,
    pub impressions: f64,
    pub reach: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaSummary {
    pub spend: MetricValue,
    pub impressions: MetricValue,
    pub reach: MetricValue,
    pub clicks: MetricValue,
    pub ctr: MetricValue,
    pub cpc: MetricValue,
    pub cpm: MetricValue,
    pub conversions: MetricValue,
    pub cost_per_conversion: MetricValue,
    pub roas: MetricValue,
    pub frequency: MetricValue,
}

impl MetaSummary {
    #[must_use]
    pub fn from_totals(current: &MetaTotals, previous: &MetaTotals) -> Self {
        let pair = |f: fn(&MetaTotals) -> f64| MetricValue::compare(f(current), f(previous));
        Self {
            spend: pair(|t| t.spend),
            impressions: pair(|t| t.impressions),
            reach: pair(|t| t.reach),
            clicks: pair(|t| t.clicks),
            ctr: pair(|t| ctr(t.clicks, t.impressions)),
            cpc: pair(|t| cpc(t.spend, t.clicks)),
            cpm: pair(|t| cpm(t.spend, t.impressions)),
            conversions: pair(|t| t.conversions),
            cost_per_conversion: pair(|t| safe_divide(t.spend, t.conversions)),
            roas: pair(|t| roas(t.revenue, t.spend)),
            frequency: pair(|t| frequency(t.impressions, t.reach)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaMetrics {
    pub summary: MetaSummary,
    pub top_campaigns: Vec<CampaignRow>,
    pub daily: Vec<DailyAdPoint>,
}

// ---------------------------------------------------------------------------
// LinkedIn Ads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInTotals {
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub leads: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInSummary {
    pub spend: MetricValue,
    pub impressions: MetricValue,
    pub clicks: MetricValue,
    pub ctr: MetricValue,
    pub cpc: MetricValue,
    pub cpm: MetricValue,
    pub conversions: MetricValue,
    pub cost_per_conversion: MetricValue,
    pub leads: MetricValue,
    pub cost_per_lead: MetricValue,
}

impl LinkedInSummary {
    #[must_use]
    pub fn from_totals(current: &LinkedInTotals, previous: &LinkedInTotals) -> Self {
        let pair = |f: fn(&LinkedInTotals) -> f64| MetricValue::compare(f(current), f(previous));
        Self {
            spend: pair(|t| t.spend),
            impressions: pair(|t| t.impressions),
            clicks: pair(|t| t.clicks),
            ctr: pair(|t| ctr(t.clicks, t.impressions)),
            cpc: pair(|t| cpc(t.spend, t.clicks)),
            cpm: pair(|t| cpm(t.spend, t.impressions)),
            conversions: pair(|t| t.conversions),
            cost_per_conversion: pair(|t| safe_divide(t.spend, t.conversions)),
            leads: pair(|t| t.leads),
            cost_per_lead: pair(|t| safe_divide(t.spend, t.leads)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInMetrics {
    pub summary: LinkedInSummary,
    pub top_campaigns: Vec<CampaignRow>,
    pub daily: Vec<DailyAdPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_all_finite(values: &[MetricValue]) {
        for v in values {
            assert!(v.current.is_finite(), "{v:?}");
            assert!(v.previous.is_finite(), "{v:?}");
            assert!(v.change_percent.is_finite(), "{v:?}");
        }
    }

    #[test]
    fn zero_spend_period_produces_zero_ratios() {
        let empty = MetaTotals::default();
        let summary = MetaSummary::from_totals(&empty, &empty);
        assert_all_finite(&[
            summary.ctr,
            summary.cpc,
            summary.cpm,
            summary.cost_per_conversion,
            summary.roas,
            summary.frequency,
        ]);
        assert!(summary.roas.current.abs() < f64::EPSILON);
    }

    #[test]
    fn meta_summary_computes_ratios() {
        let current = MetaTotals {
            spend: 200.0,
            impressions: 10_000.0,
            reach: 5_000.0,
            clicks: 250.0,
            conversions: 10.0,
            revenue: 800.0,
        };
        let previous = MetaTotals {
            spend: 100.0,
            ..current
        };
        let summary = MetaSummary::from_totals(&current, &previous);
        assert!((summary.ctr.current - 2.5).abs() < 1e-9);
        assert!((summary.cpc.current - 0.8).abs() < 1e-9);
        assert!((summary.cpm.current - 20.0).abs() < 1e-9);
        assert!((summary.roas.current - 4.0).abs() < 1e-9);
        assert!((summary.frequency.current - 2.0).abs() < 1e-9);
        assert!((summary.cost_per_conversion.current - 20.0).abs() < 1e-9);
        assert!((summary.spend.change_percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn linkedin_zero_leads_cost_per_lead_is_zero() {
        let current = LinkedInTotals {
            spend: 50.0,
            ..LinkedInTotals::default()
        };
        let summary = LinkedInSummary::from_totals(&current, &LinkedInTotals::default());
        assert!(summary.cost_per_lead.current.abs() < f64::EPSILON);
        assert!(summary.spend.change_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn ga4_bounce_rate_and_duration() {
        let totals = Ga4Totals {
            sessions: 200.0,
            engaged_sessions: 150.0,
            engagement_duration_secs: 12_000.0,
            ..Ga4Totals::default()
        };
        assert!((totals.bounce_rate() - 25.0).abs() < 1e-9);
        assert!((totals.avg_session_duration_secs() - 60.0).abs() < 1e-9);
        assert!(Ga4Totals::default().bounce_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn metric_sets_serialize_camel_case() {
        let value = serde_json::to_value(MetricValue::compare(2.0, 1.0)).unwrap();
        assert_eq!(value["changePercent"], 100.0);
    }
}
