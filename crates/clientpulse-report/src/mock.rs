//! Seeded stand-in metrics for running the report pipeline without live
//! credentials.
//!
//! The generator is seeded from a SHA-256 of the client id and period, so the
//! same client and period always produce the same numbers.

use std::ops::Range;

use clientpulse_core::{
    days_in_range, CampaignRow, DailyAdPoint, DailyTrafficPoint, DateRange, Ga4Metrics,
    Ga4Summary, Ga4Totals, LinkedInMetrics, LinkedInSummary, LinkedInTotals, MetaMetrics,
    MetaSummary, MetaTotals, PageRow, TrafficSourceRow,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

const TRAFFIC_SOURCES: [(&str, &str); 6] = [
    ("google", "organic"),
    ("(direct)", "(none)"),
    ("google", "cpc"),
    ("facebook.com", "referral"),
    ("linkedin.com", "social"),
    ("newsletter", "email"),
];

const PAGES: [&str; 6] = ["/", "/services", "/about", "/blog", "/pricing", "/contact"];

const META_CAMPAIGNS: [&str; 4] = [
    "Prospecting - Lookalike Audiences",
    "Retargeting - Website Visitors",
    "Brand Awareness",
    "Lead Gen - Seasonal Offer",
];

const LINKEDIN_CAMPAIGNS: [&str; 3] = [
    "Decision Makers - Sponsored Content",
    "Lead Gen Form - Whitepaper",
    "Retargeting - Company Page Visitors",
];

/// Generated metric sets for all three platforms.
#[derive(Debug, Clone, PartialEq)]
pub struct MockData {
    pub ga4: Ga4Metrics,
    pub meta: MetaMetrics,
    pub linkedin: LinkedInMetrics,
}

impl MockData {
    #[must_use]
    pub fn generate(client_id: Uuid, current: &DateRange) -> Self {
        let mut rng = mock_rng(client_id, current);
        let ga4 = mock_ga4(&mut rng, current);
        let meta = mock_meta(&mut rng, current);
        let linkedin = mock_linkedin(&mut rng, current);
        Self {
            ga4,
            meta,
            linkedin,
        }
    }
}

/// ChaCha8 has a fixed output stream, so mock numbers survive `rand` upgrades.
fn mock_rng(client_id: Uuid, range: &DateRange) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed_for(client_id, range))
}

fn seed_for(client_id: Uuid, range: &DateRange) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(client_id.as_bytes());
    hasher.update(range.start_iso().as_bytes());
    hasher.update(range.end_iso().as_bytes());
    let hash = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(seed)
}

fn whole(value: f64) -> f64 {
    value.round()
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The previous period's value: the current one moved by up to about 25%.
fn previous_of(rng: &mut ChaCha8Rng, current: f64) -> f64 {
    whole(current * rng.random_range(0.75..1.25))
}

/// Splits `total` into `parts` randomly weighted shares, largest first.
fn shares(rng: &mut ChaCha8Rng, total: f64, parts: usize) -> Vec<f64> {
    let weights: Vec<f64> = (0..parts).map(|_| rng.random_range(1.0..10.0)).collect();
    let sum: f64 = weights.iter().sum();
    let mut out: Vec<f64> = weights.iter().map(|w| total * w / sum).collect();
    out.sort_by(|a, b| b.total_cmp(a));
    out
}

// ---------------------------------------------------------------------------
// GA4
// ---------------------------------------------------------------------------

fn mock_ga4(rng: &mut ChaCha8Rng, range: &DateRange) -> Ga4Metrics {
    let daily: Vec<DailyTrafficPoint> = days_in_range(range)
        .into_iter()
        .map(|date| {
            let sessions = whole(rng.random_range(80.0..420.0));
            let users = whole(sessions * rng.random_range(0.7..0.92));
            DailyTrafficPoint {
                date,
                sessions,
                users,
            }
        })
        .collect();

    let sessions: f64 = daily.iter().map(|d| d.sessions).sum();
    let users: f64 = daily.iter().map(|d| d.users).sum();
    let current = Ga4Totals {
        sessions,
        users,
        new_users: whole(users * rng.random_range(0.55..0.8)),
        pageviews: whole(sessions * rng.random_range(1.6..3.2)),
        engaged_sessions: whole(sessions * rng.random_range(0.45..0.72)),
        engagement_duration_secs: whole(sessions * rng.random_range(50.0..180.0)),
        conversions: whole(sessions * rng.random_range(0.01..0.04)),
    };
    let previous = Ga4Totals {
        sessions: previous_of(rng, current.sessions),
        users: previous_of(rng, current.users),
        new_users: previous_of(rng, current.new_users),
        pageviews: previous_of(rng, current.pageviews),
        engaged_sessions: previous_of(rng, current.engaged_sessions),
        engagement_duration_secs: previous_of(rng, current.engagement_duration_secs),
        conversions: previous_of(rng, current.conversions),
    };

    let top_sources = shares(rng, sessions * 0.95, TRAFFIC_SOURCES.len())
        .into_iter()
        .zip(TRAFFIC_SOURCES)
        .map(|(share, (source, medium))| {
            let sessions = whole(share);
            TrafficSourceRow {
                source: source.to_string(),
                medium: medium.to_string(),
                sessions,
                users: whole(sessions * 0.85),
            }
        })
        .collect();

    let top_pages = shares(rng, current.pageviews * 0.8, PAGES.len())
        .into_iter()
        .zip(PAGES)
        .map(|(share, path)| {
            let pageviews = whole(share);
            PageRow {
                path: path.to_string(),
                pageviews,
                sessions: whole(pageviews * 0.6),
            }
        })
        .collect();

    Ga4Metrics {
        summary: Ga4Summary::from_totals(&current, &previous),
        top_sources,
        top_pages,
        daily,
    }
}

// ---------------------------------------------------------------------------
// Ad platforms
// ---------------------------------------------------------------------------

/// Per-day shape of an ad account's delivery.
struct AdProfile {
    daily_spend: Range<f64>,
    /// Impressions bought per unit of spend.
    impressions_per_spend: Range<f64>,
    click_rate: Range<f64>,
    conversion_rate: Range<f64>,
}

fn mock_ad_daily(
    rng: &mut ChaCha8Rng,
    range: &DateRange,
    profile: &AdProfile,
) -> Vec<DailyAdPoint> {
    days_in_range(range)
        .into_iter()
        .map(|date| {
            let spend = cents(rng.random_range(profile.daily_spend.clone()));
            let impressions =
                whole(spend * rng.random_range(profile.impressions_per_spend.clone()));
            let clicks = whole(impressions * rng.random_range(profile.click_rate.clone()));
            let conversions = whole(clicks * rng.random_range(profile.conversion_rate.clone()));
            DailyAdPoint {
                date,
                spend,
                impressions,
                clicks,
                conversions,
            }
        })
        .collect()
}

fn mock_campaigns(
    rng: &mut ChaCha8Rng,
    prefix: &str,
    names: &[&str],
    spend: f64,
    impressions: f64,
    clicks: f64,
    conversions: f64,
) -> Vec<CampaignRow> {
    shares(rng, 1.0, names.len())
        .into_iter()
        .zip(names)
        .enumerate()
        .map(|(i, (share, name))| {
            CampaignRow::new(
                format!("{prefix}-{}", i + 1),
                (*name).to_string(),
                cents(spend * share),
                whole(impressions * share),
                whole(clicks * share),
                whole(conversions * share),
            )
        })
        .collect()
}

fn sum_daily(daily: &[DailyAdPoint]) -> (f64, f64, f64, f64) {
    daily.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, d| {
        (
            acc.0 + d.spend,
            acc.1 + d.impressions,
            acc.2 + d.clicks,
            acc.3 + d.conversions,
        )
    })
}

fn mock_meta(rng: &mut ChaCha8Rng, range: &DateRange) -> MetaMetrics {
    let daily = mock_ad_daily(
        rng,
        range,
        &AdProfile {
            daily_spend: 25.0..160.0,
            impressions_per_spend: 60.0..140.0,
            click_rate: 0.008..0.025,
            conversion_rate: 0.02..0.08,
        },
    );
    let (spend, impressions, clicks, conversions) = sum_daily(&daily);

    let current = MetaTotals {
        spend: cents(spend),
        impressions,
        reach: whole(impressions * rng.random_range(0.35..0.7)),
        clicks,
        conversions,
        revenue: cents(conversions * rng.random_range(40.0..120.0)),
    };
    let previous = MetaTotals {
        spend: cents(current.spend * rng.random_range(0.75..1.25)),
        impressions: previous_of(rng, current.impressions),
        reach: previous_of(rng, current.reach),
        clicks: previous_of(rng, current.clicks),
        conversions: previous_of(rng, current.conversions),
        revenue: cents(current.revenue * rng.random_range(0.75..1.25)),
    };

    let top_campaigns = mock_campaigns(
        rng,
        "mock-meta",
        &META_CAMPAIGNS,
        current.spend,
        impressions,
        clicks,
        conversions,
    );

    MetaMetrics {
        summary: MetaSummary::from_totals(&current, &previous),
        top_campaigns,
        daily,
    }
}

fn mock_linkedin(rng: &mut ChaCha8Rng, range: &DateRange) -> LinkedInMetrics {
    let daily = mock_ad_daily(
        rng,
        range,
        &AdProfile {
            daily_spend: 40.0..220.0,
            impressions_per_spend: 20.0..45.0,
            click_rate: 0.004..0.012,
            conversion_rate: 0.03..0.1,
        },
    );
    let (spend, impressions, clicks, conversions) = sum_daily(&daily);

    let current = LinkedInTotals {
        spend: cents(spend),
        impressions,
        clicks,
        conversions,
        leads: whole(clicks * rng.random_range(0.02..0.06)),
    };
    let previous = LinkedInTotals {
        spend: cents(current.spend * rng.random_range(0.75..1.25)),
        impressions: previous_of(rng, current.impressions),
        clicks: previous_of(rng, current.clicks),
        conversions: previous_of(rng, current.conversions),
        leads: previous_of(rng, current.leads),
    };

    let top_campaigns = mock_campaigns(
        rng,
        "mock-linkedin",
        &LINKEDIN_CAMPAIGNS,
        current.spend,
        impressions,
        clicks,
        conversions,
    );

    LinkedInMetrics {
        summary: LinkedInSummary::from_totals(&current, &previous),
        top_campaigns,
        daily,
    }
}
