//! Orchestrator tests against the in-memory store, with stub fetchers and,
//! for the end-to-end case, real fetchers pointed at a `wiremock` server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use clientpulse_core::{
    ClientRecord, Connection, ConnectionStatus, DateRange, FetchOutcome, Ga4Metrics,
    LinkedInMetrics, MetaMetrics, Platform, TokenCipher,
};
use clientpulse_db::MemoryStore;
use clientpulse_platforms::{
    build_http_client, ApiSettings, Ga4Fetcher, GoogleOAuthClient, MetaFetcher, PlatformFetcher,
    TokenProvider,
};
use clientpulse_report::{Fetchers, MockData, Orchestrator, UNKNOWN_CLIENT_NAME};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

enum Behavior<M> {
    Succeed(M),
    Fail(String),
    Panic,
}

struct StubFetcher<M> {
    platform: Platform,
    behavior: Behavior<M>,
    calls: AtomicU32,
}

impl<M> StubFetcher<M> {
    fn new(platform: Platform, behavior: Behavior<M>) -> Arc<Self> {
        Arc::new(Self {
            platform,
            behavior,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<M> PlatformFetcher for StubFetcher<M>
where
    M: Clone + Send + Sync + 'static,
{
    type Metrics = M;

    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(
        &self,
        _connection_id: Uuid,
        _current: DateRange,
        _previous: DateRange,
    ) -> FetchOutcome<M> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(data) => FetchOutcome::success(data.clone()),
            Behavior::Fail(error) => FetchOutcome::failure(self.platform, error.clone()),
            Behavior::Panic => panic!("stub fetcher exploded"),
        }
    }
}

fn january() -> DateRange {
    DateRange::parse("2026-01-01", "2026-01-31").expect("valid range")
}

fn december() -> DateRange {
    DateRange::parse("2025-12-01", "2025-12-31").expect("valid range")
}

fn cipher() -> TokenCipher {
    TokenCipher::from_key_bytes(&[9u8; 32])
}

fn sample() -> MockData {
    MockData::generate(Uuid::from_u128(1), &january())
}

struct Client {
    store: Arc<MemoryStore>,
    client_id: Uuid,
    agency_id: Uuid,
}

impl Client {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let client_id = Uuid::new_v4();
        let agency_id = Uuid::new_v4();
        store.insert_client(ClientRecord {
            id: client_id,
            agency_id,
            name: "Acme Dental".to_string(),
        });
        Self {
            store,
            client_id,
            agency_id,
        }
    }

    fn connect(&self, platform: Platform, status: ConnectionStatus) -> Uuid {
        let connection = Connection {
            id: Uuid::new_v4(),
            client_id: self.client_id,
            agency_id: self.agency_id,
            platform,
            external_account_id: "12345".to_string(),
            display_name: format!("Acme {platform}"),
            access_token_encrypted: cipher().encrypt("token").expect("encrypt"),
            refresh_token_encrypted: None,
            token_expires_at: Some(Utc::now() + chrono::Duration::days(30)),
            scopes: vec![],
            status,
            last_synced_at: None,
            error_message: None,
        };
        let id = connection.id;
        self.store.insert_connection(connection);
        id
    }

    fn status(&self, id: Uuid) -> ConnectionStatus {
        self.store.connection(id).expect("connection exists").status
    }

    fn error_message(&self, id: Uuid) -> Option<String> {
        self.store.connection(id).expect("connection exists").error_message
    }

    async fn run(&self, orchestrator: &Orchestrator) -> clientpulse_core::UnifiedReportData {
        orchestrator
            .fetch_all_platform_data(self.client_id, self.agency_id, january(), december())
            .await
    }
}

fn succeeding() -> Fetchers {
    let data = sample();
    Fetchers {
        ga4: StubFetcher::new(Platform::Ga4, Behavior::Succeed(data.ga4)),
        meta: StubFetcher::new(Platform::Meta, Behavior::Succeed(data.meta)),
        linkedin: StubFetcher::new(Platform::LinkedIn, Behavior::Succeed(data.linkedin)),
    }
}

// ---------------------------------------------------------------------------
// Partial failure and isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_failure_does_not_affect_the_other_platforms() {
    let client = Client::new();
    let ga4_id = client.connect(Platform::Ga4, ConnectionStatus::Connected);
    let meta_id = client.connect(Platform::Meta, ConnectionStatus::Connected);
    let linkedin_id = client.connect(Platform::LinkedIn, ConnectionStatus::Connected);

    let message = "Meta Ads access has expired or been revoked. Please reconnect Meta Ads.";
    let fetchers = Fetchers {
        meta: StubFetcher::<MetaMetrics>::new(Platform::Meta, Behavior::Fail(message.to_string())),
        ..succeeding()
    };
    let orchestrator = Orchestrator::new(client.store.clone(), fetchers);
    let report = client.run(&orchestrator).await;

    assert_eq!(report.client_name, "Acme Dental");
    assert!(report.ga4.is_some());
    assert!(report.linkedin.is_some());
    assert!(report.meta.is_none());
    assert_eq!(report.fetch_errors.len(), 1);
    assert_eq!(report.fetch_errors[0].platform, Platform::Meta);
    assert_eq!(report.fetch_errors[0].error, message);
    assert!(!report.is_total_failure());

    assert_eq!(client.status(ga4_id), ConnectionStatus::Connected);
    assert_eq!(client.status(linkedin_id), ConnectionStatus::Connected);
    assert_eq!(client.status(meta_id), ConnectionStatus::Error);
    assert_eq!(client.error_message(meta_id).as_deref(), Some(message));
    assert!(client.error_message(ga4_id).is_none());

    let ga4 = client.store.connection(ga4_id).expect("ga4 connection");
    assert!(ga4.last_synced_at.is_some());
}

#[tokio::test]
async fn success_clears_a_previous_error_message() {
    let client = Client::new();
    let ga4_id = client.connect(Platform::Ga4, ConnectionStatus::Connected);
    client.store.insert_connection(Connection {
        error_message: Some("old failure".to_string()),
        ..client.store.connection(ga4_id).expect("ga4 connection")
    });

    let orchestrator = Orchestrator::new(client.store.clone(), succeeding());
    let report = client.run(&orchestrator).await;

    assert!(report.ga4.is_some());
    assert!(client.error_message(ga4_id).is_none());
}

#[tokio::test]
async fn panicking_fetcher_is_recorded_as_a_failure() {
    let client = Client::new();
    let ga4_id = client.connect(Platform::Ga4, ConnectionStatus::Connected);
    let linkedin_id = client.connect(Platform::LinkedIn, ConnectionStatus::Connected);

    let fetchers = Fetchers {
        linkedin: StubFetcher::<LinkedInMetrics>::new(Platform::LinkedIn, Behavior::Panic),
        ..succeeding()
    };
    let orchestrator = Orchestrator::new(client.store.clone(), fetchers);
    let report = client.run(&orchestrator).await;

    assert!(report.ga4.is_some());
    assert!(report.linkedin.is_none());
    assert_eq!(report.fetch_errors.len(), 1);
    assert_eq!(report.fetch_errors[0].platform, Platform::LinkedIn);
    assert!(
        report.fetch_errors[0].error.contains("stub fetcher exploded"),
        "got: {}",
        report.fetch_errors[0].error
    );

    assert_eq!(client.status(ga4_id), ConnectionStatus::Connected);
    assert_eq!(client.status(linkedin_id), ConnectionStatus::Error);
}

#[tokio::test]
async fn every_platform_failing_is_a_total_failure() {
    let client = Client::new();
    for platform in Platform::ALL {
        client.connect(platform, ConnectionStatus::Connected);
    }

    let fetchers = Fetchers {
        ga4: StubFetcher::<Ga4Metrics>::new(Platform::Ga4, Behavior::Fail("ga4 down".to_string())),
        meta: StubFetcher::<MetaMetrics>::new(Platform::Meta, Behavior::Fail("meta down".to_string())),
        linkedin: StubFetcher::<LinkedInMetrics>::new(Platform::LinkedIn, Behavior::Panic),
    };
    let orchestrator = Orchestrator::new(client.store.clone(), fetchers);
    let report = client.run(&orchestrator).await;

    assert!(report.is_total_failure());
    assert!(report.succeeded_platforms().is_empty());

    let mut failed = report.failed_platforms();
    failed.sort_by_key(|p| p.as_str());
    assert_eq!(failed, vec![Platform::Ga4, Platform::LinkedIn, Platform::Meta]);
}

// ---------------------------------------------------------------------------
// Connection selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unconnected_platforms_are_skipped_without_errors() {
    let client = Client::new();
    client.connect(Platform::Ga4, ConnectionStatus::Connected);
    let meta_id = client.connect(Platform::Meta, ConnectionStatus::Expired);

    let data = sample();
    let meta = StubFetcher::new(Platform::Meta, Behavior::Succeed(data.meta));
    let linkedin = StubFetcher::new(Platform::LinkedIn, Behavior::Succeed(data.linkedin));
    let fetchers = Fetchers {
        ga4: StubFetcher::new(Platform::Ga4, Behavior::Succeed(data.ga4)),
        meta: meta.clone(),
        linkedin: linkedin.clone(),
    };
    let orchestrator = Orchestrator::new(client.store.clone(), fetchers);
    let report = client.run(&orchestrator).await;

    assert!(report.ga4.is_some());
    assert!(report.meta.is_none());
    assert!(report.linkedin.is_none());
    assert!(report.fetch_errors.is_empty());
    assert_eq!(meta.calls(), 0);
    assert_eq!(linkedin.calls(), 0);
    // Not attempted, so its stored health is left alone.
    assert_eq!(client.status(meta_id), ConnectionStatus::Expired);
}

#[tokio::test]
async fn client_without_connections_gets_an_empty_report() {
    let client = Client::new();
    let orchestrator = Orchestrator::new(client.store.clone(), succeeding());
    let report = client.run(&orchestrator).await;

    assert!(report.succeeded_platforms().is_empty());
    assert!(report.fetch_errors.is_empty());
    assert!(!report.is_total_failure());
    assert_eq!(report.period_start, january().start());
    assert_eq!(report.period_end, january().end());
}

#[tokio::test]
async fn client_lookup_failure_uses_placeholder_name() {
    let client = Client::new();
    client.connect(Platform::Ga4, ConnectionStatus::Connected);
    client.store.fail_client_lookups();

    let orchestrator = Orchestrator::new(client.store.clone(), succeeding());
    let report = client.run(&orchestrator).await;

    assert_eq!(report.client_name, UNKNOWN_CLIENT_NAME);
    assert!(report.ga4.is_some());
}

#[tokio::test]
async fn missing_client_record_uses_placeholder_name() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = Orchestrator::new(store, succeeding());
    let report = orchestrator
        .fetch_all_platform_data(Uuid::new_v4(), Uuid::new_v4(), january(), december())
        .await;
    assert_eq!(report.client_name, UNKNOWN_CLIENT_NAME);
}

// ---------------------------------------------------------------------------
// Mock mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mock_mode_bypasses_fetchers_and_is_deterministic() {
    let client = Client::new();
    let ga4 = StubFetcher::<Ga4Metrics>::new(Platform::Ga4, Behavior::Panic);
    let meta = StubFetcher::<MetaMetrics>::new(Platform::Meta, Behavior::Panic);
    let linkedin = StubFetcher::<LinkedInMetrics>::new(Platform::LinkedIn, Behavior::Panic);
    let fetchers = Fetchers {
        ga4: ga4.clone(),
        meta: meta.clone(),
        linkedin: linkedin.clone(),
    };
    let orchestrator = Orchestrator::new(client.store.clone(), fetchers).with_mock_mode(true);

    let first = client.run(&orchestrator).await;
    let second = client.run(&orchestrator).await;

    assert_eq!(ga4.calls() + meta.calls() + linkedin.calls(), 0);
    assert!(first.fetch_errors.is_empty());
    assert_eq!(
        first.succeeded_platforms(),
        vec![Platform::Ga4, Platform::Meta, Platform::LinkedIn]
    );
    assert_eq!(first.ga4, second.ga4);
    assert_eq!(first.meta, second.meta);
    assert_eq!(first.linkedin, second.linkedin);

    let expected = MockData::generate(client.client_id, &january());
    assert_eq!(first.ga4, Some(expected.ga4));
}

// ---------------------------------------------------------------------------
// End to end with real fetchers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn healthy_ga4_and_broken_meta_produce_a_partial_report() {
    let server = MockServer::start().await;
    // Every runReport call answers with an empty report, which is a valid
    // "no traffic" result.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
        .mount(&server)
        .await;
    // The Meta connection must fail before any network call.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;

    let client = Client::new();
    let ga4_id = client.connect(Platform::Ga4, ConnectionStatus::Connected);
    let meta_id = client.connect(Platform::Meta, ConnectionStatus::Connected);
    client.store.insert_connection(Connection {
        access_token_encrypted: "not-a-sealed-token".to_string(),
        token_expires_at: Some(Utc::now() - chrono::Duration::days(1)),
        ..client.store.connection(meta_id).expect("meta connection")
    });

    let http = build_http_client(5).expect("http client");
    let tokens = Arc::new(TokenProvider::new(
        client.store.clone(),
        cipher(),
        http.clone(),
        GoogleOAuthClient {
            client_id: Some("test-client".to_string()),
            client_secret: Some("test-secret".to_string()),
            token_url: format!("{}/token", server.uri()),
        },
    ));
    let settings = ApiSettings::new(&server.uri(), Duration::ZERO);
    let linkedin = StubFetcher::<LinkedInMetrics>::new(Platform::LinkedIn, Behavior::Panic);
    let fetchers = Fetchers {
        ga4: Arc::new(Ga4Fetcher::new(http.clone(), settings.clone(), tokens.clone())),
        meta: Arc::new(MetaFetcher::new(http, settings, tokens)),
        linkedin: linkedin.clone(),
    };
    let orchestrator = Orchestrator::new(client.store.clone(), fetchers);
    let report = client.run(&orchestrator).await;

    let ga4 = report.ga4.as_ref().expect("ga4 slot populated");
    assert_eq!(ga4.daily.len(), 31);
    assert!(ga4.summary.sessions.current.abs() < f64::EPSILON);
    assert!(report.meta.is_none());
    assert!(report.linkedin.is_none());
    assert_eq!(linkedin.calls(), 0);

    assert_eq!(report.fetch_errors.len(), 1);
    let error = &report.fetch_errors[0];
    assert_eq!(error.platform, Platform::Meta);
    assert!(error.error.contains("Meta Ads"), "got: {}", error.error);
    assert!(error.error.contains("reconnect"), "got: {}", error.error);

    assert_eq!(client.status(ga4_id), ConnectionStatus::Connected);
    assert_eq!(client.status(meta_id), ConnectionStatus::Error);
    assert!(client
        .error_message(meta_id)
        .is_some_and(|m| m.contains("reconnect")));
}
