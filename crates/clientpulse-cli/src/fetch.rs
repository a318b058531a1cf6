//! The `fetch` command: wires the store, token provider, and fetchers into an
//! orchestrator and prints one client's unified report.

use std::sync::Arc;

use clientpulse_core::{AppConfig, Platform, TokenCipher};
use clientpulse_db::{ConnectionStore, PgStore};
use clientpulse_platforms::{
    build_http_client, ApiSettings, Ga4Fetcher, GoogleOAuthClient, LinkedInFetcher, MetaFetcher,
    TokenProvider,
};
use clientpulse_report::{Fetchers, Orchestrator};
use uuid::Uuid;

use crate::period;
use crate::PeriodArgs;

/// Builds the production orchestrator from configuration.
///
/// # Errors
///
/// Returns an error if the encryption key is invalid or the HTTP client
/// cannot be constructed.
pub(crate) fn build_orchestrator(
    config: &AppConfig,
    store: Arc<dyn ConnectionStore>,
) -> anyhow::Result<Orchestrator> {
    let cipher = TokenCipher::from_base64_key(&config.encryption_key)?;
    let http = build_http_client(config.request_timeout_secs)?;
    let tokens = Arc::new(TokenProvider::new(
        Arc::clone(&store),
        cipher,
        http.clone(),
        GoogleOAuthClient::from_app_config(config),
    ));

    let fetchers = Fetchers {
        ga4: Arc::new(Ga4Fetcher::new(
            http.clone(),
            ApiSettings::from_app_config(config, Platform::Ga4),
            Arc::clone(&tokens),
        )),
        meta: Arc::new(MetaFetcher::new(
            http.clone(),
            ApiSettings::from_app_config(config, Platform::Meta),
            Arc::clone(&tokens),
        )),
        linkedin: Arc::new(LinkedInFetcher::new(
            http,
            ApiSettings::from_app_config(config, Platform::LinkedIn),
            tokens,
        )),
    };

    Ok(Orchestrator::new(store, fetchers).with_mock_mode(config.use_mock_data))
}

/// Runs the orchestrator for one client and prints the report as JSON.
///
/// # Errors
///
/// Returns an error if the period is invalid, the database is unreachable,
/// or every connected platform failed. The report is printed before a total
/// failure is reported.
pub(crate) async fn run_fetch(
    config: &AppConfig,
    client_id: Uuid,
    agency_id: Uuid,
    period_args: &PeriodArgs,
    force_mock: bool,
) -> anyhow::Result<()> {
    let (current, previous) = period::resolve(period_args)?;

    let pool_config = clientpulse_db::PoolConfig::from_app_config(config);
    let pool = clientpulse_db::connect_pool(&config.database_url, pool_config).await?;
    let store: Arc<dyn ConnectionStore> = Arc::new(PgStore::new(pool));

    let mut orchestrator = build_orchestrator(config, store)?;
    if force_mock {
        orchestrator = orchestrator.with_mock_mode(true);
    }

    let report = orchestrator
        .fetch_all_platform_data(client_id, agency_id, current, previous)
        .await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_total_failure() {
        anyhow::bail!(
            "every connected platform failed for client {client_id} ({} errors)",
            report.fetch_errors.len()
        );
    }
    Ok(())
}
