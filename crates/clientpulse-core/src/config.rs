use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_GA4_API_BASE_URL: &str = "https://analyticsdata.googleapis.com";
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_META_API_BASE_URL: &str = "https://graph.facebook.com/v21.0";
pub const DEFAULT_LINKEDIN_API_BASE_URL: &str = "https://api.linkedin.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so tests can
/// use a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let encryption_key = require("CLIENTPULSE_ENCRYPTION_KEY")?;

    let env = parse_environment(&or_default("CLIENTPULSE_ENV", "development"))?;
    let log_level = or_default("CLIENTPULSE_LOG_LEVEL", "info");
    let use_mock_data = parse_bool(
        "CLIENTPULSE_USE_MOCK_DATA",
        &or_default("CLIENTPULSE_USE_MOCK_DATA", "false"),
    )?;

    let google_client_id = lookup("GOOGLE_CLIENT_ID").ok();
    let google_client_secret = lookup("GOOGLE_CLIENT_SECRET").ok();

    let db_max_connections = parse_u32("CLIENTPULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CLIENTPULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CLIENTPULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let request_timeout_secs = parse_u64("CLIENTPULSE_REQUEST_TIMEOUT_SECS", "30")?;
    let ga4_rate_limit_cooldown_secs = parse_u64("CLIENTPULSE_GA4_RATE_LIMIT_COOLDOWN_SECS", "2")?;
    let meta_rate_limit_cooldown_secs =
        parse_u64("CLIENTPULSE_META_RATE_LIMIT_COOLDOWN_SECS", "60")?;
    let linkedin_rate_limit_cooldown_secs =
        parse_u64("CLIENTPULSE_LINKEDIN_RATE_LIMIT_COOLDOWN_SECS", "30")?;

    let ga4_api_base_url = or_default("CLIENTPULSE_GA4_API_BASE_URL", DEFAULT_GA4_API_BASE_URL);
    let google_token_url = or_default("CLIENTPULSE_GOOGLE_TOKEN_URL", DEFAULT_GOOGLE_TOKEN_URL);
    let meta_api_base_url = or_default("CLIENTPULSE_META_API_BASE_URL", DEFAULT_META_API_BASE_URL);
    let linkedin_api_base_url = or_default(
        "CLIENTPULSE_LINKEDIN_API_BASE_URL",
        DEFAULT_LINKEDIN_API_BASE_URL,
    );

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        encryption_key,
        use_mock_data,
        google_client_id,
        google_client_secret,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        request_timeout_secs,
        ga4_rate_limit_cooldown_secs,
        meta_rate_limit_cooldown_secs,
        linkedin_rate_limit_cooldown_secs,
        ga4_api_base_url,
        google_token_url,
        meta_api_base_url,
        linkedin_api_base_url,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CLIENTPULSE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected true or false, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
