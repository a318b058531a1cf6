#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    /// Base64 AES-256 key for the token cipher.
    pub encryption_key: String,
    /// Serve seeded fake data instead of calling any platform.
    pub use_mock_data: bool,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub ga4_rate_limit_cooldown_secs: u64,
    pub meta_rate_limit_cooldown_secs: u64,
    pub linkedin_rate_limit_cooldown_secs: u64,
    pub ga4_api_base_url: String,
    pub google_token_url: String,
    pub meta_api_base_url: String,
    pub linkedin_api_base_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("encryption_key", &"[redacted]")
            .field("use_mock_data", &self.use_mock_data)
            .field("google_client_id", &self.google_client_id)
            .field(
                "google_client_secret",
                &self.google_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "ga4_rate_limit_cooldown_secs",
                &self.ga4_rate_limit_cooldown_secs,
            )
            .field(
                "meta_rate_limit_cooldown_secs",
                &self.meta_rate_limit_cooldown_secs,
            )
            .field(
                "linkedin_rate_limit_cooldown_secs",
                &self.linkedin_rate_limit_cooldown_secs,
            )
            .field("ga4_api_base_url", &self.ga4_api_base_url)
            .field("google_token_url", &self.google_token_url)
            .field("meta_api_base_url", &self.meta_api_base_url)
            .field("linkedin_api_base_url", &self.linkedin_api_base_url)
            .finish()
    }
}
