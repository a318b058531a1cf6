//! Token handling and per-platform fetchers for GA4, Meta Ads, and LinkedIn Ads.
//!
//! Every fetcher borrows one shared [`reqwest::Client`] and a [`TokenProvider`];
//! build both once at startup with [`build_http_client`] and hand them in.

pub mod error;
pub mod fetcher;
pub mod ga4;
pub mod http;
pub mod linkedin;
pub mod meta;
pub(crate) mod rate_limit;
pub mod token;

pub use error::PlatformError;
pub use fetcher::PlatformFetcher;
pub use ga4::Ga4Fetcher;
pub use http::{build_http_client, ApiSettings};
pub use linkedin::LinkedInFetcher;
pub use meta::MetaFetcher;
pub use token::{GoogleOAuthClient, TokenProvider};
