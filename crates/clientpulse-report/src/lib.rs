//! Report assembly: fans out to every connected platform for one client and
//! folds the outcomes into a [`clientpulse_core::UnifiedReportData`].

pub mod mock;
pub mod orchestrator;

pub use mock::MockData;
pub use orchestrator::{
    Fetchers, Ga4Source, LinkedInSource, MetaSource, Orchestrator, UNKNOWN_CLIENT_NAME,
};
