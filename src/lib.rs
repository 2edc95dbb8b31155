// Country Ledger - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reconciliation;
pub mod service;
pub mod summary;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use clients::ExternalClient;
pub use config::Config;
pub use db::{
    count_countries, delete_country_by_name, find_country_by_name, insert_country,
    list_countries, max_last_refreshed, setup_database, top_countries_by_gdp, update_country,
};
pub use error::{CountryError, CountryResult, ErrorKind};
pub use models::{
    normalize_name, Country, CountryFilter, CountryRecord, CountryStats, RateTable, RawCountry,
    RawCurrency, SortOrder,
};
pub use reconciliation::{
    FixedMultiplier, GdpMultiplier, RandomMultiplier, ReconciliationEngine, ReconciliationReport,
};
pub use service::CountryService;
pub use summary::SummarySnapshot;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `tracing` filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,country_ledger=debug";

/// Install the fmt subscriber used by both binaries.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    // A second install (tests, embedding) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
