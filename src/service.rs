// 🧭 Country service - refresh orchestration and read/delete operations
//
// Refresh: fetch both sources -> reconcile in one transaction -> capture
// snapshot -> hand it to the summary writer without waiting.

use crate::clients::ExternalClient;
use crate::config::Config;
use crate::db;
use crate::error::{CountryError, CountryResult};
use crate::models::{format_timestamp, normalize_name, Country, CountryFilter, CountryStats};
use crate::reconciliation::{RandomMultiplier, ReconciliationEngine, ReconciliationReport};
use crate::summary::{publish_summary, SummarySnapshot};
use anyhow::Context;
use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared handle. Cloning is cheap; all clones use the same connection.
#[derive(Clone)]
pub struct CountryService {
    db: Arc<Mutex<Connection>>,
    client: ExternalClient,
    engine: Arc<ReconciliationEngine>,
    summary_image_path: PathBuf,
    gdp_seed: Option<u64>,
}

impl CountryService {
    /// Wrap an open connection, creating the schema if needed.
    pub fn new(
        conn: Connection,
        client: ExternalClient,
        summary_image_path: impl Into<PathBuf>,
    ) -> rusqlite::Result<Self> {
        db::setup_database(&conn)?;

        Ok(CountryService {
            db: Arc::new(Mutex::new(conn)),
            client,
            engine: Arc::new(ReconciliationEngine::new()),
            summary_image_path: summary_image_path.into(),
            gdp_seed: None,
        })
    }

    /// Use a fixed seed for the GDP multiplier so passes are reproducible.
    pub fn with_gdp_seed(mut self, seed: Option<u64>) -> Self {
        self.gdp_seed = seed;
        self
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let conn = Connection::open(&config.database_path).with_context(|| {
            format!("Failed to open database at {}", config.database_path.display())
        })?;

        let client = ExternalClient::new(
            config.countries_url.clone(),
            config.rates_url.clone(),
            config.http_timeout,
        )
        .context("Failed to build HTTP client")?;

        let service = CountryService::new(conn, client, config.summary_image_path.clone())
            .context("Failed to initialize database schema")?
            .with_gdp_seed(config.gdp_seed);

        Ok(service)
    }

    pub fn summary_image_path(&self) -> &Path {
        &self.summary_image_path
    }

    // Every write path is transactional, so a poisoned lock still guards a
    // consistent connection.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn multiplier(&self) -> RandomMultiplier<ChaCha8Rng> {
        let rng = match self.gdp_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        RandomMultiplier::new(rng)
    }

    // ========================================================================
    // REFRESH
    // ========================================================================

    /// One refresh pass. Both sources must answer before anything is written.
    /// The summary image is written in the background after commit and its
    /// failure never reaches the caller.
    pub async fn refresh_countries(&self) -> CountryResult<ReconciliationReport> {
        let pass_id = Uuid::new_v4();
        info!(%pass_id, "refresh started");

        let (countries, rates) = self.client.fetch_all().await.map_err(|e| {
            warn!(%pass_id, error = %e, "refresh aborted before reconciliation");
            e
        })?;

        let (report, snapshot) = {
            let mut conn = self.conn();
            let mut multiplier = self.multiplier();
            let report = self
                .engine
                .reconcile(&mut conn, &countries, &rates, &mut multiplier, Utc::now())
                .map_err(|e| {
                    warn!(%pass_id, kind = e.kind().as_str(), error = %e, "refresh rolled back");
                    e
                })?;

            let snapshot = match SummarySnapshot::capture(&conn, report.refreshed_at) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(%pass_id, error = %e, "failed to capture summary snapshot");
                    None
                }
            };

            (report, snapshot)
        };

        if let Some(snapshot) = snapshot {
            publish_summary(snapshot, self.summary_image_path.clone());
        }

        info!(
            %pass_id,
            fetched = countries.len(),
            rates = rates.len(),
            inserted = report.inserted,
            updated = report.updated,
            "refresh finished"
        );

        Ok(report)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get_stats(&self) -> CountryResult<CountryStats> {
        let conn = self.conn();
        let total_countries = db::count_countries(&conn)?;
        let last_refreshed_at = db::max_last_refreshed(&conn)?
            .map(|ts| format_timestamp(&ts))
            .unwrap_or_default();

        Ok(CountryStats {
            total_countries,
            last_refreshed_at,
        })
    }

    pub fn get_country_by_name(&self, name: &str) -> CountryResult<Country> {
        db::find_country_by_name(&self.conn(), &normalize_name(name))?
            .ok_or_else(|| CountryError::NotFound(name.to_string()))
    }

    pub fn list_countries(&self, filter: &CountryFilter) -> CountryResult<Vec<Country>> {
        Ok(db::list_countries(&self.conn(), filter)?)
    }

    pub fn delete_country_by_name(&self, name: &str) -> CountryResult<()> {
        let removed = db::delete_country_by_name(&self.conn(), &normalize_name(name)).map_err(|e| {
            error!(country = name, error = %e, "delete failed");
            e
        })?;

        if removed == 0 {
            return Err(CountryError::NotFound(name.to_string()));
        }

        info!(country = name, "country deleted");
        Ok(())
    }
}
