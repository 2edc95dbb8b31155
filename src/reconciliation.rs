// ⚖️ Reconciliation Engine - join countries with rates, upsert in one transaction
//
// For every raw country:
//   no row for its lowercase name -> validate, then insert
//   row exists                     -> overwrite derived fields, no validation
//
// Any validation or storage failure rolls back the whole batch.

use crate::db;
use crate::error::{CountryError, CountryResult};
use crate::models::{normalize_name, CountryRecord, RateTable, RawCountry};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

/// Inclusive range the GDP multiplier is drawn from.
pub const GDP_FACTOR_RANGE: RangeInclusive<u32> = 1000..=2000;

// ============================================================================
// GDP MULTIPLIER
// ============================================================================

/// Source of the per-country scaling factor in
/// `estimated_gdp = population * factor / rate`.
///
/// Passed explicitly into each pass so callers decide between a fresh random
/// draw, a seeded sequence, or a fixed value.
pub trait GdpMultiplier {
    fn next_factor(&mut self) -> u32;
}

/// Uniform draw from [`GDP_FACTOR_RANGE`] per call.
pub struct RandomMultiplier<R> {
    rng: R,
}

impl<R: Rng> RandomMultiplier<R> {
    pub fn new(rng: R) -> Self {
        RandomMultiplier { rng }
    }
}

impl<R: Rng> GdpMultiplier for RandomMultiplier<R> {
    fn next_factor(&mut self) -> u32 {
        self.rng.gen_range(GDP_FACTOR_RANGE)
    }
}

/// Same factor for every country.
#[derive(Debug, Clone, Copy)]
pub struct FixedMultiplier(pub u32);

impl GdpMultiplier for FixedMultiplier {
    fn next_factor(&mut self) -> u32 {
        self.0
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub inserted: usize,
    pub updated: usize,
    pub refreshed_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

#[derive(Debug, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Compute the candidate record for one raw country.
    ///
    /// - no currencies: code and rate absent, GDP exactly 0
    /// - first currency has a usable rate: GDP = population * factor / rate
    /// - otherwise: rate and GDP absent
    pub fn derive(
        &self,
        raw: &RawCountry,
        rates: &RateTable,
        multiplier: &mut dyn GdpMultiplier,
        refreshed_at: DateTime<Utc>,
    ) -> CountryRecord {
        let (currency_code, exchange_rate, estimated_gdp) = match raw.primary_currency() {
            None => (None, None, Some(0.0)),
            Some(code) => match rates.resolve(code) {
                Some(rate) => {
                    let factor = multiplier.next_factor();
                    let gdp = raw.population as f64 * f64::from(factor) / rate;
                    (Some(code.to_string()), Some(rate), Some(gdp))
                }
                None => (Some(code.to_string()), None, None),
            },
        };

        CountryRecord {
            name: raw.name.clone(),
            capital: raw.capital.clone(),
            region: raw.region.clone(),
            population: raw.population,
            currency_code,
            exchange_rate,
            estimated_gdp,
            flag_url: raw.flag_url.clone(),
            refreshed_at,
        }
    }

    /// Insert-path checks. Returns every failing field at once.
    pub fn validate_new(&self, raw: &RawCountry, record: &CountryRecord) -> CountryResult<()> {
        let mut details = BTreeMap::new();

        if raw.name.trim().is_empty() {
            details.insert("name".to_string(), "is required".to_string());
        }

        if raw.population < 0 {
            details.insert("population".to_string(), "must be non-negative".to_string());
        }

        let declared_currency = !raw.currencies.is_empty();
        let code_blank = record
            .currency_code
            .as_deref()
            .map_or(true, |code| code.trim().is_empty());
        if declared_currency && code_blank {
            details.insert("currency_code".to_string(), "is required".to_string());
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(CountryError::Validation {
                country: raw.name.clone(),
                details,
            })
        }
    }

    /// Run one refresh pass over `countries` inside a single transaction.
    ///
    /// `requested_at` is raised to just past the latest stored refresh time
    /// when needed, so `last_refreshed_at` strictly advances even if the
    /// clock steps back. The report carries the timestamp actually written.
    ///
    /// On any error the transaction is dropped without commit, which rolls
    /// back every insert and update made so far in this pass.
    pub fn reconcile(
        &self,
        conn: &mut Connection,
        countries: &[RawCountry],
        rates: &RateTable,
        multiplier: &mut dyn GdpMultiplier,
        requested_at: DateTime<Utc>,
    ) -> CountryResult<ReconciliationReport> {
        let tx = conn.transaction()?;

        // Stored timestamps keep microseconds, so the floor is one tick past
        // the latest row.
        let refreshed_at = match db::max_last_refreshed(&tx)? {
            Some(previous) if requested_at < previous + Duration::microseconds(1) => {
                warn!(%requested_at, %previous, "clock behind last refresh, advancing timestamp");
                previous + Duration::microseconds(1)
            }
            _ => requested_at,
        };

        let mut inserted = 0;
        let mut updated = 0;

        for raw in countries {
            let name_key = normalize_name(&raw.name);
            let record = self.derive(raw, rates, multiplier, refreshed_at);

            match db::find_country_by_name(&tx, &name_key)? {
                Some(existing) => {
                    db::update_country(&tx, existing.id, &record)?;
                    updated += 1;
                    debug!(country = %raw.name, id = existing.id, "updated");
                }
                None => {
                    self.validate_new(raw, &record)?;
                    let id = db::insert_country(&tx, &record)?;
                    inserted += 1;
                    debug!(country = %raw.name, id, "inserted");
                }
            }
        }

        tx.commit()?;

        info!(inserted, updated, "reconciliation committed");

        Ok(ReconciliationReport {
            inserted,
            updated,
            refreshed_at,
        })
    }
}
