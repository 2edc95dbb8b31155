// 🌍 Country data model
// Wire shapes from the two external sources, the persisted row,
// and the small value types the query layer passes around.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

// ============================================================================
// EXTERNAL SHAPES
// ============================================================================

/// Currency descriptor as reported by the country source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCurrency {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbol: String,
}

/// One entry of the country source snapshot.
///
/// Only the `name` key is mandatory on the wire; the rest default to empty
/// because the source omits them for some territories. An explicit `null`
/// reads as empty everywhere, so blank values reach validation instead of
/// failing the whole snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCountry {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub capital: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub region: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub population: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub currencies: Vec<RawCurrency>,

    #[serde(default, rename = "flag", deserialize_with = "null_as_default")]
    pub flag_url: String,
}

impl RawCountry {
    /// Code of the first declared currency, if any currency is declared.
    pub fn primary_currency(&self) -> Option<&str> {
        self.currencies.first().map(|c| c.code.as_str())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Rate source payload: `{ "rates": { "EUR": 0.92, ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesPayload {
    pub rates: HashMap<String, f64>,
}

/// Currency code → rate against the fixed base currency (USD).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new(rates: HashMap<String, f64>) -> Self {
        RateTable { rates }
    }

    /// Usable rate for `code`. Missing, non-positive and non-finite rates
    /// all mean "unknown".
    pub fn resolve(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl From<RatesPayload> for RateTable {
    fn from(payload: RatesPayload) -> Self {
        RateTable::new(payload.rates)
    }
}

impl FromIterator<(String, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        RateTable::new(iter.into_iter().collect())
    }
}

// ============================================================================
// PERSISTED ROW
// ============================================================================

/// Entity of record: one row per distinct lowercase country name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: String,
    pub region: String,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: String,
    pub last_refreshed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Candidate values computed for one country during a refresh pass.
/// Written as-is on insert, or over the existing row on update.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRecord {
    pub name: String,
    pub capital: String,
    pub region: String,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: String,
    pub refreshed_at: DateTime<Utc>,
}

impl CountryRecord {
    pub fn name_key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Lowercase form used as the uniqueness key.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

// ============================================================================
// QUERY TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NameAsc,
    GdpDesc,
    GdpAsc,
}

impl SortOrder {
    /// Parse the wire selector. Unknown or missing values fall back to
    /// name-ascending.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("gdp_desc") => SortOrder::GdpDesc,
            Some("gdp_asc") => SortOrder::GdpAsc,
            _ => SortOrder::NameAsc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::NameAsc => "name_asc",
            SortOrder::GdpDesc => "gdp_desc",
            SortOrder::GdpAsc => "gdp_asc",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryFilter {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: SortOrder,
}

impl CountryFilter {
    /// Blank filter values are treated as absent.
    pub fn new(region: Option<String>, currency: Option<String>, sort: SortOrder) -> Self {
        let clean = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        CountryFilter {
            region: clean(region),
            currency: clean(currency),
            sort,
        }
    }
}

/// Aggregate stats exposed to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryStats {
    pub total_countries: i64,
    /// ISO-8601, or empty when the dataset is empty.
    pub last_refreshed_at: String,
}

// ============================================================================
// TIMESTAMP FORMATS
// ============================================================================

/// Reader-facing ISO-8601 form, second precision, `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Storage form. Fixed width so lexical order equals chronological order.
pub(crate) fn storage_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
