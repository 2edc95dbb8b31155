// 🗄️ Persistence Store - SQLite
// One row per distinct lowercase country name. Every function takes a
// `&Connection`, so the same calls work on a plain connection or inside a
// `rusqlite::Transaction` (which derefs to `Connection`).

use crate::models::{storage_timestamp, Country, CountryFilter, CountryRecord, SortOrder};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COUNTRY_COLUMNS: &str = "id, name, capital, region, population, currency_code,
    exchange_rate, estimated_gdp, flag_url, last_refreshed_at, created_at";

pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    // WAL for file-backed databases; in-memory ones report "memory" and carry on
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS countries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL UNIQUE,
            capital TEXT NOT NULL DEFAULT '',
            region TEXT NOT NULL DEFAULT '',
            population INTEGER NOT NULL,
            currency_code TEXT,
            exchange_rate REAL,
            estimated_gdp REAL,
            flag_url TEXT NOT NULL DEFAULT '',
            last_refreshed_at TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_countries_region ON countries(region)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_countries_currency ON countries(currency_code)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_countries_gdp ON countries(estimated_gdp)",
        [],
    )?;

    Ok(())
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn country_from_row(row: &Row<'_>) -> rusqlite::Result<Country> {
    let last_refreshed: String = row.get(9)?;
    let created: String = row.get(10)?;

    Ok(Country {
        id: row.get(0)?,
        name: row.get(1)?,
        capital: row.get(2)?,
        region: row.get(3)?,
        population: row.get(4)?,
        currency_code: row.get(5)?,
        exchange_rate: row.get(6)?,
        estimated_gdp: row.get(7)?,
        flag_url: row.get(8)?,
        last_refreshed_at: parse_timestamp(9, &last_refreshed)?,
        created_at: parse_timestamp(10, &created)?,
    })
}

/// Insert a new country. `created_at` and `last_refreshed_at` both take the
/// record's refresh time. Returns the new row id.
pub fn insert_country(conn: &Connection, record: &CountryRecord) -> rusqlite::Result<i64> {
    let ts = storage_timestamp(&record.refreshed_at);

    conn.execute(
        "INSERT INTO countries (
            name, name_key, capital, region, population,
            currency_code, exchange_rate, estimated_gdp, flag_url,
            last_refreshed_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            record.name,
            record.name_key(),
            record.capital,
            record.region,
            record.population,
            record.currency_code,
            record.exchange_rate,
            record.estimated_gdp,
            record.flag_url,
            ts,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Overwrite every mutable column of row `id`. Null derived values are
/// written as null. `created_at` is left alone.
pub fn update_country(conn: &Connection, id: i64, record: &CountryRecord) -> rusqlite::Result<()> {
    let affected = conn.execute(
        "UPDATE countries
         SET name = ?1,
             name_key = ?2,
             capital = ?3,
             region = ?4,
             population = ?5,
             currency_code = ?6,
             exchange_rate = ?7,
             estimated_gdp = ?8,
             flag_url = ?9,
             last_refreshed_at = ?10
         WHERE id = ?11",
        params![
            record.name,
            record.name_key(),
            record.capital,
            record.region,
            record.population,
            record.currency_code,
            record.exchange_rate,
            record.estimated_gdp,
            record.flag_url,
            storage_timestamp(&record.refreshed_at),
            id,
        ],
    )?;

    if affected == 0 {
        return Err(rusqlite::Error::QueryReturnedNoRows);
    }

    Ok(())
}

/// Look up by normalized (lowercase) name.
pub fn find_country_by_name(conn: &Connection, name_key: &str) -> rusqlite::Result<Option<Country>> {
    conn.query_row(
        &format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE name_key = ?1"),
        [name_key],
        country_from_row,
    )
    .optional()
}

/// Delete by normalized name. Returns the number of rows removed (0 or 1).
pub fn delete_country_by_name(conn: &Connection, name_key: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM countries WHERE name_key = ?1", [name_key])
}

pub fn count_countries(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM countries", [], |row| row.get(0))
}

/// Latest `last_refreshed_at` across all rows, `None` when empty.
pub fn max_last_refreshed(conn: &Connection) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let latest: Option<String> =
        conn.query_row("SELECT MAX(last_refreshed_at) FROM countries", [], |row| row.get(0))?;

    latest.map(|ts| parse_timestamp(0, &ts)).transpose()
}

/// Top `limit` rows by estimated GDP, nulls excluded, ties in insertion order.
pub fn top_countries_by_gdp(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<Country>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COUNTRY_COLUMNS}
         FROM countries
         WHERE estimated_gdp IS NOT NULL
         ORDER BY estimated_gdp DESC, id ASC
         LIMIT ?1"
    ))?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let countries = stmt
        .query_map([limit], country_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(countries)
}

/// Filtered, sorted listing. Region and currency match case-insensitively.
/// Null GDP rows sort last under both GDP orders.
pub fn list_countries(conn: &Connection, filter: &CountryFilter) -> rusqlite::Result<Vec<Country>> {
    let order_by = match filter.sort {
        SortOrder::NameAsc => "name COLLATE NOCASE ASC, id ASC",
        SortOrder::GdpDesc => "estimated_gdp IS NULL, estimated_gdp DESC, id ASC",
        SortOrder::GdpAsc => "estimated_gdp IS NULL, estimated_gdp ASC, id ASC",
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {COUNTRY_COLUMNS}
         FROM countries
         WHERE (?1 IS NULL OR region = ?1 COLLATE NOCASE)
           AND (?2 IS NULL OR currency_code = ?2 COLLATE NOCASE)
         ORDER BY {order_by}"
    ))?;

    let countries = stmt
        .query_map(
            params![filter.region.as_deref(), filter.currency.as_deref()],
            country_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(countries)
}
