// 🌐 External sources - country list + exchange rates over HTTP
//
// Both calls are plain GETs with a request deadline. Anything short of a
// 200 with a decodable body surfaces as a fetch failure.

use crate::error::{CountryError, CountryResult};
use crate::models::{RateTable, RatesPayload, RawCountry};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

pub const COUNTRY_SOURCE: &str = "country list";
pub const RATE_SOURCE: &str = "exchange rates";

#[derive(Debug, Clone)]
pub struct ExternalClient {
    http: Client,
    countries_url: String,
    rates_url: String,
}

impl ExternalClient {
    pub fn new(
        countries_url: impl Into<String>,
        rates_url: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("country-ledger/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ExternalClient {
            http,
            countries_url: countries_url.into(),
            rates_url: rates_url.into(),
        })
    }

    pub async fn fetch_countries(&self) -> CountryResult<Vec<RawCountry>> {
        let countries: Vec<RawCountry> = self.get_json(COUNTRY_SOURCE, &self.countries_url).await?;
        debug!(count = countries.len(), "fetched country list");
        Ok(countries)
    }

    pub async fn fetch_rates(&self) -> CountryResult<RateTable> {
        let payload: RatesPayload = self.get_json(RATE_SOURCE, &self.rates_url).await?;
        let table = RateTable::from(payload);
        debug!(count = table.len(), "fetched exchange rates");
        Ok(table)
    }

    /// Fetch both snapshots concurrently. Either failure wins.
    pub async fn fetch_all(&self) -> CountryResult<(Vec<RawCountry>, RateTable)> {
        tokio::try_join!(self.fetch_countries(), self.fetch_rates())
    }

    async fn get_json<T: DeserializeOwned>(&self, source: &'static str, url: &str) -> CountryResult<T> {
        let response = self.http.get(url).send().await.map_err(|e| {
            warn!(source, error = %e, "request failed");
            CountryError::fetch(source, e.to_string())
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(source, status = status.as_u16(), "unexpected status");
            return Err(CountryError::fetch(
                source,
                format!("unexpected status code: {}", status.as_u16()),
            ));
        }

        response.json::<T>().await.map_err(|e| {
            warn!(source, error = %e, "failed to decode response body");
            CountryError::fetch(source, format!("failed to decode response body: {}", e))
        })
    }
}
