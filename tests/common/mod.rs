//! Shared fixtures: wiremock stand-ins for both external sources and a
//! service wired to an in-memory database.

#![allow(dead_code)]

use country_ledger::{CountryService, ExternalClient};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const COUNTRIES_PATH: &str = "/v2/all";
pub const RATES_PATH: &str = "/v6/latest/USD";

pub fn country_json(name: &str, population: i64, codes: &[&str]) -> Value {
    let currencies: Vec<Value> = codes
        .iter()
        .map(|code| json!({ "code": code, "name": format!("{} money", code), "symbol": "¤" }))
        .collect();

    json!({
        "name": name,
        "capital": format!("{} City", name),
        "region": "Africa",
        "population": population,
        "currencies": currencies,
        "flag": format!("https://flagcdn.com/{}.svg", name.to_lowercase()),
        "independent": true
    })
}

pub fn rates_json(pairs: &[(&str, f64)]) -> Value {
    let rates: serde_json::Map<String, Value> = pairs
        .iter()
        .map(|(code, rate)| (code.to_string(), json!(rate)))
        .collect();
    json!({ "result": "success", "base_code": "USD", "rates": rates })
}

pub async fn mount_countries(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(COUNTRIES_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_rates(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(RATES_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub fn client_for(server: &MockServer) -> ExternalClient {
    ExternalClient::new(
        format!("{}{}", server.uri(), COUNTRIES_PATH),
        format!("{}{}", server.uri(), RATES_PATH),
        Duration::from_secs(5),
    )
    .unwrap()
}

/// Service on an in-memory database, summary image under a temp dir.
/// Keep the returned `TempDir` alive for the duration of the test.
pub fn create_test_service(server: &MockServer) -> (CountryService, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let service = CountryService::new(conn, client_for(server), dir.path().join("summary.svg"))
        .unwrap()
        .with_gdp_seed(Some(42));
    (service, dir)
}
