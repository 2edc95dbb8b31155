//! End-to-end refresh passes through `CountryService`.

mod common;

use common::*;
use country_ledger::{CountryError, CountryFilter, ErrorKind, SortOrder};
use serde_json::json;
use std::time::Duration;
use wiremock::MockServer;

#[tokio::test]
async fn test_refresh_inserts_then_updates() {
    let server = MockServer::start().await;
    mount_countries(
        &server,
        200,
        json!([
            country_json("Nigeria", 206_139_587, &["NGN"]),
            country_json("Ghana", 31_072_940, &["GHS"]),
            country_json("Antarctica", 1_000, &[]),
            country_json("Lostland", 500, &["LST"])
        ]),
    )
    .await;
    mount_rates(&server, 200, rates_json(&[("NGN", 1600.23), ("GHS", 15.5)])).await;
    let (service, _dir) = create_test_service(&server);

    let first = service.refresh_countries().await.unwrap();
    assert_eq!(first.inserted, 4);
    assert_eq!(first.updated, 0);

    let nigeria_1 = service.get_country_by_name("NIGERIA").unwrap();
    let second = service.refresh_countries().await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 4);
    let nigeria_2 = service.get_country_by_name("nigeria").unwrap();

    // Seeded multiplier: identical derived values across passes
    assert_eq!(nigeria_1.id, nigeria_2.id);
    assert_eq!(nigeria_1.estimated_gdp, nigeria_2.estimated_gdp);
    assert_eq!(nigeria_1.created_at, nigeria_2.created_at);
    assert!(nigeria_2.last_refreshed_at > nigeria_1.last_refreshed_at);

    let antarctica = service.get_country_by_name("Antarctica").unwrap();
    assert_eq!(antarctica.estimated_gdp, Some(0.0));
    assert_eq!(antarctica.currency_code, None);

    let lostland = service.get_country_by_name("lostland").unwrap();
    assert_eq!(lostland.currency_code.as_deref(), Some("LST"));
    assert_eq!(lostland.exchange_rate, None);
    assert_eq!(lostland.estimated_gdp, None);

    assert_eq!(service.get_stats().unwrap().total_countries, 4);
}

#[tokio::test]
async fn test_fetch_failure_writes_nothing() {
    let server = MockServer::start().await;
    mount_countries(&server, 200, json!([country_json("Ghana", 31_000_000, &["GHS"])])).await;
    mount_rates(&server, 502, json!({})).await;
    let (service, _dir) = create_test_service(&server);

    let err = service.refresh_countries().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FetchFailure);
    assert_eq!(service.get_stats().unwrap().total_countries, 0);
}

#[tokio::test]
async fn test_validation_failure_writes_nothing() {
    let server = MockServer::start().await;
    mount_countries(
        &server,
        200,
        json!([
            country_json("Ghana", 31_000_000, &["GHS"]),
            country_json("Wakanda", -5, &[])
        ]),
    )
    .await;
    mount_rates(&server, 200, rates_json(&[("GHS", 15.0)])).await;
    let (service, _dir) = create_test_service(&server);

    match service.refresh_countries().await {
        Err(CountryError::Validation { country, details }) => {
            assert_eq!(country, "Wakanda");
            assert_eq!(details["population"], "must be non-negative");
        }
        other => panic!("expected validation failure, got {:?}", other),
    }

    let stats = service.get_stats().unwrap();
    assert_eq!(stats.total_countries, 0);
    assert_eq!(stats.last_refreshed_at, "");
}

#[tokio::test]
async fn test_null_currency_code_is_validation_failure() {
    let server = MockServer::start().await;
    mount_countries(
        &server,
        200,
        json!([
            country_json("Ghana", 31_000_000, &["GHS"]),
            {
                "name": "Nullcoin",
                "capital": null,
                "region": "Oceania",
                "population": 900,
                "currencies": [{ "code": null, "name": "Shell", "symbol": null }],
                "flag": null
            }
        ]),
    )
    .await;
    mount_rates(&server, 200, rates_json(&[("GHS", 15.0)])).await;
    let (service, _dir) = create_test_service(&server);

    let err = service.refresh_countries().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    match err {
        CountryError::Validation { country, details } => {
            assert_eq!(country, "Nullcoin");
            assert_eq!(details["currency_code"], "is required");
            assert!(!details.contains_key("capital"));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert_eq!(service.get_stats().unwrap().total_countries, 0);
}

#[tokio::test]
async fn test_null_capital_is_stored_as_empty() {
    let server = MockServer::start().await;
    mount_countries(
        &server,
        200,
        json!([{
            "name": "Openland",
            "capital": null,
            "region": "Europe",
            "population": 10,
            "currencies": [{ "code": "EUR", "name": "Euro", "symbol": null }],
            "flag": "https://flagcdn.com/ol.svg"
        }]),
    )
    .await;
    mount_rates(&server, 200, rates_json(&[("EUR", 0.5)])).await;
    let (service, _dir) = create_test_service(&server);

    let report = service.refresh_countries().await.unwrap();
    assert_eq!(report.inserted, 1);

    let openland = service.get_country_by_name("openland").unwrap();
    assert_eq!(openland.capital, "");
    assert_eq!(openland.currency_code.as_deref(), Some("EUR"));
}

#[tokio::test]
async fn test_refresh_writes_summary_image() {
    let server = MockServer::start().await;
    mount_countries(
        &server,
        200,
        json!([
            country_json("Nigeria", 206_139_587, &["NGN"]),
            country_json("Ghana", 31_072_940, &["GHS"])
        ]),
    )
    .await;
    mount_rates(&server, 200, rates_json(&[("NGN", 1600.0), ("GHS", 15.0)])).await;
    let (service, _dir) = create_test_service(&server);

    service.refresh_countries().await.unwrap();

    // Written in the background; poll briefly
    let path = service.summary_image_path().to_path_buf();
    let mut contents = None;
    for _ in 0..50 {
        if let Ok(text) = std::fs::read_to_string(&path) {
            if text.contains("</svg>") {
                contents = Some(text);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let svg = contents.expect("summary image should be written after refresh");
    assert!(svg.contains("Total Countries: 2"));
    assert!(svg.contains("Nigeria"));
}

#[tokio::test]
async fn test_unwritable_summary_path_does_not_fail_refresh() {
    let server = MockServer::start().await;
    mount_countries(&server, 200, json!([country_json("Ghana", 31_000_000, &["GHS"])])).await;
    mount_rates(&server, 200, rates_json(&[("GHS", 15.0)])).await;

    let dir = tempfile::tempdir().unwrap();
    // A regular file where the parent directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a dir").unwrap();
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let service = country_ledger::CountryService::new(conn, client_for(&server), blocker.join("summary.svg"))
        .unwrap();

    let report = service.refresh_countries().await.unwrap();
    assert_eq!(report.inserted, 1);
}

#[tokio::test]
async fn test_queries_after_refresh() {
    let server = MockServer::start().await;
    mount_countries(
        &server,
        200,
        json!([
            country_json("Nigeria", 206_139_587, &["NGN"]),
            country_json("Benin", 12_000_000, &["XOF"]),
            country_json("Togo", 8_000_000, &["XOF"])
        ]),
    )
    .await;
    mount_rates(&server, 200, rates_json(&[("NGN", 1600.0), ("XOF", 600.0)])).await;
    let (service, _dir) = create_test_service(&server);
    service.refresh_countries().await.unwrap();

    let xof = service
        .list_countries(&CountryFilter::new(None, Some("XOF".to_string()), SortOrder::NameAsc))
        .unwrap();
    let names: Vec<&str> = xof.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Benin", "Togo"]);

    let by_gdp = service
        .list_countries(&CountryFilter::new(None, None, SortOrder::GdpDesc))
        .unwrap();
    for pair in by_gdp.windows(2) {
        assert!(pair[0].estimated_gdp >= pair[1].estimated_gdp);
    }

    service.delete_country_by_name("BENIN").unwrap();
    assert_eq!(
        service.get_country_by_name("benin").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        service.delete_country_by_name("benin").unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let stats = service.get_stats().unwrap();
    assert_eq!(stats.total_countries, 2);
    assert!(stats.last_refreshed_at.ends_with('Z'));
}
