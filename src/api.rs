// 🌐 REST API with Axum
// Routes, response DTOs and the error -> HTTP status mapping.

use crate::error::CountryError;
use crate::models::{format_timestamp, Country, CountryFilter, SortOrder};
use crate::reconciliation::ReconciliationReport;
use crate::service::CountryService;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: CountryService,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Country as exposed to readers (timestamp rendered ISO-8601)
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CountryResponse {
    pub id: i64,
    pub name: String,
    pub capital: String,
    pub region: String,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: String,
    pub last_refreshed_at: String,
}

impl From<Country> for CountryResponse {
    fn from(country: Country) -> Self {
        Self {
            id: country.id,
            name: country.name,
            capital: country.capital,
            region: country.region,
            population: country.population,
            currency_code: country.currency_code,
            exchange_rate: country.exchange_rate,
            estimated_gdp: country.estimated_gdp,
            flag_url: country.flag_url,
            last_refreshed_at: format_timestamp(&country.last_refreshed_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub status: String,
    pub inserted: usize,
    pub updated: usize,
}

impl From<ReconciliationReport> for RefreshResponse {
    fn from(report: ReconciliationReport) -> Self {
        Self {
            status: "Successfully refreshed countries".to_string(),
            inserted: report.inserted,
            updated: report.updated,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

// ============================================================================
// Error mapping
// ============================================================================

/// HTTP face of [`CountryError`]
pub struct ApiError(pub CountryError);

impl From<CountryError> for ApiError {
    fn from(err: CountryError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ValidationBody<'a> {
    error: &'static str,
    details: &'a BTreeMap<String, String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            CountryError::Validation { details, .. } => (
                StatusCode::BAD_REQUEST,
                Json(ValidationBody {
                    error: "Validation failed",
                    details,
                }),
            )
                .into_response(),
            CountryError::Fetch { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "External data source unavailable",
                    "details": self.0.to_string(),
                })),
            )
                .into_response(),
            CountryError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Country not found" })),
            )
                .into_response(),
            CountryError::Storage(e) => {
                error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// POST /countries/refresh - Fetch both sources and reconcile
async fn refresh_countries(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    let report = state.service.refresh_countries().await?;
    Ok(Json(report.into()))
}

/// GET /countries - List with optional region/currency filter and sort
async fn list_countries(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = CountryFilter::new(
        params.region,
        params.currency,
        SortOrder::parse(params.sort.as_deref()),
    );

    let countries: Vec<CountryResponse> = state
        .service
        .list_countries(&filter)?
        .into_iter()
        .map(|c| c.into())
        .collect();

    Ok(Json(json!({ "countries": countries })))
}

/// GET /countries/:name - Case-insensitive lookup
async fn get_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let country = CountryResponse::from(state.service.get_country_by_name(&name)?);
    Ok(Json(json!({ "country": country })))
}

/// DELETE /countries/:name
async fn delete_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_country_by_name(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /status - Row count and latest refresh time
async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.service.get_stats()?))
}

/// GET /summary/image - Latest summary image
async fn get_summary_image(State(state): State<AppState>) -> Response {
    match tokio::fs::read(state.service.summary_image_path()).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/svg+xml")], bytes).into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Summary image not found" })),
        )
            .into_response(),
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_stats))
        .route("/countries", get(list_countries))
        .route("/countries/refresh", post(refresh_countries))
        .route("/summary/image", get(get_summary_image))
        .route("/countries/:name", get(get_country).delete(delete_country))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
