//! API request handlers
//!
//! JSON endpoints wrap their payload in [`ApiResponse`]. Chart and CSV
//! endpoints answer with the raw document on success and the JSON wrapper
//! on failure.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cli::ChartRequest;
use crate::config::{DashboardConfig, STRICT_MIN_BALANCE};
use crate::core::{FilterParams, FilteredView, TenorSelection};
use crate::error::{CarteraError, CarteraResult};
use crate::types::{Metric, SheetKind};
use crate::writer;

use super::server::AppState;

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

fn failure(error: CarteraError) -> Response {
    tracing::warn!(%error, "request rejected");
    (StatusCode::BAD_REQUEST, Json(ApiResponse::<()>::err(error.to_string()))).into_response()
}

/// Unwrap a JSON body, turning extractor rejections (bad JSON, unknown
/// metric, bad tenor) into the same 400 wrapper as handler errors
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| failure(CarteraError::Validation(rejection.body_text())))
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "Cartera API Server".to_string(),
        version: state.version.clone(),
        description: "Loan portfolio delinquency dashboard over HTTP".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new("GET", "/api/v1/options", "Values accepted by each filter"),
            EndpointInfo::new("POST", "/api/v1/view", "Filtered rows as JSON"),
            EndpointInfo::new("POST", "/api/v1/chart/scatter", "Scatter chart as SVG"),
            EndpointInfo::new("POST", "/api/v1/chart/bars", "Bar + line chart as SVG"),
            EndpointInfo::new("POST", "/api/v1/export/csv", "Filtered rows as CSV"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub rows_loaded: usize,
}

/// GET /health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        rows_loaded: state.portfolio.total_records(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: ["options", "view", "scatter", "bars", "csv"]
            .iter()
            .map(|f| f.to_string())
            .collect(),
    }))
}

//==============================================================================
// Options
//==============================================================================

#[derive(Serialize)]
pub struct MetricInfo {
    pub slug: &'static str,
    pub header: &'static str,
}

#[derive(Serialize)]
pub struct OptionsResponse {
    pub business_units: Vec<String>,
    /// Departments available under each business unit
    pub departments: BTreeMap<String, Vec<String>>,
    pub tenors: Vec<u32>,
    pub sheets: Vec<SheetKind>,
    pub metrics: Vec<MetricInfo>,
    pub defaults: FilterParams,
}

/// GET /api/v1/options - Values accepted by each filter
pub async fn options(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let portfolio = &state.portfolio;
    let business_units = portfolio.business_units();
    let departments = business_units
        .iter()
        .map(|unit| (unit.clone(), portfolio.departments(std::slice::from_ref(unit))))
        .collect();

    Json(ApiResponse::ok(OptionsResponse {
        business_units,
        departments,
        tenors: portfolio.tenors(),
        sheets: SheetKind::ALL.to_vec(),
        metrics: Metric::ALL
            .iter()
            .map(|m| MetricInfo {
                slug: m.slug(),
                header: m.header(),
            })
            .collect(),
        defaults: FilterParams::from_config(&state.config),
    }))
}

//==============================================================================
// Filtered views
//==============================================================================

/// Filter selection sent by clients; absent fields take the config defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    pub sheets: Vec<SheetKind>,
    pub business_units: Vec<String>,
    pub departments: Vec<String>,
    pub tenor: Option<TenorSelection>,
    pub min_balance: Option<f64>,
    pub strict: bool,
    pub rate_flag: Option<String>,
    pub any_rate: bool,
}

impl FilterRequest {
    pub fn to_params(&self, config: &DashboardConfig) -> CarteraResult<FilterParams> {
        let mut params = FilterParams::from_config(config)
            .with_business_units(self.business_units.iter().cloned())
            .with_departments(self.departments.iter().cloned());
        if !self.sheets.is_empty() {
            params = params.with_sheets(self.sheets.clone());
        }
        if let Some(tenor) = self.tenor {
            params = params.with_tenor(tenor);
        }
        if self.strict {
            params = params.with_min_balance(STRICT_MIN_BALANCE);
        } else if let Some(min) = self.min_balance {
            params = params.with_min_balance(min);
        }
        if self.any_rate {
            params = params.with_rate_flag(None);
        } else if self.rate_flag.is_some() {
            params = params.with_rate_flag(self.rate_flag.clone());
        }
        params.validate_with(config)?;
        Ok(params)
    }
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    #[serde(flatten)]
    pub filters: FilterRequest,
    /// Sort descending by this metric
    #[serde(default)]
    pub sort: Option<Metric>,
}

#[derive(Serialize)]
pub struct ViewResponse {
    pub caption: String,
    #[serde(flatten)]
    pub view: FilteredView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// POST /api/v1/view - Filtered rows
pub async fn view(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ViewRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(req) => req,
        Err(response) => return response,
    };
    let result = req.filters.to_params(&state.config).and_then(|params| {
        FilteredView::derive(&state.portfolio, &params, &Default::default())
    });
    match result {
        Ok(view) => {
            let view = match req.sort {
                Some(metric) => view.sorted_desc(metric),
                None => view,
            };
            Json(ApiResponse::ok(ViewResponse {
                caption: view.caption(),
                message: view.empty_state().map(|s| s.message()),
                view,
            }))
            .into_response()
        }
        Err(e) => failure(e),
    }
}

//==============================================================================
// Charts
//==============================================================================

#[derive(Debug, Deserialize)]
pub struct ScatterRequest {
    #[serde(flatten)]
    pub filters: FilterRequest,
    pub x: Metric,
    pub y: Metric,
}

fn default_bars() -> Vec<Metric> {
    vec![Metric::Rrr]
}

fn default_line() -> Option<Metric> {
    Some(Metric::Usgaap90Pct)
}

#[derive(Debug, Deserialize)]
pub struct BarsRequest {
    #[serde(flatten)]
    pub filters: FilterRequest,
    #[serde(default = "default_bars")]
    pub bars: Vec<Metric>,
    /// `null` draws bars only
    #[serde(default = "default_line")]
    pub line: Option<Metric>,
}

fn render_chart(state: &AppState, filters: &FilterRequest, request: ChartRequest) -> Response {
    let result = filters
        .to_params(&state.config)
        .and_then(|params| request.render(&state.portfolio, &params, &state.config.chart));
    match result {
        Ok(rendered) => {
            tracing::debug!(plotted = rendered.plotted, caption = %rendered.caption, "chart rendered");
            ([(header::CONTENT_TYPE, "image/svg+xml")], rendered.svg).into_response()
        }
        Err(e) => failure(e),
    }
}

/// POST /api/v1/chart/scatter - Scatter chart as SVG
pub async fn scatter(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScatterRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(req) => req,
        Err(response) => return response,
    };
    render_chart(&state, &req.filters, ChartRequest::Scatter { x: req.x, y: req.y })
}

/// POST /api/v1/chart/bars - Bar + line chart as SVG
pub async fn bars(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BarsRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(req) => req,
        Err(response) => return response,
    };
    render_chart(
        &state,
        &req.filters,
        ChartRequest::Bars {
            bars: req.bars,
            line: req.line,
        },
    )
}

//==============================================================================
// Export
//==============================================================================

/// POST /api/v1/export/csv - Filtered rows as a CSV download
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(req) => req,
        Err(response) => return response,
    };
    let result = req
        .to_params(&state.config)
        .and_then(|params| FilteredView::derive(&state.portfolio, &params, &Default::default()))
        .and_then(|view| writer::to_csv_string(&view.rows));
    match result {
        Ok(csv) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"cartera.csv\""),
            ],
            csv,
        )
            .into_response(),
        Err(e) => failure(e),
    }
}
