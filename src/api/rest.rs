// =============================================================================
// REST API — thin view over the simulation engine's snapshot
// =============================================================================
//
// All endpoints live under `/api/v1/`. `/health` is public; everything else
// requires a valid Bearer token via the `AuthBearer` extractor. Pagination,
// filtering, and formatting live here — the engine itself has no notion of
// "page" or "request".

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::engine::ExternalStockView;
use crate::stock::HISTORY_LENGTH;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/stocks", get(list_stocks))
        .route("/api/v1/stocks/:ticker", get(get_stock))
        .route("/api/v1/stocks/:ticker/history", get(get_stock_history))
        .route("/api/v1/market", get(market))
        .route("/api/v1/analytics", get(analytics))
        .route("/api/v1/snapshot", get(snapshot))
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    tick_count: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let engine = state.engine.read();
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        tick_count: engine.tick_count,
    })
}

#[derive(Deserialize)]
struct StockQuery {
    sector: Option<String>,
    status: Option<String>,
    #[serde(default = "default_page")]
    page: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    50
}

#[derive(Serialize)]
struct PagedStocks {
    stocks: Vec<ExternalStockView>,
    page: usize,
    page_size: usize,
    total: usize,
}

async fn list_stocks(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Query(query): Query<StockQuery>,
) -> impl IntoResponse {
    let snapshot = state.snapshot_external();

    let mut filtered: Vec<ExternalStockView> = snapshot
        .stocks
        .into_iter()
        .filter(|s| query.sector.as_deref().map_or(true, |sector| s.sector.eq_ignore_ascii_case(sector)))
        .filter(|s| {
            query
                .status
                .as_deref()
                .map_or(true, |status| format!("{:?}", s.market_status).eq_ignore_ascii_case(status))
        })
        .collect();

    let total = filtered.len();
    let page = query.page.max(1);
    let page_size = query.page_size.max(1);
    let start = (page - 1) * page_size;

    let page_items = if start >= filtered.len() {
        Vec::new()
    } else {
        let end = (start + page_size).min(filtered.len());
        filtered.drain(start..end).collect()
    };

    Json(PagedStocks {
        stocks: page_items,
        page,
        page_size,
        total,
    })
}

async fn get_stock(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.read();
    let phase = engine.market_state.phase;
    let stock = engine
        .find_by_ticker(&ticker)
        .ok_or(StatusCode::NOT_FOUND)?;
    let view = ExternalStockView::from_stock(stock, phase);
    Ok(Json(view))
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_ticks")]
    ticks: usize,
}

fn default_history_ticks() -> usize {
    HISTORY_LENGTH
}

#[derive(Serialize)]
struct HistoryResponse {
    ticker: String,
    history: Vec<f64>,
}

async fn get_stock_history(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.read();
    let stock = engine
        .find_by_ticker(&ticker)
        .ok_or(StatusCode::NOT_FOUND)?;

    let capped = query.ticks.min(HISTORY_LENGTH);
    let full = stock.history.as_vec();
    let start = full.len().saturating_sub(capped);

    Ok(Json(HistoryResponse {
        ticker: stock.ticker.clone(),
        history: full[start..].to_vec(),
    }))
}

async fn market(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot_external();
    Json(serde_json::json!({
        "marketState": snapshot.market_state,
        "regime": snapshot.regime,
        "phase": snapshot.phase,
        "timeInPhase": snapshot.time_in_phase,
        "periodReturns": snapshot.period_returns,
    }))
}

async fn analytics(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot_external();
    Json(snapshot.analytics)
}

async fn snapshot(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot_internal())
}
