use crate::charts::ChartSet;
use crate::snapshot::Snapshot;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

const INDEX_HTML: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/index.html"));

#[derive(Clone)]
pub struct AppState {
    pub snapshot: watch::Receiver<Snapshot>,
    pub charts: watch::Receiver<ChartSet>,
    pub refresh_ms: u64,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(INDEX_HTML.replace("__REFRESH_MS__", &state.refresh_ms.to_string()))
}

async fn get_snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.snapshot.borrow().clone())
}

async fn get_charts(State(state): State<AppState>) -> Json<ChartSet> {
    Json(state.charts.borrow().clone())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/v1/snapshot", get(get_snapshot))
        .route("/v1/charts", get(get_charts))
        .layer(cors)
        .with_state(state)
}
