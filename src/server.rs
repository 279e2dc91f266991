//! HTTP surface: dashboard page and JSON endpoints over the shared monitor.

use crate::catalog::MetricDescriptor;
use crate::export::{snapshot_all, MetricsSnapshot};
use crate::monitor::Monitor;
use axum::extract::State;
use axum::response::{Html, Json};
use axum::routing::get;
use axum::Router;
use nix::unistd::{sysconf, SysconfVar};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const DASHBOARD: &str = include_str!("../assets/dashboard.html");

/// Facts the dashboard needs to label units.
#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    pub hostname: String,
    pub page_size: Option<i64>,
    pub clock_ticks: Option<i64>,
}

impl HostInfo {
    pub fn detect() -> Self {
        let sysconf_value = |var| sysconf(var).ok().flatten().map(i64::from);
        Self {
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown-host".to_string()),
            page_size: sysconf_value(SysconfVar::PAGE_SIZE),
            clock_ticks: sysconf_value(SysconfVar::CLK_TCK),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    monitor: Arc<Monitor>,
    host: Arc<HostInfo>,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub host: HostInfo,
    pub processes: Vec<String>,
    pub metrics: Vec<MetricDescriptor>,
}

pub fn router(monitor: Arc<Monitor>, host: HostInfo) -> Router {
    let state = AppState {
        monitor,
        host: Arc::new(host),
    };

    Router::new()
        .route("/", get(handle_dashboard))
        .route("/metrics", get(handle_metrics))
        .route("/catalog", get(handle_catalog))
        .route("/healthz", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_dashboard() -> Html<&'static str> {
    Html(DASHBOARD)
}

async fn handle_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(snapshot_all(&state.monitor))
}

async fn handle_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        host: (*state.host).clone(),
        processes: state.monitor.names(),
        metrics: state
            .monitor
            .metrics()
            .iter()
            .map(|m| m.descriptor())
            .collect(),
    })
}

async fn handle_health() -> &'static str {
    "ok"
}
