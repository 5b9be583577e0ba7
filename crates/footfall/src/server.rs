use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, Json, Router};
use chrono::{Local, NaiveDate, Timelike};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::align::order_stores;
use crate::calendar::HolidayCalendar;
use crate::config::Settings;
use crate::data::{self, Dataset, Selection, SelectionQuery};
use crate::html::{self, PageView};

/// Application state shared across requests
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub settings: Settings,
    pub holidays: HolidayCalendar,

    /// Stores in display order
    pub stores: Vec<String>,

    /// Last selection that produced a report, shown again when a request
    /// cannot be applied
    pub last_selection: RwLock<Option<Selection>>,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>, settings: Settings) -> Self {
        let stores = order_stores(dataset.stores(), &settings.preferred_stores);
        let holidays = settings.holidays();
        Self {
            dataset,
            settings,
            holidays,
            stores,
            last_selection: RwLock::new(None),
        }
    }

    /// Resolve the request, falling back to the last good selection on error.
    /// The second value is the error message to show, if any.
    async fn select(&self, query: &SelectionQuery, today: NaiveDate) -> (Selection, Option<String>) {
        match data::resolve_selection(query, today, self.settings.window_days) {
            Ok(selection) => {
                *self.last_selection.write().await = Some(selection.clone());
                (selection, None)
            }
            Err(e) => {
                warn!(error = %e, "Keeping previous selection");
                let previous = self.last_selection.read().await.clone();
                let selection = previous
                    .unwrap_or_else(|| Selection::default_for(today, self.settings.window_days));
                (selection, Some(e.to_string()))
            }
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/stores", get(stores_handler))
        .route("/api/report", get(report_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server
pub async fn serve(port: u16, dataset: Dataset, settings: Settings) -> anyhow::Result<()> {
    if dataset.is_empty() {
        warn!("Dataset has no rows, every chart will be empty");
    }
    let state = Arc::new(AppState::new(Arc::new(dataset), settings));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(addr = %addr, "Server running");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve the report page
async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SelectionQuery>,
) -> Html<String> {
    let now = Local::now();
    let (selection, notice) = state.select(&query, now.date_naive()).await;
    let report = data::build_report(
        &state.dataset,
        &selection,
        &state.settings.preferred_stores,
        &state.holidays,
    );

    let markup = html::render_page(&PageView {
        hour: now.hour(),
        stores: &state.stores,
        report: &report,
        notice,
    });
    Html(markup.into_string())
}

/// Return store names in display order
async fn stores_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.stores.clone())
}

/// Return the report for a selection as JSON
async fn report_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SelectionQuery>,
) -> Response {
    let today = Local::now().date_naive();
    match data::resolve_selection(&query, today, state.settings.window_days) {
        Ok(selection) => Json(data::build_report(
            &state.dataset,
            &selection,
            &state.settings.preferred_stores,
            &state.holidays,
        ))
        .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
