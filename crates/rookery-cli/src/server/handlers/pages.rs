//! Server-rendered pages.

use axum::{
    extract::{Query, State},
    response::Html,
};
use rookery::{FormValues, HtmlPage};

use crate::server::error::ApiError;
use crate::server::state::AppState;

const DASHBOARD_TITLE: &str = "Penguin species classifier";
const OVERVIEW_TITLE: &str = "Palmer penguins";

/// The dashboard: form, prediction and both explanations.
///
/// Form values arrive as query parameters; missing ones take the form
/// defaults, so a bare `GET /` explains the default specimen.
pub async fn index(
    State(state): State<AppState>,
    Query(values): Query<FormValues>,
) -> Result<Html<String>, ApiError> {
    let request = state.dashboard.default_request();
    let page = state
        .run_blocking(move |dashboard| {
            let mut page = HtmlPage::new(DASHBOARD_TITLE, values);
            dashboard.render(&mut page, &request);
            page.finish()
        })
        .await?;
    Ok(Html(page))
}

/// The dataset overview page.
pub async fn explore(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let overview = state
        .dashboard
        .overview()
        .map_err(|e| ApiError::NotFound(format!("Dataset overview unavailable: {}", e)))?;

    let mut page = HtmlPage::new(OVERVIEW_TITLE, FormValues::new());
    overview.render(&mut page);
    Ok(Html(page.finish()))
}
