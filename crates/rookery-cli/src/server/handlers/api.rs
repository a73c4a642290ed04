//! JSON API handlers.

use axum::{extract::State, Json};
use rookery::{
    Classifier, DatasetOverview, DatasetProfile, ExplainRequest, ExplanationReport, FeatureRecord,
    FormSpec, FormValues, Prediction, SourceMetadata,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::server::error::ApiError;
use crate::server::state::AppState;

/// Response for the profile endpoint.
#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: DatasetProfile,
    pub source: Option<SourceMetadata>,
    pub classifier: String,
    /// Rows in the encoded reference sample.
    pub reference_rows: usize,
}

/// Response for the predict endpoint.
#[derive(Serialize)]
pub struct PredictResponse {
    pub record: FeatureRecord,
    pub prediction: Prediction,
}

/// Request body for the explain endpoint.
#[derive(Deserialize)]
pub struct ExplainBody {
    /// Feature values; strings or numbers.
    pub values: Map<String, Value>,
    /// Rule precision threshold; the configured default when absent.
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// Response for the explain endpoint.
#[derive(Serialize)]
pub struct ExplainResponse {
    pub record: FeatureRecord,
    pub prediction: Prediction,
    pub report: ExplanationReport,
}

/// Get the dataset profile.
pub async fn get_profile(State(state): State<AppState>) -> Json<ProfileResponse> {
    let dashboard = &state.dashboard;
    Json(ProfileResponse {
        profile: dashboard.profile().clone(),
        source: dashboard.source().cloned(),
        classifier: dashboard.pipeline().classifier.name().to_string(),
        reference_rows: dashboard.reference().n_rows(),
    })
}

/// Get the input form description.
pub async fn get_form(State(state): State<AppState>) -> Json<FormSpec> {
    Json(state.dashboard.form_spec().clone())
}

/// Classify one specimen. The body maps every feature to a value.
pub async fn predict(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<PredictResponse>, ApiError> {
    let values = form_values(body)?;
    let record = state.dashboard.collect(&values)?;
    let prediction = state.dashboard.predict(&record)?;
    Ok(Json(PredictResponse { record, prediction }))
}

/// Classify one specimen and explain the prediction.
///
/// Rule search is CPU-bound, so the whole cycle runs on the blocking pool
/// under the request timeout.
pub async fn explain(
    State(state): State<AppState>,
    Json(body): Json<ExplainBody>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let values = form_values(body.values)?;
    let request = match body.threshold {
        Some(threshold) => ExplainRequest { threshold },
        None => state.dashboard.default_request(),
    };
    request.validate()?;

    let response = state
        .run_blocking(move |dashboard| -> Result<ExplainResponse, ApiError> {
            let record = dashboard.collect(&values)?;
            let prediction = dashboard.predict(&record)?;
            let report = dashboard.explain(&record, &request)?;
            Ok(ExplainResponse {
                record,
                prediction,
                report,
            })
        })
        .await??;
    Ok(Json(response))
}

/// Get the dataset overview.
pub async fn get_overview(
    State(state): State<AppState>,
) -> Result<Json<DatasetOverview>, ApiError> {
    state
        .dashboard
        .overview()
        .map(|overview| Json(overview.clone()))
        .map_err(|e| ApiError::NotFound(format!("Dataset overview unavailable: {}", e)))
}

/// Form values from a JSON object of strings and numbers.
fn form_values(body: Map<String, Value>) -> Result<FormValues, ApiError> {
    body.into_iter()
        .map(|(name, value)| match value {
            Value::String(s) => Ok((name, s)),
            Value::Number(n) => Ok((name, n.to_string())),
            other => Err(ApiError::BadRequest(format!(
                "Value for '{}' must be a string or a number, got {}",
                name, other
            ))),
        })
        .collect()
}
