//! HTTP handlers for the roaster API.
//! Every failure is mapped to a status code and a JSON body here; handlers never panic.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::counter::CounterError;
use crate::metrics::MetricSummary;
use crate::profile::{FetchError, ProfileRecord};
use crate::roast::{Language, RoastError};
use crate::AppState;

const PROFILE_FAILED: &str = "Failed to fetch GitHub profile";
const ROAST_FAILED: &str = "Error generating roast";

/// JSON extractor whose rejection is rendered as an `ApiError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Status code plus the JSON body sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    fn new(status: StatusCode, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            json!({ "message": message.into() }),
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            json!({ "message": value.body_text() }),
        )
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Config(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": PROFILE_FAILED }),
            ),
            FetchError::Upstream {
                status: Some(status),
                body,
                ..
            } => {
                let status = StatusCode::from_u16(status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let mut payload = json!({ "error": PROFILE_FAILED });
                if let Some(details) = body {
                    payload["details"] = details;
                }
                Self::new(status, payload)
            }
            FetchError::Upstream { status: None, .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": PROFILE_FAILED }),
            ),
        }
    }
}

impl From<RoastError> for ApiError {
    fn from(err: RoastError) -> Self {
        match err {
            RoastError::Validation(message) => Self::bad_request(message),
            RoastError::Config(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": ROAST_FAILED, "error": "Server configuration error" }),
            ),
            RoastError::Model(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": ROAST_FAILED, "error": err.to_string() }),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self.body)).into_response()
    }
}

// --- Request / response bodies ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub username: String,
}

/// Roast request as received; validated field by field in `generate_roast`.
#[derive(Debug, Deserialize)]
pub struct RoastRequestBody {
    #[serde(rename = "profileData", default)]
    pub profile_data: Option<serde_json::Value>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoastResponse {
    pub roast: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub cached_profiles: usize,
    pub metrics: HashMap<String, MetricSummary>,
}

// --- Handlers ---

/// POST /api/github-profile
pub async fn github_profile(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let record = state.fetcher.fetch(&req.username).await?;
    Ok(Json(record))
}

/// POST /api/generate-roast
pub async fn generate_roast(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RoastRequestBody>,
) -> Result<Json<RoastResponse>, ApiError> {
    let profile_value = req
        .profile_data
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::bad_request("Profile data is missing"))?;

    let language: Language = req
        .language
        .as_deref()
        .unwrap_or_default()
        .parse()?;

    let profile: ProfileRecord = serde_json::from_value(profile_value).map_err(|e| {
        warn!(error = %e, "malformed profile data in roast request");
        ApiError::bad_request(format!("Invalid profile data: {e}"))
    })?;

    let roast = state.roaster.generate(Some(&profile), language).await?;
    Ok(Json(RoastResponse { roast }))
}

/// GET /api/user-count
pub async fn read_user_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .counter
        .read()
        .await
        .map_err(|e| counter_failure(e, "Failed to fetch user count"))?;
    Ok(Json(CountResponse { count }))
}

/// POST /api/user-count
pub async fn increment_user_count(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .counter
        .increment()
        .await
        .map_err(|e| counter_failure(e, "Failed to update user count"))?;
    Ok(Json(CountResponse { count }))
}

fn counter_failure(err: CounterError, message: &str) -> ApiError {
    warn!(error = %err, "usage counter failed");
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": message }),
    )
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    axum::Json(json!({ "status": "ok" }))
}

/// GET /api/metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        cached_profiles: state.fetcher.cache().len(),
        metrics: state.metrics.summary(),
    })
}
