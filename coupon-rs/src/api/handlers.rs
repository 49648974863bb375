//! API request handlers
//!
//! Handlers read the wall clock once per request and pass it into the
//! engine; the engine itself never looks at the clock.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LimitsConfig;
use crate::coupon::{Coupon, Outcome, QuotaEngine, StatusCategory};

/// Shared application state
pub struct AppState {
    pub engine: QuotaEngine,
}

/// Create coupon request body
#[derive(Debug, Deserialize)]
pub struct CreateCouponRequest {
    pub code: String,
}

/// Optional acting user, `?userId=...`
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Verification result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    pub outcome: Outcome,
    pub message: String,
}

/// Success message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
        }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// HTTP status for an outcome category
pub fn status_for(category: StatusCategory) -> StatusCode {
    match category {
        StatusCategory::Ok => StatusCode::OK,
        StatusCategory::NotFound => StatusCode::NOT_FOUND,
        StatusCategory::Rejected => StatusCode::BAD_REQUEST,
    }
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /coupons - Create a coupon with the current default limits
pub async fn create_coupon(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCouponRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    if payload.code.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Coupon code must not be empty")),
        ));
    }

    state
        .engine
        .registry()
        .create_coupon(&payload.code)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ApiError::new(&e.to_string()))))?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Coupon added successfully".to_string(),
        }),
    ))
}

/// GET /coupons - All coupon codes, sorted
pub async fn list_coupons(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.engine.registry().codes().await)
}

/// GET /coupons/:code - Usage report for a coupon
pub async fn get_coupon(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<Coupon>> {
    state
        .engine
        .registry()
        .snapshot(&code)
        .await
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiError::new(Outcome::NotFound.message())),
            )
        })
}

/// GET /coupons/:code/verify - Check a coupon without redeeming it
pub async fn verify_coupon(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<UserQuery>,
) -> (StatusCode, Json<VerifyResponse>) {
    let outcome = state
        .engine
        .evaluate(&code, query.user_id.as_deref(), Utc::now())
        .await;

    (
        status_for(outcome.category()),
        Json(VerifyResponse {
            is_valid: outcome.is_valid(),
            outcome,
            message: outcome.message().to_string(),
        }),
    )
}

/// POST /coupons/:code/apply - Redeem a coupon
pub async fn apply_coupon(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<MessageResponse>> {
    let outcome = state
        .engine
        .try_redeem(&code, query.user_id.as_deref(), Utc::now())
        .await;

    if !outcome.is_valid() {
        return Err((
            status_for(outcome.category()),
            Json(ApiError {
                error: format!("Unable to apply coupon: {}", outcome.message()),
            }),
        ));
    }

    Ok(Json(MessageResponse {
        message: "Coupon applied successfully".to_string(),
    }))
}

/// GET /limits - Limits applied to coupons created from now on
pub async fn get_limits(State(state): State<Arc<AppState>>) -> Json<LimitsConfig> {
    Json(state.engine.registry().limits().await)
}

/// PUT /limits - Replace the limits for future coupons
pub async fn update_limits(
    State(state): State<Arc<AppState>>,
    Json(limits): Json<LimitsConfig>,
) -> Json<LimitsConfig> {
    state.engine.registry().set_limits(limits).await;
    Json(limits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_category() {
        assert_eq!(status_for(StatusCategory::Ok), StatusCode::OK);
        assert_eq!(status_for(StatusCategory::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(StatusCategory::Rejected), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_verify_response_shape() {
        let response = VerifyResponse {
            is_valid: false,
            outcome: Outcome::UserDailyLimitReached,
            message: Outcome::UserDailyLimitReached.message().to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["outcome"], "USER_DAILY_LIMIT_REACHED");
    }

    #[test]
    fn test_user_query_rename() {
        let query: UserQuery = serde_json::from_str(r#"{"userId":"user1"}"#).unwrap();
        assert_eq!(query.user_id.as_deref(), Some("user1"));
    }
}
