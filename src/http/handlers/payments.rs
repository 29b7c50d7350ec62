use crate::domain::error::ServiceError;
use crate::domain::payment::{CancelResponse, SessionRequest, VerifyResponse};
use crate::http::rejection::json_body;
use crate::service::reconciliation_service::WebhookOutcome;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub async fn verify_payment(
    State(state): State<AppState>,
    body: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ServiceError> {
    let req = json_body(body)?;
    let resp = state
        .reconciliation_service
        .verify(req.session_id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(resp))
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    body: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<Json<CancelResponse>, ServiceError> {
    let req = json_body(body)?;
    let resp = state
        .reconciliation_service
        .cancel(req.session_id.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(resp))
}

pub async fn processor_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok());
    let outcome = state.reconciliation_service.handle_webhook(&body, signature).await?;

    let handled = !matches!(outcome, WebhookOutcome::Ignored { .. });
    Ok(Json(serde_json::json!({ "received": true, "handled": handled })))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
