use crate::domain::error::ServiceError;
use crate::domain::payment::{CheckoutRequest, CheckoutResponse};
use crate::http::rejection::json_body;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

pub async fn create_checkout_session(
    State(state): State<AppState>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ServiceError> {
    let req = json_body(body)?;
    let resp = state.checkout_service.create_checkout_session(req).await?;
    Ok(Json(resp))
}
