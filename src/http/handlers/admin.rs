use crate::domain::error::ServiceError;
use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::domain::waiver::AcceptanceSummary;
use crate::http::rejection::query_params;
use crate::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

pub const ADMIN_LIST_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct PaymentsQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptancesQuery {
    #[serde(default)]
    pub event_id: Option<String>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    query: Result<Query<PaymentsQuery>, QueryRejection>,
) -> Result<Json<Vec<PaymentRecord>>, ServiceError> {
    let query = query_params(query)?;
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            PaymentStatus::parse(&raw.to_lowercase())
                .ok_or_else(|| ServiceError::validation(format!("unknown payment status {raw}")))?,
        ),
        None => None,
    };

    let payments = state
        .payments_repo
        .list_recent(status, ADMIN_LIST_LIMIT)
        .await
        .map_err(ServiceError::internal)?;
    Ok(Json(payments))
}

pub async fn list_acceptances(
    State(state): State<AppState>,
    query: Result<Query<AcceptancesQuery>, QueryRejection>,
) -> Result<Json<Vec<AcceptanceSummary>>, ServiceError> {
    let query = query_params(query)?;
    let event_id = query
        .event_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::validation("eventId is required"))?;

    let acceptances = state
        .acceptances_repo
        .list_by_event(event_id, ADMIN_LIST_LIMIT)
        .await
        .map_err(ServiceError::internal)?;
    Ok(Json(acceptances))
}
