use crate::domain::error::ServiceError;
use crate::domain::waiver::{AcceptWaiverRequest, AcceptanceResponse, ClientInfo};
use crate::http::rejection::{client_ip, header_string, json_body, query_params};
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    #[serde(default)]
    pub registration_id: Option<String>,
}

pub async fn accept_waiver(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AcceptWaiverRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let req = json_body(body)?;
    let client = ClientInfo {
        ip_address: client_ip(&headers),
        user_agent: header_string(&headers, header::USER_AGENT),
    };

    let acceptance = state.waiver_service.record_acceptance(req, client).await?;
    Ok((StatusCode::CREATED, Json(AcceptanceResponse::from(&acceptance))).into_response())
}

pub async fn acceptance_document(
    State(state): State<AppState>,
    query: Result<Query<DocumentQuery>, QueryRejection>,
) -> Result<Response, ServiceError> {
    let query = query_params(query)?;
    let raw = query
        .registration_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::validation("registrationId is required"))?;
    let registration_id =
        Uuid::parse_str(raw).map_err(|_| ServiceError::validation("registrationId must be a UUID"))?;

    let document = state.waiver_service.render_acceptance_document(registration_id).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", document.filename),
            ),
        ],
        document.bytes,
    )
        .into_response())
}
