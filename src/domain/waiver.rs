use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authoritative waiver text for one event version, as published in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaiverDocument {
    pub event_id: String,
    pub event_name: String,
    pub version: String,
    pub text: String,
}

/// Body of `POST /waiver-acceptances`.
///
/// `waiver_text_hash` and `accepted_at_iso` come from the client and are only
/// compared against server values for logging.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptWaiverRequest {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub participant_full_name: Option<String>,
    #[serde(default)]
    pub participant_document_id: Option<String>,
    #[serde(default)]
    pub participant_email: Option<String>,
    #[serde(default, rename = "participantBirthDateISO")]
    pub participant_birth_date_iso: Option<String>,
    #[serde(default)]
    pub waiver_version: Option<String>,
    #[serde(default)]
    pub waiver_text_hash: Option<String>,
    #[serde(default, rename = "acceptedAtISO")]
    pub accepted_at_iso: Option<String>,
}

/// Request metadata captured at the HTTP boundary.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaiverAcceptance {
    pub id: Uuid,
    pub event_id: String,
    pub participant_full_name: String,
    pub participant_document_id: String,
    pub participant_birth_date: Option<chrono::NaiveDate>,
    pub waiver_version: String,
    pub waiver_text_raw: String,
    pub waiver_text_canonical: String,
    pub waiver_text_hash: String,
    pub accepted_at: chrono::DateTime<chrono::Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub member_id: Option<Uuid>,
    pub event_registration_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceResponse {
    pub acceptance_id: Uuid,
    pub waiver_version: String,
    pub waiver_text_hash: String,
    #[serde(rename = "acceptedAtISO")]
    pub accepted_at_iso: String,
    pub member_id: Option<Uuid>,
    pub event_registration_id: Option<Uuid>,
}

impl From<&WaiverAcceptance> for AcceptanceResponse {
    fn from(a: &WaiverAcceptance) -> Self {
        Self {
            acceptance_id: a.id,
            waiver_version: a.waiver_version.clone(),
            waiver_text_hash: a.waiver_text_hash.clone(),
            accepted_at_iso: a.accepted_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            member_id: a.member_id,
            event_registration_id: a.event_registration_id,
        }
    }
}

/// Row shape for the admin listing; leaves out the stored texts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceSummary {
    pub id: Uuid,
    pub event_id: String,
    pub participant_full_name: String,
    pub participant_document_id: String,
    pub waiver_version: String,
    pub waiver_text_hash: String,
    pub accepted_at: chrono::DateTime<chrono::Utc>,
    pub member_id: Option<Uuid>,
    pub event_registration_id: Option<Uuid>,
}
