use crate::catalog::Catalog;
use crate::domain::context::{non_blank, required_document, required_name};
use crate::domain::error::{is_unique_violation, ServiceError};
use crate::domain::member::{is_plausible_email, normalize_email, parse_iso_date};
use crate::domain::waiver::{AcceptWaiverRequest, ClientInfo, WaiverAcceptance, WaiverDocument};
use crate::repo::members_repo::MembersRepo;
use crate::repo::registrations_repo::RegistrationsRepo;
use crate::repo::waiver_acceptances_repo::WaiverAcceptancesRepo;
use crate::waiver::document::{render_acceptance_pdf, AcceptanceDocument};
use crate::waiver::hashing::{canonicalize, fingerprint};
use crate::waiver::linkage::{resolve_linkage, Linkage, LinkageCandidates};
use crate::waiver::registry::resolve_waiver_or_fail;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAcceptance {
    pub event_id: String,
    pub full_name: String,
    pub document_id: String,
    pub email: Option<String>,
    pub birth_date: Option<chrono::NaiveDate>,
    pub waiver_version: String,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct WaiverService {
    pub catalog: Arc<Catalog>,
    pub acceptances_repo: WaiverAcceptancesRepo,
    pub members_repo: MembersRepo,
    pub registrations_repo: RegistrationsRepo,
}

impl WaiverService {
    pub async fn record_acceptance(
        &self,
        req: AcceptWaiverRequest,
        client: ClientInfo,
    ) -> Result<WaiverAcceptance, ServiceError> {
        let input = validate_acceptance(&req)?;
        let waiver = resolve_waiver_or_fail(&self.catalog, &input.event_id, &input.waiver_version)?;

        let linkage = self.resolve_linkage(&input).await.map_err(ServiceError::internal)?;
        let acceptance = build_acceptance(&input, &waiver, linkage, &client, chrono::Utc::now());

        if let Some(client_hash) = non_blank(req.waiver_text_hash.as_deref()) {
            if !client_hash.eq_ignore_ascii_case(&acceptance.waiver_text_hash) {
                tracing::warn!(
                    event_id = %input.event_id,
                    waiver_version = %input.waiver_version,
                    client_hash,
                    server_hash = %acceptance.waiver_text_hash,
                    "client waiver hash differs from published text"
                );
            }
        }
        if let Some(client_ts) = non_blank(req.accepted_at_iso.as_deref()) {
            tracing::debug!(client_ts, server_ts = %acceptance.accepted_at, "client acceptance timestamp ignored");
        }

        if let Err(e) = self.acceptances_repo.insert(&acceptance).await {
            if is_unique_violation(&e) {
                return Err(ServiceError::conflict(format!(
                    "waiver {} for event {} was already accepted by this participant",
                    input.waiver_version, input.event_id
                )));
            }
            return Err(ServiceError::internal(e));
        }

        tracing::info!(
            acceptance_id = %acceptance.id,
            event_id = %acceptance.event_id,
            waiver_version = %acceptance.waiver_version,
            member_id = ?acceptance.member_id,
            event_registration_id = ?acceptance.event_registration_id,
            "waiver acceptance recorded"
        );
        Ok(acceptance)
    }

    pub async fn render_acceptance_document(&self, registration_id: Uuid) -> Result<RenderedDocument, ServiceError> {
        let registration = self
            .registrations_repo
            .get(registration_id)
            .await
            .map_err(ServiceError::internal)?
            .ok_or_else(|| ServiceError::not_found(format!("registration {registration_id} not found")))?;

        let mut acceptance = None;
        if let Some(member_id) = registration.member_id {
            acceptance = self
                .acceptances_repo
                .latest_for_member(&registration.event_id, member_id)
                .await
                .map_err(ServiceError::internal)?;
        }
        if acceptance.is_none() {
            acceptance = self
                .acceptances_repo
                .latest_for_document(&registration.event_id, &registration.participant_document_id)
                .await
                .map_err(ServiceError::internal)?;
        }
        let acceptance = acceptance.ok_or_else(|| {
            ServiceError::not_found(format!("no waiver acceptance for registration {registration_id}"))
        })?;

        let event_name = self
            .catalog
            .event(&acceptance.event_id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| acceptance.event_id.clone());

        let bytes = render_acceptance_pdf(&AcceptanceDocument {
            event_name,
            participant_full_name: acceptance.participant_full_name.clone(),
            participant_document_id: acceptance.participant_document_id.clone(),
            waiver_version: acceptance.waiver_version.clone(),
            accepted_at: acceptance.accepted_at,
            waiver_text_hash: acceptance.waiver_text_hash.clone(),
            waiver_text_raw: acceptance.waiver_text_raw.clone(),
        })
        .map_err(ServiceError::internal)?;

        Ok(RenderedDocument {
            filename: document_filename(&acceptance.event_id, &acceptance.participant_document_id),
            bytes,
        })
    }

    async fn resolve_linkage(&self, input: &ValidatedAcceptance) -> anyhow::Result<Linkage> {
        let member_by_email = match &input.email {
            Some(email) => self.members_repo.find_id_by_email(email).await?,
            None => None,
        };
        let member_by_document = self.members_repo.find_id_by_document(&input.document_id).await?;
        let registration = self
            .registrations_repo
            .latest_for_participant(&input.event_id, &input.document_id)
            .await?;

        let linkage = resolve_linkage(LinkageCandidates {
            member_by_email,
            member_by_document,
            registration,
        });
        if linkage.ambiguous {
            tracing::warn!(
                event_id = %input.event_id,
                member_by_email = ?member_by_email,
                member_by_document = ?member_by_document,
                "email and document id resolve to different members; linking by email"
            );
        }
        Ok(linkage)
    }
}

pub fn validate_acceptance(req: &AcceptWaiverRequest) -> Result<ValidatedAcceptance, ServiceError> {
    let event_id = non_blank(req.event_id.as_deref())
        .ok_or_else(|| ServiceError::validation("eventId is required"))?
        .to_string();
    let full_name = required_name(req.participant_full_name.as_deref(), "participantFullName")?;
    let document_id = required_document(req.participant_document_id.as_deref(), "participantDocumentId")?;
    let waiver_version = non_blank(req.waiver_version.as_deref())
        .ok_or_else(|| ServiceError::validation("waiverVersion is required"))?
        .to_string();

    let email = match non_blank(req.participant_email.as_deref()) {
        Some(raw) => {
            let email = normalize_email(raw);
            if !is_plausible_email(&email) {
                return Err(ServiceError::validation("participantEmail is not a valid email"));
            }
            Some(email)
        }
        None => None,
    };

    let birth_date = match non_blank(req.participant_birth_date_iso.as_deref()) {
        Some(raw) => Some(
            parse_iso_date(raw)
                .ok_or_else(|| ServiceError::validation("participantBirthDateISO must be an ISO date"))?,
        ),
        None => None,
    };

    Ok(ValidatedAcceptance {
        event_id,
        full_name,
        document_id,
        email,
        birth_date,
        waiver_version,
    })
}

/// Assembles the record to persist. Hash and timestamp are server values only.
pub fn build_acceptance(
    input: &ValidatedAcceptance,
    waiver: &WaiverDocument,
    linkage: Linkage,
    client: &ClientInfo,
    accepted_at: chrono::DateTime<chrono::Utc>,
) -> WaiverAcceptance {
    let canonical = canonicalize(&waiver.text);
    let hash = fingerprint(&canonical);

    WaiverAcceptance {
        id: Uuid::new_v4(),
        event_id: waiver.event_id.clone(),
        participant_full_name: input.full_name.clone(),
        participant_document_id: input.document_id.clone(),
        participant_birth_date: input.birth_date,
        waiver_version: waiver.version.clone(),
        waiver_text_raw: waiver.text.clone(),
        waiver_text_canonical: canonical,
        waiver_text_hash: hash,
        accepted_at,
        ip_address: client.ip_address.clone(),
        user_agent: client.user_agent.clone(),
        member_id: linkage.member_id,
        event_registration_id: linkage.event_registration_id,
    }
}

fn document_filename(event_id: &str, document_id: &str) -> String {
    let safe = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    };
    format!("descargo-{}-{}.pdf", safe(event_id), safe(document_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_header_safe() {
        assert_eq!(
            document_filename("travesía 2026", "12345678Z"),
            "descargo-traves_a_2026-12345678Z.pdf"
        );
    }
}
