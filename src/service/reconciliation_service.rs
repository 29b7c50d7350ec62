use crate::catalog::Catalog;
use crate::domain::error::{ErrorKind, ServiceError};
use crate::domain::member::{MemberProfile, MemberStatus, OrderStatus, RegistrationStatus};
use crate::domain::payment::{CancelResponse, PaymentLink, PaymentRecord, PaymentStatus, VerifyResponse};
use crate::processor::signature::verify_webhook_signature;
use crate::processor::status::{map_external_status, next_status};
use crate::processor::CheckoutProcessor;
use crate::repo::members_repo::MembersRepo;
use crate::repo::orders_repo::OrdersRepo;
use crate::repo::payments_repo::PaymentsRepo;
use crate::repo::registrations_repo::RegistrationsRepo;
use crate::service::notifier::{
    license_activation_email, order_paid_email, registration_confirmed_email, Email, Notifier,
};
use anyhow::anyhow;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Reconciled { session_id: String, status: PaymentStatus },
    UnknownSession { session_id: String },
    Ignored { event_type: String },
}

#[derive(Clone)]
pub struct ReconciliationService {
    pub pool: PgPool,
    pub catalog: Arc<Catalog>,
    pub processor: Arc<dyn CheckoutProcessor>,
    pub payments_repo: PaymentsRepo,
    pub members_repo: MembersRepo,
    pub registrations_repo: RegistrationsRepo,
    pub orders_repo: OrdersRepo,
    pub notifier: Notifier,
    pub webhook_secret: String,
}

impl ReconciliationService {
    /// Pulls the processor's view of a session and applies at most one
    /// forward transition. Terminal records are returned untouched.
    pub async fn reconcile(&self, session_id: &str) -> Result<PaymentRecord, ServiceError> {
        let record = self.load(session_id).await?;
        if record.status.is_terminal() {
            return Ok(record);
        }

        let session = self
            .processor
            .retrieve_session(session_id)
            .await
            .map_err(ServiceError::upstream)?;
        let derived = map_external_status(&session);

        match next_status(record.status, derived) {
            Some(next) => Ok(self.transition(&record, next).await?.0),
            None => Ok(record),
        }
    }

    pub async fn verify(&self, session_id: &str) -> Result<VerifyResponse, ServiceError> {
        let session_id = required_session_id(session_id)?;
        let record = self.reconcile(session_id).await?;
        let domain_status = self.domain_status(&record).await.map_err(ServiceError::internal)?;

        Ok(VerifyResponse {
            session_id: record.external_session_id.clone(),
            payment_id: record.id,
            payment_type: record.payment_type,
            status: record.status,
            amount_minor: record.amount_minor,
            currency: record.currency.clone(),
            member_id: record.member_id,
            event_registration_id: record.event_registration_id,
            order_id: record.order_id,
            domain_status,
        })
    }

    /// Marks a pending payment failed after asking the processor to expire
    /// the session. A session the processor reports as paid is completed
    /// instead.
    pub async fn cancel(&self, session_id: &str) -> Result<CancelResponse, ServiceError> {
        let session_id = required_session_id(session_id)?;
        let record = self.load(session_id).await?;
        if record.status.is_terminal() {
            return Ok(CancelResponse {
                status: record.status,
                already_processed: true,
            });
        }

        if let Err(e) = self.processor.expire_session(session_id).await {
            tracing::warn!(session_id, error = ?e, "processor did not expire session");
            match self.processor.retrieve_session(session_id).await {
                Ok(session) if map_external_status(&session) == PaymentStatus::Completed => {
                    let (current, _) = self.transition(&record, PaymentStatus::Completed).await?;
                    return Ok(CancelResponse {
                        status: current.status,
                        already_processed: true,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(session_id, error = ?e, "could not read session before cancelling");
                }
            }
        }

        let (current, applied) = self.transition(&record, PaymentStatus::Failed).await?;
        if applied {
            tracing::info!(session_id, payment_id = %current.id, "payment cancelled");
        }
        Ok(CancelResponse {
            status: current.status,
            already_processed: !applied,
        })
    }

    /// Verifies the signature, then reconciles the referenced session. The
    /// payload's own status fields are never applied.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookOutcome, ServiceError> {
        if self.webhook_secret.is_empty() {
            return Err(ServiceError::internal(anyhow!("webhook secret is not configured")));
        }
        let header = signature_header
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ServiceError::validation("missing signature header"))?;

        let valid = verify_webhook_signature(&self.webhook_secret, payload, header, chrono::Utc::now().timestamp())
            .map_err(|e| ServiceError::validation("malformed signature header").with_details(e.to_string()))?;
        if !valid {
            tracing::warn!("webhook rejected: signature mismatch or stale timestamp");
            return Err(ServiceError::validation("invalid webhook signature"));
        }

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| ServiceError::validation("invalid webhook payload").with_details(e.to_string()))?;

        if !event.event_type.starts_with("checkout.session.") {
            tracing::debug!(event_id = ?event.id, event_type = %event.event_type, "webhook event ignored");
            return Ok(WebhookOutcome::Ignored {
                event_type: event.event_type,
            });
        }

        let session_id = event
            .data
            .and_then(|d| d.object.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::validation("webhook event has no session id"))?;

        match self.reconcile(&session_id).await {
            Ok(record) => {
                tracing::info!(
                    event_id = ?event.id,
                    event_type = %event.event_type,
                    session_id = %session_id,
                    status = record.status.as_str(),
                    "webhook reconciled"
                );
                Ok(WebhookOutcome::Reconciled {
                    session_id,
                    status: record.status,
                })
            }
            Err(e) if e.kind == ErrorKind::NotFound => {
                tracing::info!(session_id = %session_id, "webhook for unknown session acknowledged");
                Ok(WebhookOutcome::UnknownSession { session_id })
            }
            Err(e) => Err(e),
        }
    }

    async fn load(&self, session_id: &str) -> Result<PaymentRecord, ServiceError> {
        self.payments_repo
            .find_by_session(session_id)
            .await
            .map_err(ServiceError::internal)?
            .ok_or_else(|| ServiceError::not_found(format!("payment for session {session_id} not found")))
    }

    /// Conditional status update plus domain cascade in one transaction.
    /// Returns the current record and whether this call applied the change.
    async fn transition(
        &self,
        record: &PaymentRecord,
        next: PaymentStatus,
    ) -> Result<(PaymentRecord, bool), ServiceError> {
        let mut tx = self.pool.begin().await.map_err(|e| ServiceError::internal(e.into()))?;

        let updated = PaymentsRepo::transition_from_pending_tx(&mut tx, &record.external_session_id, next)
            .await
            .map_err(ServiceError::internal)?;

        let Some(updated) = updated else {
            tx.rollback().await.map_err(|e| ServiceError::internal(e.into()))?;
            let current = self.load(&record.external_session_id).await?;
            tracing::debug!(
                session_id = %record.external_session_id,
                status = current.status.as_str(),
                "payment already transitioned by a concurrent request"
            );
            return Ok((current, false));
        };

        apply_outcome_tx(&mut tx, &updated).await.map_err(ServiceError::internal)?;
        tx.commit().await.map_err(|e| ServiceError::internal(e.into()))?;

        tracing::info!(
            payment_id = %updated.id,
            session_id = %updated.external_session_id,
            payment_type = updated.payment_type.as_str(),
            status = updated.status.as_str(),
            "payment status updated"
        );

        if updated.status == PaymentStatus::Completed {
            let this = self.clone();
            let paid = updated.clone();
            tokio::spawn(async move { this.notify_completed(&paid).await });
        }
        Ok((updated, true))
    }

    async fn domain_status(&self, record: &PaymentRecord) -> anyhow::Result<Option<&'static str>> {
        Ok(match record.link() {
            Some(PaymentLink::Membership(id)) => self.members_repo.status(id).await?.map(MemberStatus::as_str),
            Some(PaymentLink::Event(id)) => self
                .registrations_repo
                .status(id)
                .await?
                .map(RegistrationStatus::as_str),
            Some(PaymentLink::Order(id)) => self.orders_repo.status(id).await?.map(OrderStatus::as_str),
            None => None,
        })
    }

    async fn notify_completed(&self, payment: &PaymentRecord) {
        let Some(link) = payment.link() else {
            return;
        };
        let email = match self.completion_email(link, payment).await {
            Ok(Some(email)) => email,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(payment_id = %payment.id, error = ?e, "could not build notification");
                return;
            }
        };

        if let Err(e) = self.notifier.send(&email).await {
            tracing::warn!(payment_id = %payment.id, to = %email.to, error = ?e, "notification failed");
            let note = format!(
                "{} email \"{}\" failed: {e}",
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                email.subject
            );
            let annotated = match link {
                PaymentLink::Membership(id) => self.members_repo.annotate(id, &note).await,
                PaymentLink::Event(id) => self.registrations_repo.annotate(id, &note).await,
                PaymentLink::Order(id) => self.orders_repo.annotate(id, &note).await,
            };
            if let Err(e) = annotated {
                tracing::warn!(payment_id = %payment.id, error = ?e, "could not annotate notification failure");
            }
        }
    }

    async fn completion_email(&self, link: PaymentLink, payment: &PaymentRecord) -> anyhow::Result<Option<Email>> {
        Ok(match link {
            PaymentLink::Membership(id) => self
                .members_repo
                .get(id)
                .await?
                .map(|m| license_activation_email(&m.email, &m.full_name, m.license_code.as_deref())),
            PaymentLink::Event(id) => self.registrations_repo.get(id).await?.map(|r| {
                let event_name = self
                    .catalog
                    .event(&r.event_id)
                    .map(|e| e.name.as_str())
                    .unwrap_or(r.event_id.as_str());
                registration_confirmed_email(&r.participant_email, &r.participant_full_name, event_name)
            }),
            PaymentLink::Order(id) => self.orders_repo.get(id).await?.map(|o| {
                order_paid_email(&o.customer_email, &o.customer_name, payment.amount_minor, &payment.currency)
            }),
        })
    }
}

/// Cascades a terminal payment status onto its linked entity.
pub async fn apply_outcome_tx(tx: &mut Transaction<'_, Postgres>, payment: &PaymentRecord) -> anyhow::Result<()> {
    let link = payment
        .link()
        .ok_or_else(|| anyhow!("payment {} has no consistent entity link", payment.id))?;

    match (link, payment.status) {
        (_, PaymentStatus::Pending) => {}
        (PaymentLink::Membership(id), PaymentStatus::Completed) => {
            let profile = MemberProfile::from_metadata(&payment.metadata);
            MembersRepo::mark_active_tx(tx, id, profile.as_ref()).await?
        }
        (PaymentLink::Event(id), PaymentStatus::Completed) => RegistrationsRepo::mark_confirmed_tx(tx, id).await?,
        (PaymentLink::Order(id), PaymentStatus::Completed) => OrdersRepo::mark_paid_tx(tx, id).await?,
        (PaymentLink::Membership(id), PaymentStatus::Failed) => {
            MembersRepo::mark_payment_failed_tx(tx, id, payment.id, payment.created_at).await?
        }
        (PaymentLink::Event(id), PaymentStatus::Failed) => {
            RegistrationsRepo::mark_payment_failed_tx(tx, id, payment.id, payment.created_at).await?
        }
        (PaymentLink::Order(id), PaymentStatus::Failed) => {
            OrdersRepo::mark_payment_failed_tx(tx, id, payment.id, payment.created_at).await?
        }
    }
    Ok(())
}

fn required_session_id(session_id: &str) -> Result<&str, ServiceError> {
    let trimmed = session_id.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation("sessionId is required"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_session_id_is_rejected() {
        let err = required_session_id("  ").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(required_session_id(" cs_1 ").unwrap(), "cs_1");
    }

    #[test]
    fn webhook_event_reads_the_nested_session_id() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1","payment_status":"paid"}}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.and_then(|d| d.object.id).as_deref(), Some("cs_1"));
    }
}
