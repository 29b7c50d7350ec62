use crate::catalog::Catalog;
use crate::domain::context::{build_context, checkout_metadata, total_minor, CheckoutContext};
use crate::domain::error::ServiceError;
use crate::domain::payment::{CheckoutRequest, CheckoutResponse, PaymentLink};
use crate::processor::{CheckoutProcessor, CreateSessionRequest, CreatedSession};
use crate::repo::members_repo::MembersRepo;
use crate::repo::orders_repo::OrdersRepo;
use crate::repo::payments_repo::{NewPayment, PaymentsRepo};
use crate::repo::registrations_repo::{NewRegistration, RegistrationsRepo};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct CheckoutService {
    pub pool: PgPool,
    pub catalog: Arc<Catalog>,
    pub processor: Arc<dyn CheckoutProcessor>,
    pub members_repo: MembersRepo,
    pub currency: String,
    pub membership_fee_minor: i64,
    pub public_base_url: String,
}

/// Ids chosen before the processor call so they can travel in the session
/// metadata. Nothing is written until the session exists.
#[derive(Debug, Clone, Copy)]
struct PlannedEntity {
    link: PaymentLink,
    registration_member_id: Option<Uuid>,
}

impl CheckoutService {
    pub async fn create_checkout_session(&self, req: CheckoutRequest) -> Result<CheckoutResponse, ServiceError> {
        let context = build_context(req, &self.catalog)?;
        let line_items = context.line_items(self.membership_fee_minor);
        let amount_minor = total_minor(&line_items);
        if amount_minor <= 0 {
            return Err(ServiceError::validation("checkout total must be positive"));
        }

        let planned = self.plan_entity(&context).await?;
        let mut metadata = checkout_metadata(planned.link, context.customer_email(), context.document_id());
        if let CheckoutContext::Membership(app) = &context {
            app.profile().write_metadata(&mut metadata);
        }

        let session_request = CreateSessionRequest {
            line_items,
            currency: self.currency.clone(),
            success_url: success_url(&self.public_base_url),
            cancel_url: cancel_url(&self.public_base_url, planned.link),
            customer_email: Some(context.customer_email().to_string()),
            client_reference_id: planned.link.entity_id().to_string(),
            metadata: metadata.clone(),
        };

        let created = self
            .processor
            .create_session(&session_request)
            .await
            .map_err(ServiceError::upstream)?;

        let payment = NewPayment {
            id: Uuid::new_v4(),
            link: planned.link,
            external_session_id: created.id.clone(),
            amount_minor,
            currency: self.currency.clone(),
            metadata,
        };
        let link = match self.persist_pending(&context, planned, payment, amount_minor).await {
            Ok(link) => link,
            Err(e) => {
                self.abandon_session(&created).await;
                return Err(ServiceError::internal(e));
            }
        };

        tracing::info!(
            session_id = %created.id,
            payment_type = link.payment_type().as_str(),
            entity_id = %link.entity_id(),
            amount_minor,
            processor = self.processor.name(),
            "checkout session created"
        );

        Ok(CheckoutResponse {
            session_id: created.id,
            url: created.url,
        })
    }

    async fn plan_entity(&self, context: &CheckoutContext) -> Result<PlannedEntity, ServiceError> {
        let (link, registration_member_id) = match context {
            CheckoutContext::Membership(app) => {
                let existing = self
                    .members_repo
                    .find_id_by_email(&app.email)
                    .await
                    .map_err(ServiceError::internal)?;
                (PaymentLink::Membership(existing.unwrap_or_else(Uuid::new_v4)), None)
            }
            CheckoutContext::Event(signup) => {
                let member_id = self
                    .members_repo
                    .find_id_by_email(&signup.email)
                    .await
                    .map_err(ServiceError::internal)?;
                (PaymentLink::Event(Uuid::new_v4()), member_id)
            }
            CheckoutContext::Order(_) => (PaymentLink::Order(Uuid::new_v4()), None),
        };
        Ok(PlannedEntity {
            link,
            registration_member_id,
        })
    }

    /// Writes the pending entity and its payment in one transaction.
    async fn persist_pending(
        &self,
        context: &CheckoutContext,
        planned: PlannedEntity,
        mut payment: NewPayment,
        amount_minor: i64,
    ) -> anyhow::Result<PaymentLink> {
        let mut tx = self.pool.begin().await?;

        let link = match (context, planned.link) {
            (CheckoutContext::Membership(app), PaymentLink::Membership(id)) => {
                let stored = MembersRepo::upsert_pending_tx(&mut tx, id, app).await?;
                if stored != id {
                    tracing::warn!(planned = %id, stored = %stored, "member email claimed concurrently; linking stored member");
                }
                PaymentLink::Membership(stored)
            }
            (CheckoutContext::Event(signup), PaymentLink::Event(id)) => {
                let registration = NewRegistration {
                    id,
                    event_id: signup.event_id.clone(),
                    member_id: planned.registration_member_id,
                    participant_full_name: signup.full_name.clone(),
                    participant_document_id: signup.document_id.clone(),
                    participant_email: signup.email.clone(),
                };
                RegistrationsRepo::insert_pending_tx(&mut tx, &registration).await?;
                planned.link
            }
            (CheckoutContext::Order(order), PaymentLink::Order(id)) => {
                OrdersRepo::insert_pending_tx(&mut tx, id, order, amount_minor, &self.currency).await?;
                planned.link
            }
            _ => anyhow::bail!("checkout context does not match planned payment link"),
        };

        payment.link = link;
        let record = PaymentsRepo::insert_pending_tx(&mut tx, &payment).await?;
        tx.commit().await?;

        tracing::debug!(payment_id = %record.id, session_id = %record.external_session_id, "pending payment recorded");
        Ok(link)
    }

    async fn abandon_session(&self, created: &CreatedSession) {
        if let Err(e) = self.processor.expire_session(&created.id).await {
            tracing::warn!(
                session_id = %created.id,
                error = ?e,
                "could not expire session after failing to record its payment"
            );
        }
    }
}

/// The processor substitutes the literal `{CHECKOUT_SESSION_ID}` placeholder.
pub fn success_url(base: &str) -> String {
    format!("{base}/pago/resultado?session_id={{CHECKOUT_SESSION_ID}}")
}

pub fn cancel_url(base: &str, link: PaymentLink) -> String {
    let section = match link {
        PaymentLink::Membership(_) => "hazte-socio",
        PaymentLink::Event(_) => "actividades",
        PaymentLink::Order(_) => "tienda",
    };
    format!("{base}/{section}?pago=cancelado")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_urls_point_back_to_the_portal() {
        assert_eq!(
            success_url("https://club.example"),
            "https://club.example/pago/resultado?session_id={CHECKOUT_SESSION_ID}"
        );
        let cancel = cancel_url("https://club.example", PaymentLink::Order(Uuid::nil()));
        assert_eq!(cancel, "https://club.example/tienda?pago=cancelado");
    }
}
