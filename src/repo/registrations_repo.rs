use crate::domain::member::{EventRegistration, RegistrationStatus};
use anyhow::{anyhow, Result};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

pub struct NewRegistration {
    pub id: Uuid,
    pub event_id: String,
    pub member_id: Option<Uuid>,
    pub participant_full_name: String,
    pub participant_document_id: String,
    pub participant_email: String,
}

#[derive(Clone)]
pub struct RegistrationsRepo {
    pub pool: PgPool,
}

impl RegistrationsRepo {
    pub async fn insert_pending_tx(tx: &mut Transaction<'_, Postgres>, reg: &NewRegistration) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO event_registrations (
                id, event_id, member_id, participant_full_name, participant_document_id, participant_email, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(reg.id)
        .bind(&reg.event_id)
        .bind(reg.member_id)
        .bind(&reg.participant_full_name)
        .bind(&reg.participant_document_id)
        .bind(&reg.participant_email)
        .bind(RegistrationStatus::Pending.as_str())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<EventRegistration>> {
        let row = sqlx::query(
            r#"
            SELECT id, event_id, member_id, participant_full_name, participant_document_id,
                   participant_email, status, created_at
            FROM event_registrations WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };
        Ok(Some(EventRegistration {
            id: r.get("id"),
            event_id: r.get("event_id"),
            member_id: r.get("member_id"),
            participant_full_name: r.get("participant_full_name"),
            participant_document_id: r.get("participant_document_id"),
            participant_email: r.get("participant_email"),
            status: parse_status(r.get("status"))?,
            created_at: r.get("created_at"),
        }))
    }

    /// Latest registration of a participant for an event, with its member link.
    pub async fn latest_for_participant(
        &self,
        event_id: &str,
        document_id: &str,
    ) -> Result<Option<(Uuid, Option<Uuid>)>> {
        let row = sqlx::query(
            r#"
            SELECT id, member_id FROM event_registrations
            WHERE event_id = $1 AND participant_document_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| (r.get("id"), r.get("member_id"))))
    }

    pub async fn mark_confirmed_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE event_registrations SET status = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(RegistrationStatus::Confirmed.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn mark_payment_failed_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        payment_id: Uuid,
        payment_created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE event_registrations SET status = $4, updated_at = now()
            WHERE id = $1 AND status = $5
              AND NOT EXISTS (
                  SELECT 1 FROM payments p
                  WHERE p.event_registration_id = $1 AND p.id <> $2 AND p.created_at > $3
              )
            "#,
        )
        .bind(id)
        .bind(payment_id)
        .bind(payment_created_at)
        .bind(RegistrationStatus::PaymentFailed.as_str())
        .bind(RegistrationStatus::Pending.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn status(&self, id: Uuid) -> Result<Option<RegistrationStatus>> {
        let row = sqlx::query("SELECT status FROM event_registrations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| parse_status(r.get("status"))).transpose()
    }

    pub async fn annotate(&self, id: Uuid, note: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE event_registrations
            SET notes = CASE WHEN notes = '' THEN $2::text ELSE notes || E'\n' || $2::text END, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(note)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_status(raw: String) -> Result<RegistrationStatus> {
    RegistrationStatus::parse(&raw).ok_or_else(|| anyhow!("unknown registration status {raw}"))
}
