use crate::domain::waiver::{AcceptanceSummary, WaiverAcceptance};
use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const ACCEPTANCE_COLUMNS: &str = "id, event_id, participant_full_name, participant_document_id, \
     participant_birth_date, waiver_version, waiver_text_raw, waiver_text_canonical, waiver_text_hash, \
     accepted_at, ip_address, user_agent, member_id, event_registration_id";

#[derive(Clone)]
pub struct WaiverAcceptancesRepo {
    pub pool: PgPool,
}

impl WaiverAcceptancesRepo {
    /// Single INSERT; a duplicate participant/event/version surfaces as a
    /// unique violation from the database.
    pub async fn insert(&self, a: &WaiverAcceptance) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO waiver_acceptances (
                id, event_id, participant_full_name, participant_document_id, participant_birth_date,
                waiver_version, waiver_text_raw, waiver_text_canonical, waiver_text_hash,
                accepted_at, ip_address, user_agent, member_id, event_registration_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(a.id)
        .bind(&a.event_id)
        .bind(&a.participant_full_name)
        .bind(&a.participant_document_id)
        .bind(a.participant_birth_date)
        .bind(&a.waiver_version)
        .bind(&a.waiver_text_raw)
        .bind(&a.waiver_text_canonical)
        .bind(&a.waiver_text_hash)
        .bind(a.accepted_at)
        .bind(&a.ip_address)
        .bind(&a.user_agent)
        .bind(a.member_id)
        .bind(a.event_registration_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<WaiverAcceptance>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCEPTANCE_COLUMNS} FROM waiver_acceptances WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(to_acceptance))
    }

    pub async fn latest_for_member(&self, event_id: &str, member_id: Uuid) -> Result<Option<WaiverAcceptance>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ACCEPTANCE_COLUMNS} FROM waiver_acceptances
            WHERE event_id = $1 AND member_id = $2
            ORDER BY accepted_at DESC
            LIMIT 1
            "#
        ))
        .bind(event_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(to_acceptance))
    }

    pub async fn latest_for_document(
        &self,
        event_id: &str,
        document_id: &str,
    ) -> Result<Option<WaiverAcceptance>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ACCEPTANCE_COLUMNS} FROM waiver_acceptances
            WHERE event_id = $1 AND participant_document_id = $2
            ORDER BY accepted_at DESC
            LIMIT 1
            "#
        ))
        .bind(event_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(to_acceptance))
    }

    pub async fn list_by_event(&self, event_id: &str, limit: i64) -> Result<Vec<AcceptanceSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_id, participant_full_name, participant_document_id, waiver_version,
                   waiver_text_hash, accepted_at, member_id, event_registration_id
            FROM waiver_acceptances
            WHERE event_id = $1
            ORDER BY accepted_at DESC
            LIMIT $2
            "#,
        )
        .bind(event_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| AcceptanceSummary {
                id: r.get("id"),
                event_id: r.get("event_id"),
                participant_full_name: r.get("participant_full_name"),
                participant_document_id: r.get("participant_document_id"),
                waiver_version: r.get("waiver_version"),
                waiver_text_hash: r.get("waiver_text_hash"),
                accepted_at: r.get("accepted_at"),
                member_id: r.get("member_id"),
                event_registration_id: r.get("event_registration_id"),
            })
            .collect())
    }
}

fn to_acceptance(r: &PgRow) -> WaiverAcceptance {
    WaiverAcceptance {
        id: r.get("id"),
        event_id: r.get("event_id"),
        participant_full_name: r.get("participant_full_name"),
        participant_document_id: r.get("participant_document_id"),
        participant_birth_date: r.get("participant_birth_date"),
        waiver_version: r.get("waiver_version"),
        waiver_text_raw: r.get("waiver_text_raw"),
        waiver_text_canonical: r.get("waiver_text_canonical"),
        waiver_text_hash: r.get("waiver_text_hash"),
        accepted_at: r.get("accepted_at"),
        ip_address: r.get("ip_address"),
        user_agent: r.get("user_agent"),
        member_id: r.get("member_id"),
        event_registration_id: r.get("event_registration_id"),
    }
}
