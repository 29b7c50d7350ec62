use crate::domain::payment::{PaymentLink, PaymentRecord, PaymentStatus, PaymentType};
use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::BTreeMap;
use uuid::Uuid;

const PAYMENT_COLUMNS: &str = "id, payment_type, external_session_id, amount_minor, currency, status, \
     member_id, event_registration_id, order_id, metadata, created_at, updated_at";

pub struct NewPayment {
    pub id: Uuid,
    pub link: PaymentLink,
    pub external_session_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct PaymentsRepo {
    pub pool: PgPool,
}

impl PaymentsRepo {
    pub async fn insert_pending_tx(tx: &mut Transaction<'_, Postgres>, data: &NewPayment) -> Result<PaymentRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payments (
                id, payment_type, external_session_id, amount_minor, currency, status,
                member_id, event_registration_id, order_id, metadata
            ) VALUES ($1, $2, $3, $4, $5, $10, $6, $7, $8, $9)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(data.id)
        .bind(data.link.payment_type().as_str())
        .bind(&data.external_session_id)
        .bind(data.amount_minor)
        .bind(&data.currency)
        .bind(data.link.member_id())
        .bind(data.link.event_registration_id())
        .bind(data.link.order_id())
        .bind(serde_json::to_value(&data.metadata)?)
        .bind(PaymentStatus::Pending.as_str())
        .fetch_one(&mut **tx)
        .await?;

        to_record(&row)
    }

    pub async fn find_by_session(&self, external_session_id: &str) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_session_id = $1"
        ))
        .bind(external_session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(to_record).transpose()
    }

    /// Compare-and-set from `pending` to `next`. Returns the updated row, or
    /// `None` when the row was no longer pending.
    pub async fn transition_from_pending_tx(
        tx: &mut Transaction<'_, Postgres>,
        external_session_id: &str,
        next: PaymentStatus,
    ) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE payments
            SET status = $2, updated_at = now()
            WHERE external_session_id = $1 AND status = $3 AND $2 <> $3
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(external_session_id)
        .bind(next.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        row.as_ref().map(to_record).transpose()
    }

    pub async fn list_recent(&self, status: Option<PaymentStatus>, limit: i64) -> Result<Vec<PaymentRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(status.map(PaymentStatus::as_str))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(to_record).collect()
    }
}

fn to_record(r: &PgRow) -> Result<PaymentRecord> {
    let payment_type: String = r.get("payment_type");
    let status: String = r.get("status");
    let metadata: serde_json::Value = r.get("metadata");

    Ok(PaymentRecord {
        id: r.get("id"),
        payment_type: PaymentType::parse(&payment_type)
            .ok_or_else(|| anyhow!("unknown payment_type {payment_type}"))?,
        external_session_id: r.get("external_session_id"),
        amount_minor: r.get("amount_minor"),
        currency: r.get("currency"),
        status: PaymentStatus::parse(&status).ok_or_else(|| anyhow!("unknown payment status {status}"))?,
        member_id: r.get("member_id"),
        event_registration_id: r.get("event_registration_id"),
        order_id: r.get("order_id"),
        metadata: serde_json::from_value(metadata).unwrap_or_default(),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}
