use crate::domain::context::MembershipApplication;
use crate::domain::member::{Member, MemberProfile, MemberStatus};
use anyhow::{anyhow, Result};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct MembersRepo {
    pub pool: PgPool,
}

impl MembersRepo {
    /// Creates the member as `pending`. When the email already belongs to a
    /// member, that row keeps its profile, license and status (a failed one
    /// goes back to `pending`); the application is applied by
    /// [`MembersRepo::mark_active_tx`] once paid. Returns the id actually
    /// stored, which differs from `id` when the email existed.
    pub async fn upsert_pending_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        app: &MembershipApplication,
    ) -> Result<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO members (id, full_name, email, document_id, birth_date, phone, license_code, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE SET
                status = CASE WHEN members.status = $9 THEN $8 ELSE members.status END,
                updated_at = now()
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&app.full_name)
        .bind(&app.email)
        .bind(&app.document_id)
        .bind(app.birth_date)
        .bind(&app.phone)
        .bind(app.license.as_ref().map(|l| l.code.clone()))
        .bind(MemberStatus::Pending.as_str())
        .bind(MemberStatus::PaymentFailed.as_str())
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.get("id"))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Member>> {
        let row = sqlx::query(
            "SELECT id, full_name, email, document_id, birth_date, phone, license_code, status FROM members WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };
        Ok(Some(Member {
            id: r.get("id"),
            full_name: r.get("full_name"),
            email: r.get("email"),
            document_id: r.get("document_id"),
            birth_date: r.get("birth_date"),
            phone: r.get("phone"),
            license_code: r.get("license_code"),
            status: parse_status(r.get("status"))?,
        }))
    }

    pub async fn find_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT id FROM members WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("id")))
    }

    pub async fn find_id_by_document(&self, document_id: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query(
            "SELECT id FROM members WHERE document_id = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("id")))
    }

    /// Activates the member and applies the profile the paid application
    /// carried. A license already held is kept when the application named none.
    pub async fn mark_active_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        profile: Option<&MemberProfile>,
    ) -> Result<()> {
        match profile {
            Some(p) => {
                sqlx::query(
                    r#"
                    UPDATE members SET
                        status = $2,
                        full_name = $3,
                        document_id = $4,
                        birth_date = COALESCE($5, birth_date),
                        phone = COALESCE($6, phone),
                        license_code = COALESCE($7, license_code),
                        updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(MemberStatus::Active.as_str())
                .bind(&p.full_name)
                .bind(&p.document_id)
                .bind(p.birth_date)
                .bind(&p.phone)
                .bind(&p.license_code)
                .execute(&mut **tx)
                .await?;
            }
            None => {
                sqlx::query("UPDATE members SET status = $2, updated_at = now() WHERE id = $1")
                    .bind(id)
                    .bind(MemberStatus::Active.as_str())
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Ok(())
    }

    /// Demotes a still-pending member unless a newer payment exists for it.
    pub async fn mark_payment_failed_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        payment_id: Uuid,
        payment_created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE members SET status = $4, updated_at = now()
            WHERE id = $1 AND status = $5
              AND NOT EXISTS (
                  SELECT 1 FROM payments p
                  WHERE p.member_id = $1 AND p.id <> $2 AND p.created_at > $3
              )
            "#,
        )
        .bind(id)
        .bind(payment_id)
        .bind(payment_created_at)
        .bind(MemberStatus::PaymentFailed.as_str())
        .bind(MemberStatus::Pending.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn status(&self, id: Uuid) -> Result<Option<MemberStatus>> {
        let row = sqlx::query("SELECT status FROM members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| parse_status(r.get("status"))).transpose()
    }

    pub async fn annotate(&self, id: Uuid, note: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE members
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

fn parse_status(raw: String) -> Result<MemberStatus> {
    MemberStatus::parse(&raw).ok_or_else(|| anyhow!("unknown member status {raw}"))
}
