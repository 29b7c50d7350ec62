use crate::domain::context::MerchOrder;
use crate::domain::member::{Order, OrderLine, OrderStatus};
use anyhow::{anyhow, Result};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Clone)]
pub struct OrdersRepo {
    pub pool: PgPool,
}

impl OrdersRepo {
    pub async fn insert_pending_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        order: &MerchOrder,
        total_minor: i64,
        currency: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_name, customer_email, items, total_minor, currency, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(serde_json::to_value(&order.lines)?)
        .bind(total_minor)
        .bind(currency)
        .bind(OrderStatus::Pending.as_str())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, customer_name, customer_email, items, total_minor, currency, status FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };
        let items: serde_json::Value = r.get("items");
        Ok(Some(Order {
            id: r.get("id"),
            customer_name: r.get("customer_name"),
            customer_email: r.get("customer_email"),
            items: serde_json::from_value::<Vec<OrderLine>>(items)?,
            total_minor: r.get("total_minor"),
            currency: r.get("currency"),
            status: parse_status(r.get("status"))?,
        }))
    }

    pub async fn mark_paid_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(OrderStatus::Paid.as_str())
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
            UPDATE orders SET status = $4, updated_at = now()
            WHERE id = $1 AND status = $5
              AND NOT EXISTS (
                  SELECT 1 FROM payments p
                  WHERE p.order_id = $1 AND p.id <> $2 AND p.created_at > $3
              )
            "#,
        )
        .bind(id)
        .bind(payment_id)
        .bind(payment_created_at)
        .bind(OrderStatus::PaymentFailed.as_str())
        .bind(OrderStatus::Pending.as_str())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn status(&self, id: Uuid) -> Result<Option<OrderStatus>> {
        let row = sqlx::query("SELECT status FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| parse_status(r.get("status"))).transpose()
    }

    pub async fn annotate(&self, id: Uuid, note: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
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

fn parse_status(raw: String) -> Result<OrderStatus> {
    OrderStatus::parse(&raw).ok_or_else(|| anyhow!("unknown order status {raw}"))
}
