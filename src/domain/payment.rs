use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Membership,
    Event,
    Order,
}

impl PaymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentType::Membership => "membership",
            PaymentType::Event => "event",
            PaymentType::Order => "order",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "membership" => Some(PaymentType::Membership),
            "event" => Some(PaymentType::Event),
            "order" => Some(PaymentType::Order),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// The single domain entity a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentLink {
    Membership(Uuid),
    Event(Uuid),
    Order(Uuid),
}

impl PaymentLink {
    pub fn payment_type(self) -> PaymentType {
        match self {
            PaymentLink::Membership(_) => PaymentType::Membership,
            PaymentLink::Event(_) => PaymentType::Event,
            PaymentLink::Order(_) => PaymentType::Order,
        }
    }

    pub fn entity_id(self) -> Uuid {
        match self {
            PaymentLink::Membership(id) | PaymentLink::Event(id) | PaymentLink::Order(id) => id,
        }
    }

    pub fn member_id(self) -> Option<Uuid> {
        match self {
            PaymentLink::Membership(id) => Some(id),
            _ => None,
        }
    }

    pub fn event_registration_id(self) -> Option<Uuid> {
        match self {
            PaymentLink::Event(id) => Some(id),
            _ => None,
        }
    }

    pub fn order_id(self) -> Option<Uuid> {
        match self {
            PaymentLink::Order(id) => Some(id),
            _ => None,
        }
    }

    /// Rebuilds the link from stored columns; `None` when the row does not carry
    /// exactly the column its type requires.
    pub fn from_columns(
        payment_type: PaymentType,
        member_id: Option<Uuid>,
        event_registration_id: Option<Uuid>,
        order_id: Option<Uuid>,
    ) -> Option<Self> {
        match (payment_type, member_id, event_registration_id, order_id) {
            (PaymentType::Membership, Some(id), None, None) => Some(PaymentLink::Membership(id)),
            (PaymentType::Event, None, Some(id), None) => Some(PaymentLink::Event(id)),
            (PaymentType::Order, None, None, Some(id)) => Some(PaymentLink::Order(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub payment_type: PaymentType,
    pub external_session_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub member_id: Option<Uuid>,
    pub event_registration_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub metadata: BTreeMap<String, String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl PaymentRecord {
    pub fn link(&self) -> Option<PaymentLink> {
        PaymentLink::from_columns(
            self.payment_type,
            self.member_id,
            self.event_registration_id,
            self.order_id,
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipCheckoutRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default, rename = "birthDateISO")]
    pub birth_date_iso: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub license_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCheckoutRequest {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCheckoutRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CheckoutRequest {
    Membership(MembershipCheckoutRequest),
    Event(EventCheckoutRequest),
    Order(OrderCheckoutRequest),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub session_id: String,
    pub payment_id: Uuid,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub amount_minor: i64,
    pub currency: String,
    pub member_id: Option<Uuid>,
    pub event_registration_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub domain_status: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub status: PaymentStatus,
    pub already_processed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_requires_exactly_the_matching_column() {
        let id = Uuid::new_v4();
        assert_eq!(
            PaymentLink::from_columns(PaymentType::Membership, Some(id), None, None),
            Some(PaymentLink::Membership(id))
        );
        assert_eq!(
            PaymentLink::from_columns(PaymentType::Event, Some(id), Some(id), None),
            None
        );
        assert_eq!(PaymentLink::from_columns(PaymentType::Order, None, None, None), None);
    }

    #[test]
    fn checkout_request_is_tagged_by_type() {
        let req: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "type": "event",
            "eventId": "E1",
            "fullName": "Ana Ruiz",
            "email": "ana@example.com",
            "documentId": "12345678Z"
        }))
        .unwrap();
        match req {
            CheckoutRequest::Event(ev) => assert_eq!(ev.event_id.as_deref(), Some("E1")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
