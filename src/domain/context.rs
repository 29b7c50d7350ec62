use crate::catalog::Catalog;
use crate::domain::error::ServiceError;
use crate::domain::member::{
    is_plausible_email, normalize_document_id, normalize_email, normalize_name, parse_iso_date,
    MemberProfile, OrderLine,
};
use crate::domain::payment::{
    CheckoutRequest, EventCheckoutRequest, MembershipCheckoutRequest, OrderCheckoutRequest,
    PaymentLink,
};
use crate::processor::LineItem;
use std::collections::BTreeMap;

pub const MAX_ORDER_LINES: usize = 20;
pub const MAX_LINE_QUANTITY: i64 = 20;

#[derive(Debug, Clone)]
pub struct LicenseChoice {
    pub code: String,
    pub name: String,
    pub fee_minor: i64,
}

#[derive(Debug, Clone)]
pub struct MembershipApplication {
    pub full_name: String,
    pub email: String,
    pub document_id: String,
    pub birth_date: Option<chrono::NaiveDate>,
    pub phone: Option<String>,
    pub license: Option<LicenseChoice>,
}

impl MembershipApplication {
    pub fn profile(&self) -> MemberProfile {
        MemberProfile {
            full_name: self.full_name.clone(),
            document_id: self.document_id.clone(),
            birth_date: self.birth_date,
            phone: self.phone.clone(),
            license_code: self.license.as_ref().map(|l| l.code.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSignup {
    pub event_id: String,
    pub event_name: String,
    pub fee_minor: i64,
    pub full_name: String,
    pub email: String,
    pub document_id: String,
}

#[derive(Debug, Clone)]
pub struct MerchOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub lines: Vec<OrderLine>,
}

/// A checkout request after validation and server-side pricing lookups.
#[derive(Debug, Clone)]
pub enum CheckoutContext {
    Membership(MembershipApplication),
    Event(EventSignup),
    Order(MerchOrder),
}

impl CheckoutContext {
    pub fn customer_email(&self) -> &str {
        match self {
            CheckoutContext::Membership(m) => &m.email,
            CheckoutContext::Event(e) => &e.email,
            CheckoutContext::Order(o) => &o.customer_email,
        }
    }

    pub fn document_id(&self) -> Option<&str> {
        match self {
            CheckoutContext::Membership(m) => Some(&m.document_id),
            CheckoutContext::Event(e) => Some(&e.document_id),
            CheckoutContext::Order(_) => None,
        }
    }

    pub fn line_items(&self, membership_fee_minor: i64) -> Vec<LineItem> {
        match self {
            CheckoutContext::Membership(m) => {
                let mut items = vec![LineItem {
                    name: "Cuota anual de socio".to_string(),
                    unit_amount_minor: membership_fee_minor,
                    quantity: 1,
                }];
                if let Some(license) = &m.license {
                    items.push(LineItem {
                        name: license.name.clone(),
                        unit_amount_minor: license.fee_minor,
                        quantity: 1,
                    });
                }
                items
            }
            CheckoutContext::Event(e) => vec![LineItem {
                name: format!("Inscripción: {}", e.event_name),
                unit_amount_minor: e.fee_minor,
                quantity: 1,
            }],
            CheckoutContext::Order(o) => o
                .lines
                .iter()
                .map(|l| LineItem {
                    name: l.name.clone(),
                    unit_amount_minor: l.unit_price_minor,
                    quantity: l.quantity,
                })
                .collect(),
        }
    }
}

pub fn total_minor(items: &[LineItem]) -> i64 {
    items.iter().map(LineItem::total_minor).sum()
}

/// Metadata sent to the processor and mirrored on the payment row.
pub fn checkout_metadata(
    link: PaymentLink,
    customer_email: &str,
    document_id: Option<&str>,
) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("payment_type".to_string(), link.payment_type().as_str().to_string());
    let key = match link {
        PaymentLink::Membership(_) => "member_id",
        PaymentLink::Event(_) => "event_registration_id",
        PaymentLink::Order(_) => "order_id",
    };
    metadata.insert(key.to_string(), link.entity_id().to_string());
    metadata.insert("customer_email".to_string(), customer_email.to_string());
    if let Some(doc) = document_id {
        metadata.insert("document_id".to_string(), doc.to_string());
    }
    metadata
}

pub fn build_context(req: CheckoutRequest, catalog: &Catalog) -> Result<CheckoutContext, ServiceError> {
    match req {
        CheckoutRequest::Membership(m) => validate_membership(m, catalog).map(CheckoutContext::Membership),
        CheckoutRequest::Event(e) => validate_event(e, catalog).map(CheckoutContext::Event),
        CheckoutRequest::Order(o) => validate_order(o, catalog).map(CheckoutContext::Order),
    }
}

fn validate_membership(
    req: MembershipCheckoutRequest,
    catalog: &Catalog,
) -> Result<MembershipApplication, ServiceError> {
    let full_name = required_name(req.full_name.as_deref(), "fullName")?;
    let email = required_email(req.email.as_deref(), "email")?;
    let document_id = required_document(req.document_id.as_deref(), "documentId")?;

    let birth_date = match non_blank(req.birth_date_iso.as_deref()) {
        Some(raw) => Some(
            parse_iso_date(raw)
                .ok_or_else(|| ServiceError::validation("birthDateISO must be an ISO date"))?,
        ),
        None => None,
    };

    let license = match non_blank(req.license_code.as_deref()) {
        Some(code) => {
            let found = catalog
                .license(code)
                .ok_or_else(|| ServiceError::validation(format!("unknown license type {code}")))?;
            Some(LicenseChoice {
                code: found.code.clone(),
                name: found.name.clone(),
                fee_minor: found.fee_minor,
            })
        }
        None => None,
    };

    Ok(MembershipApplication {
        full_name,
        email,
        document_id,
        birth_date,
        phone: non_blank(req.phone.as_deref()).map(str::to_string),
        license,
    })
}

fn validate_event(req: EventCheckoutRequest, catalog: &Catalog) -> Result<EventSignup, ServiceError> {
    let event_id = non_blank(req.event_id.as_deref())
        .ok_or_else(|| ServiceError::validation("eventId is required"))?;
    let full_name = required_name(req.full_name.as_deref(), "fullName")?;
    let email = required_email(req.email.as_deref(), "email")?;
    let document_id = required_document(req.document_id.as_deref(), "documentId")?;

    let event = catalog
        .event(event_id)
        .ok_or_else(|| ServiceError::validation(format!("unknown event {event_id}")))?;

    Ok(EventSignup {
        event_id: event.id.clone(),
        event_name: event.name.clone(),
        fee_minor: event.fee_minor,
        full_name,
        email,
        document_id,
    })
}

fn validate_order(req: OrderCheckoutRequest, catalog: &Catalog) -> Result<MerchOrder, ServiceError> {
    let customer_name = required_name(req.customer_name.as_deref(), "customerName")?;
    let customer_email = required_email(req.customer_email.as_deref(), "customerEmail")?;

    if req.items.is_empty() {
        return Err(ServiceError::validation("order must contain at least one item"));
    }
    if req.items.len() > MAX_ORDER_LINES {
        return Err(ServiceError::validation(format!(
            "order may contain at most {MAX_ORDER_LINES} lines"
        )));
    }

    let mut lines: Vec<OrderLine> = Vec::new();
    for item in &req.items {
        let sku = non_blank(item.sku.as_deref())
            .ok_or_else(|| ServiceError::validation("every item needs a sku"))?;
        let quantity = item.quantity.unwrap_or(1);
        if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
            return Err(ServiceError::validation(format!(
                "quantity for {sku} must be between 1 and {MAX_LINE_QUANTITY}"
            )));
        }
        let product = catalog
            .product(sku)
            .ok_or_else(|| ServiceError::validation(format!("unknown product {sku}")))?;

        match lines.iter_mut().find(|l| l.sku == product.sku) {
            Some(existing) => {
                existing.quantity += quantity;
                if existing.quantity > MAX_LINE_QUANTITY {
                    return Err(ServiceError::validation(format!(
                        "quantity for {sku} must be between 1 and {MAX_LINE_QUANTITY}"
                    )));
                }
            }
            None => lines.push(OrderLine {
                sku: product.sku.clone(),
                name: product.name.clone(),
                quantity,
                unit_price_minor: product.price_minor,
            }),
        }
    }

    Ok(MerchOrder {
        customer_name,
        customer_email,
        lines,
    })
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn required_name(value: Option<&str>, field: &str) -> Result<String, ServiceError> {
    non_blank(value)
        .map(normalize_name)
        .ok_or_else(|| ServiceError::validation(format!("{field} is required")))
}

pub(crate) fn required_document(value: Option<&str>, field: &str) -> Result<String, ServiceError> {
    let normalized = value.map(normalize_document_id).unwrap_or_default();
    if normalized.is_empty() {
        return Err(ServiceError::validation(format!("{field} is required")));
    }
    Ok(normalized)
}

fn required_email(value: Option<&str>, field: &str) -> Result<String, ServiceError> {
    let email = non_blank(value)
        .map(normalize_email)
        .ok_or_else(|| ServiceError::validation(format!("{field} is required")))?;
    if !is_plausible_email(&email) {
        return Err(ServiceError::validation(format!("{field} is not a valid email")));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentType;
    use uuid::Uuid;

    #[test]
    fn metadata_names_the_linked_entity() {
        let id = Uuid::new_v4();
        let md = checkout_metadata(PaymentLink::Event(id), "ana@example.com", Some("12345678Z"));
        assert_eq!(md.get("payment_type").map(String::as_str), Some(PaymentType::Event.as_str()));
        assert_eq!(md.get("event_registration_id"), Some(&id.to_string()));
        assert_eq!(md.get("document_id").map(String::as_str), Some("12345678Z"));
        assert!(!md.contains_key("member_id"));
    }

    #[test]
    fn blank_strings_count_as_missing() {
        assert_eq!(non_blank(Some("   ")), None);
        assert!(required_document(Some(" - "), "documentId").is_err());
    }
}
