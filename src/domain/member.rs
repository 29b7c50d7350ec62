use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,
    Active,
    PaymentFailed,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Pending => "pending",
            MemberStatus::Active => "active",
            MemberStatus::PaymentFailed => "payment_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MemberStatus::Pending),
            "active" => Some(MemberStatus::Active),
            "payment_failed" => Some(MemberStatus::PaymentFailed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    PaymentFailed,
}

impl RegistrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::PaymentFailed => "payment_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RegistrationStatus::Pending),
            "confirmed" => Some(RegistrationStatus::Confirmed),
            "payment_failed" => Some(RegistrationStatus::PaymentFailed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    PaymentFailed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::PaymentFailed => "payment_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "payment_failed" => Some(OrderStatus::PaymentFailed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub document_id: String,
    pub birth_date: Option<chrono::NaiveDate>,
    pub phone: Option<String>,
    pub license_code: Option<String>,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventRegistration {
    pub id: Uuid,
    pub event_id: String,
    pub member_id: Option<Uuid>,
    pub participant_full_name: String,
    pub participant_document_id: String,
    pub participant_email: String,
    pub status: RegistrationStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderLine {
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_minor: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderLine>,
    pub total_minor: i64,
    pub currency: String,
    pub status: OrderStatus,
}

/// Profile fields a membership application asks to store. They travel in the
/// payment metadata and reach an existing member only once the payment
/// completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    pub full_name: String,
    pub document_id: String,
    pub birth_date: Option<chrono::NaiveDate>,
    pub phone: Option<String>,
    pub license_code: Option<String>,
}

const PROFILE_NAME: &str = "profile_full_name";
const PROFILE_DOCUMENT: &str = "profile_document_id";
const PROFILE_BIRTH_DATE: &str = "profile_birth_date";
const PROFILE_PHONE: &str = "profile_phone";
const PROFILE_LICENSE: &str = "profile_license_code";

impl MemberProfile {
    pub fn write_metadata(&self, metadata: &mut BTreeMap<String, String>) {
        metadata.insert(PROFILE_NAME.to_string(), self.full_name.clone());
        metadata.insert(PROFILE_DOCUMENT.to_string(), self.document_id.clone());
        if let Some(date) = self.birth_date {
            metadata.insert(PROFILE_BIRTH_DATE.to_string(), date.format("%Y-%m-%d").to_string());
        }
        if let Some(phone) = &self.phone {
            metadata.insert(PROFILE_PHONE.to_string(), phone.clone());
        }
        if let Some(code) = &self.license_code {
            metadata.insert(PROFILE_LICENSE.to_string(), code.clone());
        }
    }

    /// `None` unless both name and document id are present.
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Option<Self> {
        let full_name = metadata.get(PROFILE_NAME).filter(|s| !s.is_empty())?;
        let document_id = metadata.get(PROFILE_DOCUMENT).filter(|s| !s.is_empty())?;
        Some(Self {
            full_name: full_name.clone(),
            document_id: document_id.clone(),
            birth_date: metadata.get(PROFILE_BIRTH_DATE).and_then(|d| parse_iso_date(d)),
            phone: metadata.get(PROFILE_PHONE).cloned(),
            license_code: metadata.get(PROFILE_LICENSE).cloned(),
        })
    }
}

/// Government ID as stored and compared: uppercase, no spaces, dots or dashes.
pub fn normalize_document_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '.')
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Trims and collapses inner runs of whitespace.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain.
pub fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_iso_date(raw: &str) -> Option<chrono::NaiveDate> {
    let raw = raw.trim();
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_compare_after_normalization() {
        assert_eq!(normalize_document_id(" 12.345.678-z "), "12345678Z");
        assert_eq!(normalize_document_id("x1234567l"), "X1234567L");
    }

    #[test]
    fn names_and_emails_are_trimmed() {
        assert_eq!(normalize_name("  Ana   Ruiz "), "Ana Ruiz");
        assert_eq!(normalize_email(" Ana.Ruiz@Example.COM "), "ana.ruiz@example.com");
    }

    #[test]
    fn email_shape() {
        assert!(is_plausible_email("ana@club.es"));
        assert!(!is_plausible_email("ana@club"));
        assert!(!is_plausible_email("ana club@club.es"));
        assert!(!is_plausible_email("@club.es"));
    }

    #[test]
    fn statuses_parse_their_stored_form() {
        for status in [MemberStatus::Pending, MemberStatus::Active, MemberStatus::PaymentFailed] {
            assert_eq!(MemberStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RegistrationStatus::parse("confirmed"), Some(RegistrationStatus::Confirmed));
        assert_eq!(OrderStatus::parse("paid"), Some(OrderStatus::Paid));
        assert_eq!(OrderStatus::parse("confirmed"), None);
    }

    #[test]
    fn profile_survives_payment_metadata() {
        let profile = MemberProfile {
            full_name: "Ana Ruiz".to_string(),
            document_id: "12345678Z".to_string(),
            birth_date: chrono::NaiveDate::from_ymd_opt(1990, 5, 17),
            phone: None,
            license_code: Some("FEDME-A".to_string()),
        };
        let mut metadata = BTreeMap::new();
        metadata.insert("payment_type".to_string(), "membership".to_string());
        profile.write_metadata(&mut metadata);

        assert!(!metadata.contains_key("profile_phone"));
        assert_eq!(MemberProfile::from_metadata(&metadata), Some(profile));
        assert_eq!(MemberProfile::from_metadata(&BTreeMap::new()), None);
    }

    #[test]
    fn birth_dates_accept_date_or_timestamp() {
        let expected = chrono::NaiveDate::from_ymd_opt(1990, 5, 17);
        assert_eq!(parse_iso_date("1990-05-17"), expected);
        assert_eq!(parse_iso_date("1990-05-17T00:00:00.000Z"), expected);
        assert_eq!(parse_iso_date("17/05/1990"), None);
    }
}
