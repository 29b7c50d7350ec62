use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod mock;
pub mod signature;
pub mod status;
pub mod stripe;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub name: String,
    pub unit_amount_minor: i64,
    pub quantity: i64,
}

impl LineItem {
    pub fn total_minor(&self) -> i64 {
        self.unit_amount_minor * self.quantity
    }
}

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub line_items: Vec<LineItem>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub client_reference_id: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub id: String,
    pub url: String,
}

/// Processor-side view of a checkout session. Only `status` and
/// `payment_status` feed status derivation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessorSession {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[async_trait::async_trait]
pub trait CheckoutProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_session(&self, request: &CreateSessionRequest) -> Result<CreatedSession>;

    async fn retrieve_session(&self, session_id: &str) -> Result<ProcessorSession>;

    async fn expire_session(&self, session_id: &str) -> Result<()>;
}
