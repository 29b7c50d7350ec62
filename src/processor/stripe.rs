use crate::processor::{CheckoutProcessor, CreateSessionRequest, CreatedSession, ProcessorSession};
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

pub struct StripeProcessor {
    pub base_url: String,
    pub secret_key: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SessionCreated {
    id: String,
    url: Option<String>,
}

impl StripeProcessor {
    fn session_url(&self, suffix: &str) -> String {
        format!("{}/v1/checkout/sessions{}", self.base_url.trim_end_matches('/'), suffix)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = request
            .bearer_auth(&self.secret_key)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("stripe request timed out")
                } else {
                    anyhow!(e).context("stripe request failed")
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "stripe returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            );
        }
        Ok(resp)
    }
}

/// Stripe's form encoding for a checkout session.
pub fn session_form(request: &CreateSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("client_reference_id".to_string(), request.client_reference_id.clone()),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        form.push((format!("{prefix}[price_data][currency]"), request.currency.clone()));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount_minor.to_string(),
        ));
        form.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
    }
    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

#[async_trait::async_trait]
impl CheckoutProcessor for StripeProcessor {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> Result<CreatedSession> {
        let resp = self
            .send(self.client.post(self.session_url("")).form(&session_form(request)))
            .await?;
        let created: SessionCreated = resp.json().await.context("decoding stripe session")?;
        let url = created
            .url
            .ok_or_else(|| anyhow!("stripe session {} has no redirect url", created.id))?;
        Ok(CreatedSession { id: created.id, url })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<ProcessorSession> {
        let resp = self
            .send(self.client.get(self.session_url(&format!("/{session_id}"))))
            .await?;
        resp.json().await.context("decoding stripe session")
    }

    async fn expire_session(&self, session_id: &str) -> Result<()> {
        self.send(self.client.post(self.session_url(&format!("/{session_id}/expire"))))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::LineItem;
    use std::collections::BTreeMap;

    #[test]
    fn form_carries_items_and_metadata() {
        let mut metadata = BTreeMap::new();
        metadata.insert("payment_type".to_string(), "membership".to_string());
        let req = CreateSessionRequest {
            line_items: vec![LineItem {
                name: "Cuota de socio".to_string(),
                unit_amount_minor: 4000,
                quantity: 1,
            }],
            currency: "eur".to_string(),
            success_url: "https://club.example/ok".to_string(),
            cancel_url: "https://club.example/ko".to_string(),
            customer_email: Some("ana@example.com".to_string()),
            client_reference_id: "m-1".to_string(),
            metadata,
        };
        let form = session_form(&req);
        assert!(form.contains(&(
            "line_items[0][price_data][unit_amount]".to_string(),
            "4000".to_string()
        )));
        assert!(form.contains(&("metadata[payment_type]".to_string(), "membership".to_string())));
        assert!(form.contains(&("customer_email".to_string(), "ana@example.com".to_string())));
    }
}
