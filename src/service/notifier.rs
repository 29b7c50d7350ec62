use anyhow::{bail, Result};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Transactional email over an HTTP API. Callers treat delivery as best-effort.
#[derive(Clone)]
pub struct Notifier {
    pub client: reqwest::Client,
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    pub timeout_ms: u64,
}

impl Notifier {
    /// `Ok(false)` when no API key is configured and nothing was sent.
    pub async fn send(&self, email: &Email) -> Result<bool> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!(to = %email.to, subject = %email.subject, "mail api key not configured; skipping");
            return Ok(false);
        };

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .json(&json!({
                "from": self.from,
                "to": [email.to],
                "subject": email.subject,
                "text": email.text,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "mail api returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            );
        }
        Ok(true)
    }
}

pub fn license_activation_email(to: &str, full_name: &str, license_code: Option<&str>) -> Email {
    let license_line = match license_code {
        Some(code) => format!("Tu licencia federativa ({code}) queda tramitada junto con la cuota."),
        None => "No has solicitado licencia federativa con esta alta.".to_string(),
    };
    Email {
        to: to.to_string(),
        subject: "Tu alta como socio está activa".to_string(),
        text: format!(
            "Hola {full_name},\n\nHemos recibido el pago de tu cuota y tu alta como socio ya está activa.\n{license_line}\n\n¡Nos vemos en el monte!\n"
        ),
    }
}

pub fn registration_confirmed_email(to: &str, full_name: &str, event_name: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Inscripción confirmada: {event_name}"),
        text: format!(
            "Hola {full_name},\n\nTu inscripción en \"{event_name}\" está confirmada. Recibirás la información práctica de la actividad unos días antes.\n"
        ),
    }
}

pub fn order_paid_email(to: &str, full_name: &str, total_minor: i64, currency: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: "Pedido confirmado".to_string(),
        text: format!(
            "Hola {full_name},\n\nHemos recibido el pago de tu pedido por {}.{:02} {}. Te avisaremos cuando puedas recogerlo en el local del Club.\n",
            total_minor / 100,
            total_minor % 100,
            currency.to_uppercase()
        ),
    }
}
