use crate::processor::{CheckoutProcessor, CreateSessionRequest, CreatedSession, ProcessorSession};
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-process processor for local runs and tests.
///
/// `behavior` is `OPEN` (sessions wait for payment), `AUTO_COMPLETE` (sessions
/// are paid on creation) or `ALWAYS_FAILURE` (session creation errors).
pub struct MockProcessor {
    pub behavior: String,
    pub base_url: String,
    sessions: Mutex<HashMap<String, ProcessorSession>>,
}

impl MockProcessor {
    pub fn new(behavior: &str, base_url: &str) -> Self {
        Self {
            behavior: behavior.to_uppercase(),
            base_url: base_url.trim_end_matches('/').to_string(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Overwrites the processor-side state of a session.
    pub fn set_state(&self, session_id: &str, status: &str, payment_status: &str) -> Result<()> {
        let mut sessions = self.lock()?;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| anyhow!("mock session {session_id} not found"))?;
        session.status = Some(status.to_string());
        session.payment_status = Some(payment_status.to_string());
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, ProcessorSession>>> {
        self.sessions
            .lock()
            .map_err(|_| anyhow!("mock processor state poisoned"))
    }
}

#[async_trait::async_trait]
impl CheckoutProcessor for MockProcessor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> Result<CreatedSession> {
        if self.behavior == "ALWAYS_FAILURE" {
            bail!("mock processor declined session creation");
        }

        let id = format!("cs_mock_{}", uuid::Uuid::new_v4().simple());
        let url = format!("{}/mock-checkout/{}", self.base_url, id);
        let (status, payment_status) = if self.behavior == "AUTO_COMPLETE" {
            ("complete", "paid")
        } else {
            ("open", "unpaid")
        };

        self.lock()?.insert(
            id.clone(),
            ProcessorSession {
                id: id.clone(),
                status: Some(status.to_string()),
                payment_status: Some(payment_status.to_string()),
                metadata: request.metadata.clone(),
                url: Some(url.clone()),
            },
        );
        Ok(CreatedSession { id, url })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<ProcessorSession> {
        self.lock()?
            .get(session_id)
            .cloned()
            .ok_or_else(|| anyhow!("mock session {session_id} not found"))
    }

    async fn expire_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.lock()?;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| anyhow!("mock session {session_id} not found"))?;
        if session.status.as_deref() != Some("open") {
            bail!("only open sessions can be expired");
        }
        session.status = Some("expired".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request() -> CreateSessionRequest {
        CreateSessionRequest {
            line_items: Vec::new(),
            currency: "eur".to_string(),
            success_url: "ok".to_string(),
            cancel_url: "ko".to_string(),
            customer_email: None,
            client_reference_id: "ref".to_string(),
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn created_sessions_start_open() {
        let mock = MockProcessor::new("open", "http://localhost");
        let created = mock.create_session(&request()).await.unwrap();
        let session = mock.retrieve_session(&created.id).await.unwrap();
        assert_eq!(session.status.as_deref(), Some("open"));
        assert_eq!(session.payment_status.as_deref(), Some("unpaid"));
    }

    #[tokio::test]
    async fn expire_only_applies_to_open_sessions() {
        let mock = MockProcessor::new("AUTO_COMPLETE", "http://localhost");
        let created = mock.create_session(&request()).await.unwrap();
        assert!(mock.expire_session(&created.id).await.is_err());
    }

    #[tokio::test]
    async fn failure_behavior_rejects_creation() {
        let mock = MockProcessor::new("ALWAYS_FAILURE", "http://localhost");
        assert!(mock.create_session(&request()).await.is_err());
        assert_eq!(mock.session_count(), 0);
    }
}
