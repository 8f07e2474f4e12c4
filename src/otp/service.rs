use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;

use super::store::OtpStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    Email,
    Phone,
}

impl OtpChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Email => "email",
            OtpChannel::Phone => "phone",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Invalid {0} recipient")]
    InvalidRecipient(&'static str),

    #[error("No active code for this recipient")]
    Expired,

    #[error("Code does not match")]
    Mismatch,

    #[error("Code delivery failed: {0}")]
    Delivery(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Delivers a code to its recipient (SMS/email gateway)
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, channel: OtpChannel, recipient: &str, code: &str) -> anyhow::Result<()>;
}

/// Sender used when no delivery gateway is wired; never logs the code
pub struct LoggingOtpSender;

#[async_trait]
impl OtpSender for LoggingOtpSender {
    async fn send(&self, channel: OtpChannel, recipient: &str, _code: &str) -> anyhow::Result<()> {
        tracing::info!(channel = channel.as_str(), recipient = %recipient, "OTP issued");
        Ok(())
    }
}

pub struct OtpService {
    store: Arc<dyn OtpStore>,
    sender: Arc<dyn OtpSender>,
    ttl: Duration,
}

impl OtpService {
    pub fn new(store: Arc<dyn OtpStore>, sender: Arc<dyn OtpSender>, ttl: Duration) -> Self {
        Self { store, sender, ttl }
    }

    fn key(channel: OtpChannel, recipient: &str) -> String {
        format!("otp:{}:{}", channel.as_str(), recipient)
    }

    fn normalize(channel: OtpChannel, recipient: &str) -> Result<String, OtpError> {
        let recipient = recipient.trim();
        match channel {
            OtpChannel::Email => {
                let valid = recipient
                    .split_once('@')
                    .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
                if !valid {
                    return Err(OtpError::InvalidRecipient("email"));
                }
                Ok(recipient.to_ascii_lowercase())
            }
            OtpChannel::Phone => {
                let digits: String = recipient.chars().filter(|c| c.is_ascii_digit()).collect();
                let allowed = recipient
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-'));
                if !allowed || !(10..=15).contains(&digits.len()) {
                    return Err(OtpError::InvalidRecipient("phone"));
                }
                Ok(digits)
            }
        }
    }

    /// Generate, store and send a fresh 6-digit code, replacing any earlier one
    pub async fn issue(&self, channel: OtpChannel, recipient: &str) -> Result<(), OtpError> {
        let recipient = Self::normalize(channel, recipient)?;
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));

        self.store.put(&Self::key(channel, &recipient), &code, self.ttl).await?;
        self.sender
            .send(channel, &recipient, &code)
            .await
            .map_err(|e| OtpError::Delivery(e.to_string()))?;
        Ok(())
    }

    /// Check a code; a matching code is consumed
    pub async fn verify(&self, channel: OtpChannel, recipient: &str, code: &str) -> Result<(), OtpError> {
        let recipient = Self::normalize(channel, recipient)?;
        let key = Self::key(channel, &recipient);

        let stored = self.store.get(&key).await?.ok_or(OtpError::Expired)?;
        if stored != code.trim() {
            tracing::debug!(channel = channel.as_str(), "OTP mismatch");
            return Err(OtpError::Mismatch);
        }

        self.store.remove(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::store::InMemoryOtpStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingSender {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl OtpSender for CapturingSender {
        async fn send(&self, _channel: OtpChannel, recipient: &str, code: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push((recipient.to_string(), code.to_string()));
            Ok(())
        }
    }

    fn service(ttl: Duration) -> (OtpService, Arc<CapturingSender>) {
        let sender = Arc::new(CapturingSender::default());
        let service = OtpService::new(Arc::new(InMemoryOtpStore::new()), sender.clone(), ttl);
        (service, sender)
    }

    #[tokio::test]
    async fn test_issue_then_verify_consumes_code() {
        let (service, sender) = service(Duration::from_secs(60));
        service.issue(OtpChannel::Email, " Asha@Example.com ").await.unwrap();

        let (recipient, code) = sender.sent.lock().unwrap()[0].clone();
        assert_eq!(recipient, "asha@example.com");
        assert_eq!(code.len(), 6);

        service.verify(OtpChannel::Email, "asha@example.com", &code).await.unwrap();
        assert!(matches!(
            service.verify(OtpChannel::Email, "asha@example.com", &code).await,
            Err(OtpError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_wrong_code_is_rejected_and_kept() {
        let (service, sender) = service(Duration::from_secs(60));
        service.issue(OtpChannel::Phone, "+91 98765-43210").await.unwrap();
        let code = sender.sent.lock().unwrap()[0].1.clone();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        assert!(matches!(
            service.verify(OtpChannel::Phone, "919876543210", wrong).await,
            Err(OtpError::Mismatch)
        ));
        service.verify(OtpChannel::Phone, "919876543210", &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_code() {
        let (service, sender) = service(Duration::from_millis(20));
        service.issue(OtpChannel::Email, "a@b.co").await.unwrap();
        let code = sender.sent.lock().unwrap()[0].1.clone();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(matches!(
            service.verify(OtpChannel::Email, "a@b.co", &code).await,
            Err(OtpError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_invalid_recipients() {
        let (service, _) = service(Duration::from_secs(60));
        assert!(matches!(
            service.issue(OtpChannel::Email, "not-an-email").await,
            Err(OtpError::InvalidRecipient("email"))
        ));
        assert!(matches!(
            service.issue(OtpChannel::Phone, "12ab").await,
            Err(OtpError::InvalidRecipient("phone"))
        ));
    }
}
