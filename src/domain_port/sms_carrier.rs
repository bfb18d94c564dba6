#[async_trait::async_trait]
pub trait SmsCarrier: Send + Sync {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("sms dispatch failed: {0}")]
    Dispatch(String),
}
