use crate::domain_port::{SmsCarrier, SmsError};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct SentSms {
    pub phone_number: String,
    pub message: String,
}

/// Carrier double that records every dispatch attempt instead of sending.
/// Attempts to the sentinel number are recorded and then fail, matching a
/// carrier that accepts the request but cannot deliver.
#[derive(Debug)]
pub struct FakeSmsCarrier {
    sent: Mutex<Vec<SentSms>>,
}

impl FakeSmsCarrier {
    pub const UNDELIVERABLE: &'static str = "01099999999";

    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn last_message(&self) -> Option<String> {
        self.sent
            .lock()
            .ok()
            .and_then(|sent| sent.last().map(|sms| sms.message.clone()))
    }
}

#[async_trait::async_trait]
impl SmsCarrier for FakeSmsCarrier {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentSms {
                phone_number: phone_number.to_string(),
                message: message.to_string(),
            });
        }
        if phone_number == Self::UNDELIVERABLE {
            return Err(SmsError::Dispatch("recipient unreachable".to_string()));
        }
        Ok(())
    }
}
