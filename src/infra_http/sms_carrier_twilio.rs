use crate::domain_port::{SmsCarrier, SmsError};

/// Twilio Messages API carrier. One form POST per message, authenticated
/// with the account SID and token.
pub struct TwilioSmsCarrier {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSmsCarrier {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid,
            auth_token,
            from_number,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        )
    }
}

#[async_trait::async_trait]
impl SmsCarrier for TwilioSmsCarrier {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), SmsError> {
        let form = [
            ("To", phone_number),
            ("From", self.from_number.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| SmsError::Dispatch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Dispatch(format!(
                "twilio returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}
