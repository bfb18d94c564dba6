use super::token_namespace::TokenNamespace;
use crate::application_port::{AuthError, OtpIssued};
use crate::domain_model::{OtpSession, OtpSessionId};
use crate::domain_port::{SmsCarrier, TokenStore};
use crate::logger::*;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;

const CODE_ALPHABET: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
const CODE_LEN: usize = 6;

/// Phone-verification sessions. Codes are held only as a keyed digest; the
/// plaintext exists in the SMS and nowhere else.
pub struct OtpSessionManager {
    sessions: TokenNamespace<OtpSession>,
    carrier: Arc<dyn SmsCarrier>,
    digest_key: Vec<u8>,
}

impl OtpSessionManager {
    pub fn new(
        store: Arc<dyn TokenStore>,
        ttl: Duration,
        digest_key: Vec<u8>,
        carrier: Arc<dyn SmsCarrier>,
    ) -> Self {
        Self {
            sessions: TokenNamespace::new(store, "smsAuth", ttl),
            carrier,
            digest_key,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.sessions.ttl()
    }

    fn new_code() -> String {
        nanoid::nanoid!(CODE_LEN, &CODE_ALPHABET)
    }

    fn digest_hex(&self, code: &str) -> Result<String, AuthError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.digest_key)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        mac.update(code.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Issues a session and dispatches the code. Dispatch failure leaves the
    /// session valid; the caller only sees `delivery_ok = false`.
    pub async fn create(&self, phone_number: &str) -> Result<OtpIssued, AuthError> {
        let code = Self::new_code();
        let session = OtpSession {
            code_digest: self.digest_hex(&code)?,
            phone_number: phone_number.to_string(),
            verified: false,
        };
        let id = self.sessions.issue(&session).await?;

        let message = format!("verification code: {code}");
        let delivery_ok = match self.carrier.send(phone_number, &message).await {
            Ok(()) => true,
            Err(err) => {
                warn!("sms dispatch failed: {err}");
                false
            }
        };

        Ok(OtpIssued {
            otp_session_id: OtpSessionId(id),
            ttl: self.ttl(),
            delivery_ok,
        })
    }

    /// Checks the submitted code and phone number against the session.
    /// `consume = true` destroys the session on success; `consume = false`
    /// marks it verified in place, keeping its original deadline, as proof
    /// for a follow-up request.
    pub async fn validate(
        &self,
        otp_session_id: &OtpSessionId,
        phone_number: &str,
        code: &str,
        consume: bool,
    ) -> Result<(), AuthError> {
        let id = &otp_session_id.0;
        let Some(mut session) = self.sessions.get(id).await? else {
            return Err(AuthError::InvalidOtp);
        };

        if session.code_digest != self.digest_hex(code)? || session.phone_number != phone_number {
            return Err(AuthError::InvalidOtp);
        }

        if consume {
            self.sessions.remove(id).await?;
        } else if !session.verified {
            session.verified = true;
            // Losing the race against expiry invalidates the proof.
            if !self.sessions.update_keep_ttl(id, &session).await? {
                return Err(AuthError::InvalidOtp);
            }
        }
        Ok(())
    }

    /// One-time gate for the dependent flows: atomically consumes the session
    /// and passes only if it was verified for this phone number.
    pub async fn take_verified(
        &self,
        otp_session_id: &OtpSessionId,
        phone_number: &str,
    ) -> Result<(), AuthError> {
        match self.sessions.take(&otp_session_id.0).await? {
            Some(session) if session.verified && session.phone_number == phone_number => Ok(()),
            _ => Err(AuthError::InvalidOtp),
        }
    }
}
