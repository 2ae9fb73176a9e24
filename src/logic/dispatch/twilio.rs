//! Twilio WhatsApp client
//!
//! Sends operator alerts through the Twilio Messages API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{DispatchError, MessagingProvider};
use crate::config::TwilioConfig;

const WHATSAPP_PREFIX: &str = "whatsapp:";

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: Option<i64>,
    message: Option<String>,
}

pub struct TwilioWhatsApp {
    config: TwilioConfig,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl TwilioWhatsApp {
    pub fn new(config: TwilioConfig, timeout: Duration) -> Result<Self, DispatchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Network(e.to_string()))?;

        Ok(Self {
            config,
            timeout,
            http_client,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

/// Twilio expects `whatsapp:+<E.164>` on both ends
pub fn whatsapp_address(destination: &str) -> String {
    if destination.starts_with(WHATSAPP_PREFIX) {
        destination.to_string()
    } else {
        format!("{}{}", WHATSAPP_PREFIX, destination)
    }
}

#[async_trait]
impl MessagingProvider for TwilioWhatsApp {
    fn name(&self) -> &'static str {
        "twilio-whatsapp"
    }

    async fn send(&self, destination: &str, body: &str) -> Result<String, DispatchError> {
        let from = whatsapp_address(&self.config.from);
        let to = whatsapp_address(destination);
        let params = [("From", from.as_str()), ("To", to.as_str()), ("Body", body)];

        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout(self.timeout.as_secs())
                } else {
                    DispatchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| DispatchError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(rejection(status.as_u16(), &text));
        }

        let parsed: MessageResponse =
            serde_json::from_str(&text).map_err(|e| DispatchError::InvalidResponse(e.to_string()))?;
        parsed
            .sid
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| DispatchError::InvalidResponse("missing message sid".to_string()))
    }
}

fn rejection(status: u16, body: &str) -> DispatchError {
    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { code: Some(code), message: Some(message) }) => format!("{} (code {})", message, code),
        Ok(ErrorResponse { message: Some(message), .. }) => message,
        _ if body.trim().is_empty() => "empty response".to_string(),
        _ => body.trim().to_string(),
    };
    DispatchError::Rejected { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "secret".into(),
            from: "whatsapp:+14155238886".into(),
            base_url: base_url.into(),
        }
    }

    #[test]
    fn test_whatsapp_address() {
        assert_eq!(whatsapp_address("+6587654321"), "whatsapp:+6587654321");
        assert_eq!(whatsapp_address("whatsapp:+6587654321"), "whatsapp:+6587654321");
    }

    #[test]
    fn test_messages_url() {
        let client = TwilioWhatsApp::new(config("https://api.twilio.com/"), Duration::from_secs(5)).unwrap();
        assert_eq!(client.messages_url(), "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json");
    }

    #[test]
    fn test_rejection_message() {
        let err = rejection(400, r#"{"code":21211,"message":"Invalid 'To' Phone Number","status":400}"#);
        assert_eq!(
            err.to_string(),
            "provider rejected message (400): Invalid 'To' Phone Number (code 21211)"
        );

        let err = rejection(401, "");
        assert_eq!(err.to_string(), "provider rejected message (401): empty response");

        let err = rejection(503, "Service Unavailable");
        assert_eq!(err.to_string(), "provider rejected message (503): Service Unavailable");
    }

    #[tokio::test]
    async fn test_network_failure_is_error() {
        let client = TwilioWhatsApp::new(config("http://127.0.0.1:9"), Duration::from_secs(2)).unwrap();
        let result = client.send("+6587654321", "hello").await;
        assert!(matches!(result, Err(DispatchError::Network(_)) | Err(DispatchError::Timeout(_))));
    }
}
