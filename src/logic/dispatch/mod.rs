//! Notification Dispatch Module
//!
//! Decides whether an operator alert is sent and reports the outcome.
//!
//! Features:
//! - Risk / contact / opt-in gating before any provider call
//! - Bounded provider timeout, single attempt, no retries
//! - Cancellation checked right before the provider call
//!
//! A dispatch never fails the triage request: every failure becomes a
//! `DispatchOutcome` with `sent = false`.

pub mod twilio;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::triage::types::{DispatchOutcome, RiskLevel};

pub use twilio::TwilioWhatsApp;

// ============================================================================
// SKIP REASONS
// ============================================================================

pub const INFO_NO_FINDINGS: &str = "no findings";
pub const INFO_NOT_REQUESTED: &str = "not requested";
pub const INFO_RISK_BELOW_THRESHOLD: &str = "risk below threshold";
pub const INFO_NO_PHONE: &str = "no phone";
pub const INFO_NOT_CONFIGURED: &str = "messaging provider not configured";
pub const INFO_CANCELLED: &str = "cancelled";

// ============================================================================
// ERRORS
// ============================================================================

/// Messaging provider failures
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("provider call timed out after {0}s")]
    Timeout(u64),
    #[error("malformed provider response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// External messaging channel
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send `body` to the normalized destination, returning the provider message id
    async fn send(&self, destination: &str, body: &str) -> Result<String, DispatchError>;
}

// ============================================================================
// DISPATCH REQUEST
// ============================================================================

/// Inputs to one dispatch decision
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    pub risk_level: RiskLevel,
    pub total: u64,
    pub phone: Option<&'a str>,
    pub send_requested: bool,
    pub message: &'a str,
}

/// Why a dispatch was skipped, `None` when it should go ahead
pub fn skip_reason(request: &DispatchRequest<'_>) -> Option<&'static str> {
    if request.total == 0 {
        Some(INFO_NO_FINDINGS)
    } else if !request.send_requested {
        Some(INFO_NOT_REQUESTED)
    } else if !request.risk_level.is_alertable() {
        Some(INFO_RISK_BELOW_THRESHOLD)
    } else if request.phone.map(normalize_destination).unwrap_or_default().is_empty() {
        Some(INFO_NO_PHONE)
    } else {
        None
    }
}

/// Trim and drop common phone separators. Channel prefixes are kept.
pub fn normalize_destination(phone: &str) -> String {
    phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect()
}

// ============================================================================
// DISPATCHER
// ============================================================================

#[derive(Clone)]
pub struct NotificationDispatcher {
    provider: Option<Arc<dyn MessagingProvider>>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(provider: Option<Arc<dyn MessagingProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Dispatcher without a provider: every request is skipped
    pub fn disabled() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn dispatch(&self, request: DispatchRequest<'_>, cancel: &CancellationToken) -> DispatchOutcome {
        if let Some(reason) = skip_reason(&request) {
            return DispatchOutcome::skipped(reason);
        }

        let Some(provider) = self.provider.as_ref() else {
            return DispatchOutcome::skipped(INFO_NOT_CONFIGURED);
        };

        if cancel.is_cancelled() {
            tracing::info!("Dispatch skipped, request cancelled");
            return DispatchOutcome::skipped(INFO_CANCELLED);
        }

        let destination = normalize_destination(request.phone.unwrap_or_default());

        let result = match tokio::time::timeout(self.timeout, provider.send(&destination, request.message)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout(self.timeout.as_secs())),
        };

        match result {
            Ok(message_id) => {
                tracing::info!("Alert sent via {} ({})", provider.name(), message_id);
                DispatchOutcome::sent(message_id)
            }
            Err(e) => {
                tracing::warn!("Failed to send alert via {}: {}", provider.name(), e);
                DispatchOutcome::failed(e.to_string())
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingProvider;
    use super::*;

    fn request(risk_level: RiskLevel, phone: Option<&'static str>) -> DispatchRequest<'static> {
        DispatchRequest {
            risk_level,
            total: 4,
            phone,
            send_requested: true,
            message: "alert body",
        }
    }

    fn dispatcher(provider: Arc<RecordingProvider>) -> NotificationDispatcher {
        NotificationDispatcher::new(Some(provider), Duration::from_secs(5))
    }

    #[test]
    fn test_normalize_destination() {
        assert_eq!(normalize_destination("  +65 8765-4321 "), "+6587654321");
        assert_eq!(normalize_destination("(+1) 415.523.8886"), "+14155238886");
        assert_eq!(normalize_destination("whatsapp:+6587654321"), "whatsapp:+6587654321");
        assert_eq!(normalize_destination("   "), "");
    }

    #[test]
    fn test_skip_reason_order() {
        let mut req = request(RiskLevel::Low, None);
        req.total = 0;
        req.send_requested = false;
        assert_eq!(skip_reason(&req), Some(INFO_NO_FINDINGS));

        req.total = 2;
        assert_eq!(skip_reason(&req), Some(INFO_NOT_REQUESTED));

        req.send_requested = true;
        assert_eq!(skip_reason(&req), Some(INFO_RISK_BELOW_THRESHOLD));

        req.risk_level = RiskLevel::Medium;
        assert_eq!(skip_reason(&req), Some(INFO_NO_PHONE));

        req.phone = Some("+6587654321");
        assert_eq!(skip_reason(&req), None);
    }

    #[tokio::test]
    async fn test_low_and_none_never_call_provider() {
        let provider = Arc::new(RecordingProvider::ok());
        let dispatcher = dispatcher(provider.clone());
        let cancel = CancellationToken::new();

        for risk in [RiskLevel::Low, RiskLevel::None] {
            let outcome = dispatcher.dispatch(request(risk, Some("+6587654321")), &cancel).await;
            assert!(!outcome.attempted);
            assert!(!outcome.sent);
            assert_eq!(outcome.info, INFO_RISK_BELOW_THRESHOLD);
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_phone_never_calls_provider() {
        let provider = Arc::new(RecordingProvider::ok());
        let dispatcher = dispatcher(provider.clone());
        let cancel = CancellationToken::new();

        for phone in [None, Some(""), Some("   ")] {
            let outcome = dispatcher.dispatch(request(RiskLevel::High, phone), &cancel).await;
            assert_eq!(outcome, DispatchOutcome::skipped(INFO_NO_PHONE));
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_send() {
        let provider = Arc::new(RecordingProvider::ok());
        let dispatcher = dispatcher(provider.clone());

        let outcome = dispatcher
            .dispatch(request(RiskLevel::High, Some(" +65 8765 4321 ")), &CancellationToken::new())
            .await;

        assert_eq!(outcome, DispatchOutcome::sent("SM-test-0001"));
        assert_eq!(provider.call_count(), 1);
        let last = provider.last.lock().unwrap().clone().unwrap();
        assert_eq!(last, ("+6587654321".to_string(), "alert body".to_string()));
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let provider = Arc::new(RecordingProvider::failing("invalid 'To' number"));
        let dispatcher = dispatcher(provider.clone());

        let outcome = dispatcher
            .dispatch(request(RiskLevel::Medium, Some("+1")), &CancellationToken::new())
            .await;

        assert!(outcome.attempted);
        assert!(!outcome.sent);
        assert!(outcome.info.contains("invalid 'To' number"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_non_fatal() {
        let provider = Arc::new(RecordingProvider::slow(Duration::from_secs(60)));
        let dispatcher = NotificationDispatcher::new(Some(provider.clone()), Duration::from_secs(3));

        let outcome = dispatcher
            .dispatch(request(RiskLevel::High, Some("+6587654321")), &CancellationToken::new())
            .await;

        assert!(outcome.attempted);
        assert!(!outcome.sent);
        assert_eq!(outcome.info, "provider call timed out after 3s");
    }

    #[tokio::test]
    async fn test_cancelled_before_dispatch_sends_nothing() {
        let provider = Arc::new(RecordingProvider::ok());
        let dispatcher = dispatcher(provider.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = dispatcher.dispatch(request(RiskLevel::High, Some("+6587654321")), &cancel).await;
        assert_eq!(outcome, DispatchOutcome::skipped(INFO_CANCELLED));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_never_attempts() {
        let outcome = NotificationDispatcher::disabled()
            .dispatch(request(RiskLevel::High, Some("+6587654321")), &CancellationToken::new())
            .await;
        assert_eq!(outcome, DispatchOutcome::skipped(INFO_NOT_CONFIGURED));
    }
}
