//! Configuration module

use std::env;
use std::time::Duration;

use crate::logic::triage::rules::{ClassPartition, DEFAULT_CRITICAL_CLASSES, DEFAULT_WARNING_CLASSES};

const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Gemini credentials and generation settings
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Max anomaly records included in the prompt
    pub log_excerpt: usize,
}

/// Twilio WhatsApp credentials
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender identity, e.g. `whatsapp:+14155238886`
    pub from: String,
    pub base_url: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub log_format: LogFormat,

    /// CORS origins, empty means any
    pub allowed_origins: Vec<String>,

    /// `None` disables LLM enhancement
    pub gemini: Option<GeminiConfig>,

    /// `None` disables alert dispatch
    pub twilio: Option<TwilioConfig>,

    pub enhancer_timeout: Duration,
    pub dispatch_timeout: Duration,

    /// Sessions untouched for this long are dropped
    pub session_idle_ttl: Duration,

    /// Critical / warning class partition
    pub partition: ClassPartition,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gemini = var("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            model: var("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            temperature: 0.2,
            max_output_tokens: 512,
            log_excerpt: 32,
        });

        let twilio = match (
            var("TWILIO_ACCOUNT_SID"),
            var("TWILIO_AUTH_TOKEN"),
            var("TWILIO_WHATSAPP_FROM"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from,
                base_url: var("TWILIO_BASE_URL").unwrap_or_else(|| "https://api.twilio.com".to_string()),
            }),
            _ => None,
        };

        let allowed_origins = match var("ALLOWED_ORIGINS") {
            Some(list) if list == "*" => Vec::new(),
            Some(list) => split_list(&list),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let critical = var("CRITICAL_CLASSES")
            .map(|list| split_list(&list))
            .unwrap_or_else(|| DEFAULT_CRITICAL_CLASSES.iter().map(|c| c.to_string()).collect());
        let warning = var("WARNING_CLASSES")
            .map(|list| split_list(&list))
            .unwrap_or_else(|| DEFAULT_WARNING_CLASSES.iter().map(|c| c.to_string()).collect());

        Self {
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8000),

            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),

            log_format: match var("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },

            allowed_origins,
            gemini,
            twilio,

            enhancer_timeout: Duration::from_secs(
                var("ENHANCER_TIMEOUT_SECS").and_then(|s| s.parse().ok()).unwrap_or(20),
            ),
            dispatch_timeout: Duration::from_secs(
                var("DISPATCH_TIMEOUT_SECS").and_then(|s| s.parse().ok()).unwrap_or(15),
            ),
            session_idle_ttl: Duration::from_secs(
                var("SESSION_IDLE_TTL_SECS").and_then(|s| s.parse().ok()).unwrap_or(3600),
            ),

            partition: ClassPartition::new(critical, warning),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.port, 8000);
        assert!(config.gemini.is_none());
        assert!(config.twilio.is_none());
        assert_eq!(config.enhancer_timeout, Duration::from_secs(20));
        assert_eq!(config.session_idle_ttl, Duration::from_secs(3600));
        assert_eq!(config.partition, ClassPartition::default());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.allowed_origins.len(), 4);
        assert!(!config.is_production());
    }

    #[test]
    fn test_gemini_enabled_by_key() {
        let config = config(&[("GEMINI_API_KEY", "abc"), ("GEMINI_MODEL", "gemini-pro")]);
        let gemini = config.gemini.unwrap();
        assert_eq!(gemini.api_key, "abc");
        assert_eq!(gemini.model, "gemini-pro");
    }

    #[test]
    fn test_blank_key_disables_gemini() {
        assert!(config(&[("GEMINI_API_KEY", "   ")]).gemini.is_none());
    }

    #[test]
    fn test_twilio_requires_all_three() {
        let partial = config(&[("TWILIO_ACCOUNT_SID", "AC1"), ("TWILIO_AUTH_TOKEN", "t")]);
        assert!(partial.twilio.is_none());

        let full = config(&[
            ("TWILIO_ACCOUNT_SID", "AC1"),
            ("TWILIO_AUTH_TOKEN", "t"),
            ("TWILIO_WHATSAPP_FROM", "whatsapp:+14155238886"),
        ]);
        assert_eq!(full.twilio.unwrap().base_url, "https://api.twilio.com");
    }

    #[test]
    fn test_partition_and_origins_overrides() {
        let config = config(&[
            ("CRITICAL_CLASSES", "leak, crack"),
            ("WARNING_CLASSES", "crack,scour"),
            ("ALLOWED_ORIGINS", "*"),
            ("LOG_FORMAT", "json"),
        ]);
        assert_eq!(config.partition.critical, vec!["leak", "crack"]);
        assert_eq!(config.partition.warning, vec!["scour"]);
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_repeated_critical_class_counts_once() {
        use crate::logic::triage::types::{AnomalyRecord, DetectionCounts, MissionSummary, RiskLevel};
        use crate::logic::triage::classify;

        let config = config(&[("CRITICAL_CLASSES", "damage,damage"), ("WARNING_CLASSES", "debris, debris")]);
        assert_eq!(config.partition.critical, vec!["damage"]);
        assert_eq!(config.partition.warning, vec!["debris"]);

        let counts = DetectionCounts::from_records(&[AnomalyRecord::new("damage", 0.9, "00:01")]);
        assert_eq!(classify(&counts, &config.partition), RiskLevel::Medium);

        let summary = MissionSummary::from_counts(&counts, &config.partition);
        assert_eq!((summary.total, summary.critical, summary.normal), (1, 1, 0));
        assert!(summary.is_consistent());
    }
}
