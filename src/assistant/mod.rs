//! Language-model assistants.
//!
//! Provides the [`CompletionProvider`] trait (one chat completion per call), a
//! Groq-backed implementation, and the higher-level assistants built on it:
//! [`suggest::SuggestionEngine`] and [`suggest::ReflectionAssistant`]. The
//! provider is created via [`create_provider`] from configuration.

pub mod groq;
pub mod suggest;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AssistantConfig;

/// Speaker of a [`ChatTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message of a conversation sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant disabled: {0}")]
    Disabled(String),

    #[error("assistant service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("assistant returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for AssistantError {
    fn from(e: reqwest::Error) -> Self {
        Self::ServiceUnavailable(e.to_string())
    }
}

/// Produces the next assistant message for a conversation.
///
/// Synchronous; a failed call leaves no state behind, so callers may retry or
/// degrade.
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, turns: &[ChatTurn]) -> Result<String, AssistantError>;

    /// Model identifier, for diagnostics.
    fn model_name(&self) -> &str {
        "none"
    }
}

/// Speech-to-text source feeding the recording flow.
pub trait Transcriber {
    /// `Ok(None)` when nothing was heard.
    fn transcribe(&self) -> Result<Option<String>, AssistantError>;
}

/// Provider used when no model is configured. Every call fails with
/// [`AssistantError::Disabled`].
#[derive(Debug, Clone)]
pub struct DisabledProvider {
    reason: String,
}

impl DisabledProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl CompletionProvider for DisabledProvider {
    fn complete(&self, _turns: &[ChatTurn]) -> Result<String, AssistantError> {
        Err(AssistantError::Disabled(self.reason.clone()))
    }
}

/// Create a completion provider from config.
///
/// `"groq"` needs its API key in the environment variable named by
/// `api_key_env`; without it, or with `"disabled"`, every completion fails and
/// callers fall back to their canned replies.
pub fn create_provider(config: &AssistantConfig) -> Arc<dyn CompletionProvider> {
    match config.provider.as_str() {
        "groq" => match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => match groq::GroqProvider::new(config, key) {
                Ok(provider) => Arc::new(provider),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to build assistant client, assistant disabled");
                    Arc::new(DisabledProvider::new(e.to_string()))
                }
            },
            _ => {
                tracing::warn!(env = %config.api_key_env, "assistant API key not set, assistant disabled");
                Arc::new(DisabledProvider::new(format!("{} not set", config.api_key_env)))
            }
        },
        "disabled" => Arc::new(DisabledProvider::new("disabled by configuration")),
        other => {
            tracing::warn!(provider = %other, "unknown assistant provider, assistant disabled");
            Arc::new(DisabledProvider::new(format!("unknown provider: {other}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_provider_always_fails() {
        let p = DisabledProvider::new("off");
        let err = p.complete(&[ChatTurn::user("hi")]).unwrap_err();
        assert!(matches!(err, AssistantError::Disabled(ref r) if r == "off"));
    }

    #[test]
    fn missing_key_yields_disabled_provider() {
        let config = AssistantConfig {
            api_key_env: "NEUROLINKER_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        let p = create_provider(&config);
        assert!(matches!(p.complete(&[]), Err(AssistantError::Disabled(_))));
    }

    #[test]
    fn unknown_provider_is_disabled() {
        let config = AssistantConfig {
            provider: "mystery".into(),
            ..Default::default()
        };
        assert!(create_provider(&config).complete(&[]).is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        let turn = ChatTurn::assistant("ok");
        let v = serde_json::to_value(&turn).unwrap();
        assert_eq!(v["role"], "assistant");
    }
}
