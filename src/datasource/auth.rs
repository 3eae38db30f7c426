//! Bearer token source for authenticated API calls.

use super::DealApiError;
use async_trait::async_trait;
use std::fmt;

/// Supplies the bearer token of the active session.
///
/// Called once per request so a provider can hand out refreshed tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync + fmt::Debug {
    async fn bearer_token(&self) -> Result<String, DealApiError>;
}

/// A fixed token, e.g. one passed in through the environment.
#[derive(Clone)]
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A provider for an unauthenticated session. Every request fails with `DealApiError::Auth`.
    pub fn none() -> Self {
        Self { token: None }
    }
}

// Keep tokens out of logs.
impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, DealApiError> {
        self.token
            .clone()
            .ok_or_else(|| DealApiError::Auth("no active session".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("tok_123");
        assert_eq!(provider.bearer_token().await.unwrap(), "tok_123");
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_error() {
        let provider = StaticToken::none();
        assert!(matches!(
            provider.bearer_token().await,
            Err(DealApiError::Auth(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let provider = StaticToken::new("secret");
        assert!(!format!("{:?}", provider).contains("secret"));
    }
}
