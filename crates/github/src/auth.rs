//! Per-request authentication.
//!
//! How a token is minted (personal token, app installation token, ...) is not
//! this crate's concern. The client only asks for the headers to attach to a
//! request against a given repository owner.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::GithubError;

/// Supplies authentication headers for requests against `owner`'s repositories.
#[async_trait]
pub trait InstallationHeaders: Send + Sync {
    async fn headers_for(&self, owner: &str) -> Result<HeaderMap, GithubError>;
}

/// A single bearer token used for every owner.
pub struct StaticToken {
    authorization: HeaderValue,
}

impl StaticToken {
    /// # Errors
    ///
    /// Returns [`GithubError::Headers`] if the token is not a valid header value.
    pub fn new(token: &str) -> Result<Self, GithubError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|e| GithubError::Headers(e.to_string()))?;
        authorization.set_sensitive(true);
        Ok(Self { authorization })
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl InstallationHeaders for StaticToken {
    async fn headers_for(&self, _owner: &str) -> Result<HeaderMap, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        Ok(headers)
    }
}
