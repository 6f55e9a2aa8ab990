//! Access-token endpoint (RFC 5849 §2.3, token credentials).
//!
//! Invoked on consumer-authenticated requests carrying the request token
//! being exchanged and, under 1.0a, the verifier proving the same user agent
//! completed authorization. Verification and minting are delegated to the
//! [`VerifyRequestToken`] and [`IssueAccessToken`] collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::AccessTokenOptions;
use crate::error::{ProblemCode, ProviderError, ProviderResult};
use crate::request::{AuthInfo, ProviderRequest};
use crate::response::{DirectResponse, Outcome};

use super::IssuedToken;

/// Checks a presented verifier against the one issued for a request token.
#[async_trait]
pub trait VerifyRequestToken: Send + Sync {
    /// Returns `true` only if `verifier` matches the verifier issued for
    /// `request_token`. `verifier` is `None` when the consumer spoke plain
    /// OAuth 1.0, which has no verifier step.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn verify(
        &self,
        request_token: &str,
        verifier: Option<&str>,
        info: &AuthInfo,
    ) -> ProviderResult<bool>;
}

/// [`VerifyRequestToken`] for OAuth 1.0 (pre-1.0a) deployments.
///
/// The original protocol revision has no verifier, so every exchange
/// passes verification unconditionally.
pub struct NoVerifierCheck;

#[async_trait]
impl VerifyRequestToken for NoVerifierCheck {
    async fn verify(
        &self,
        _request_token: &str,
        _verifier: Option<&str>,
        _info: &AuthInfo,
    ) -> ProviderResult<bool> {
        Ok(true)
    }
}

/// Mints a permanent access token for an approved request token.
///
/// Implementations must check that the request token was actually approved
/// and that `consumer` matches the consumer it was issued to. Whether the
/// request token is invalidated after a successful exchange is also the
/// implementor's call; the engine does not assume one-time use.
#[async_trait]
pub trait IssueAccessToken: Send + Sync {
    /// Issues an access token. Returning `Ok(None)` rejects the exchange
    /// (`token_rejected`).
    ///
    /// # Errors
    ///
    /// Returns an error if minting or persistence fails.
    async fn issue(
        &self,
        consumer: &Value,
        request_token: &str,
        info: &AuthInfo,
    ) -> ProviderResult<Option<IssuedToken>>;
}

/// Handler for the access-token endpoint.
pub struct AccessTokenEndpoint {
    options: AccessTokenOptions,
    verify: Arc<dyn VerifyRequestToken>,
    issue: Arc<dyn IssueAccessToken>,
}

impl AccessTokenEndpoint {
    /// Creates an access-token endpoint with default options.
    #[must_use]
    pub fn new(verify: Arc<dyn VerifyRequestToken>, issue: Arc<dyn IssueAccessToken>) -> Self {
        Self::with_options(verify, issue, AccessTokenOptions::default())
    }

    /// Creates an access-token endpoint.
    #[must_use]
    pub fn with_options(
        verify: Arc<dyn VerifyRequestToken>,
        issue: Arc<dyn IssueAccessToken>,
        options: AccessTokenOptions,
    ) -> Self {
        Self {
            options,
            verify,
            issue,
        }
    }

    /// Handles an access-token request.
    ///
    /// # Errors
    ///
    /// - `Configuration` if consumer authentication did not run first or the
    ///   request token is missing from the authentication info
    /// - `verifier_invalid` (401) if verification fails
    /// - `token_rejected` (401) if the collaborator declines to issue
    pub async fn handle(&self, request: &mut ProviderRequest) -> ProviderResult<Outcome> {
        let Some(auth_info) = request.auth_info.clone() else {
            return Err(ProviderError::configuration(
                "authentication info not available",
            ));
        };
        let Some(request_token) = auth_info.token.clone() else {
            return Err(ProviderError::configuration(
                "request token not available in authentication info",
            ));
        };
        let Some(consumer) = request.property(&self.options.user_property).cloned() else {
            return Err(ProviderError::configuration(
                "authenticated consumer not available",
            ));
        };

        let ok = self
            .verify
            .verify(&request_token, auth_info.verifier.as_deref(), &auth_info)
            .await?;
        if !ok {
            return Err(ProviderError::authorization(
                "access token not issued",
                ProblemCode::VerifierInvalid,
            ));
        }

        let issued = self
            .issue
            .issue(&consumer, &request_token, &auth_info)
            .await?;
        let Some(issued) = issued else {
            return Err(ProviderError::authorization(
                "access token not issued",
                ProblemCode::TokenRejected,
            ));
        };

        tracing::debug!("issued access token");

        let mut params = issued.params;
        params.insert("oauth_token".to_string(), issued.token);
        params.insert("oauth_token_secret".to_string(), issued.secret);

        Ok(Outcome::Respond(DirectResponse::form(&params)))
    }
}
