//! Endpoint handlers for the three-legged authorization flow.
//!
//! Each handler is constructed once at startup with its collaborators and
//! options, then invoked per request with a mutable
//! [`ProviderRequest`](crate::request::ProviderRequest):
//!
//! - [`RequestTokenEndpoint`] - issues temporary credentials
//! - [`UserAuthorizationEndpoint`] - opens an authorization transaction
//! - [`TransactionLoader`] - reloads a transaction from the session
//! - [`UserDecisionEndpoint`] - applies the user's decision and retires the
//!   transaction
//! - [`AccessTokenEndpoint`] - exchanges an authorized token for token
//!   credentials
//! - [`ErrorResponder`] - renders failures per the Problem Reporting
//!   convention

pub mod access_token;
pub mod error_handler;
pub mod request_token;
pub mod transaction_loader;
pub mod user_authorization;
pub mod user_decision;

pub use access_token::{AccessTokenEndpoint, IssueAccessToken, NoVerifierCheck, VerifyRequestToken};
pub use error_handler::ErrorResponder;
pub use request_token::{IssueRequestToken, RequestTokenEndpoint};
pub use transaction_loader::TransactionLoader;
pub use user_authorization::{UserAuthorizationEndpoint, ValidateRequestToken, Validation};
pub use user_decision::{
    DecisionOutcome, DecisionParams, IssueVerifier, ParseDecision, TransactionRetirement,
    UserDecisionEndpoint,
};

use async_trait::async_trait;

use crate::error::ProviderResult;
use crate::request::{Params, ProviderRequest};

/// A token minted by a storage collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    /// The token identifier.
    pub token: String,
    /// The shared-secret half of the credential.
    pub secret: String,
    /// Extra response parameters, rendered ahead of the `oauth_*` values.
    pub params: Params,
}

impl IssuedToken {
    /// Creates an issued token without extra response parameters.
    #[must_use]
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
            params: Params::new(),
        }
    }

    /// Attaches extra response parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Hook extracting protocol extension parameters from a request.
///
/// Optional on the request-token and user-authorization endpoints; when
/// absent the endpoint proceeds with no extension parameters.
#[async_trait]
pub trait ParseParams: Send + Sync {
    /// Extracts extension parameters from `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is malformed; the endpoint aborts.
    async fn parse(&self, request: &ProviderRequest) -> ProviderResult<Params>;
}

#[async_trait]
impl<F> ParseParams for F
where
    F: Fn(&ProviderRequest) -> ProviderResult<Params> + Send + Sync,
{
    async fn parse(&self, request: &ProviderRequest) -> ProviderResult<Params> {
        (self)(request)
    }
}
