//! Request-token endpoint (RFC 5849 §2.1, temporary credentials).
//!
//! Invoked on consumer-authenticated requests. The authentication
//! collaborator has already verified the signature and parsed the
//! `oauth_callback` value into [`AuthInfo`](crate::request::AuthInfo); this
//! endpoint delegates minting to its [`IssueRequestToken`] collaborator and
//! writes the token response.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::RequestTokenOptions;
use crate::error::{ProblemCode, ProviderError, ProviderResult};
use crate::request::{Params, ProviderRequest};
use crate::response::{DirectResponse, Outcome};

use super::{IssuedToken, ParseParams};

/// Mints a temporary credential bound to a consumer and callback URL.
///
/// Persistence of the request token, including the callback binding that
/// the access-token exchange later relies on, is entirely the
/// implementor's responsibility.
#[async_trait]
pub trait IssueRequestToken: Send + Sync {
    /// Issues a request token for `consumer`.
    ///
    /// `params` carries extension parameters when the endpoint was
    /// configured with a parse hook. Returning `Ok(None)` rejects the
    /// consumer (`consumer_key_rejected`).
    ///
    /// # Errors
    ///
    /// Returns an error if minting or persistence fails.
    async fn issue(
        &self,
        consumer: &Value,
        callback_url: &str,
        params: Option<&Params>,
    ) -> ProviderResult<Option<IssuedToken>>;
}

/// Handler for the request-token endpoint.
pub struct RequestTokenEndpoint {
    options: RequestTokenOptions,
    parse: Option<Arc<dyn ParseParams>>,
    issue: Arc<dyn IssueRequestToken>,
}

impl RequestTokenEndpoint {
    /// Creates a request-token endpoint with default options.
    #[must_use]
    pub fn new(issue: Arc<dyn IssueRequestToken>) -> Self {
        Self::with_options(issue, RequestTokenOptions::default())
    }

    /// Creates a request-token endpoint.
    #[must_use]
    pub fn with_options(issue: Arc<dyn IssueRequestToken>, options: RequestTokenOptions) -> Self {
        Self {
            options,
            parse: None,
            issue,
        }
    }

    /// Configures a hook extracting extension parameters.
    #[must_use]
    pub fn parse_params(mut self, parse: Arc<dyn ParseParams>) -> Self {
        self.parse = Some(parse);
        self
    }

    /// Handles a request-token request.
    ///
    /// On success the outcome is a terminal form response carrying
    /// `oauth_token`, `oauth_token_secret` and `oauth_callback_confirmed`;
    /// no further handler runs.
    ///
    /// # Errors
    ///
    /// - `Configuration` if consumer authentication did not run first
    /// - `consumer_key_rejected` (400) if the collaborator declines to issue
    pub async fn handle(&self, request: &mut ProviderRequest) -> ProviderResult<Outcome> {
        let Some(auth_info) = request.auth_info.clone() else {
            return Err(ProviderError::configuration(
                "authentication info not available",
            ));
        };
        let Some(callback_url) = auth_info.callback_url else {
            return Err(ProviderError::configuration(
                "callback URL not available in authentication info",
            ));
        };
        let Some(consumer) = request.property(&self.options.user_property).cloned() else {
            return Err(ProviderError::configuration(
                "authenticated consumer not available",
            ));
        };

        let parsed = match &self.parse {
            Some(parse) => Some(parse.parse(request).await?),
            None => None,
        };

        let issued = self
            .issue
            .issue(&consumer, &callback_url, parsed.as_ref())
            .await?;
        let Some(issued) = issued else {
            return Err(ProviderError::authorization_with_status(
                "request token not issued",
                ProblemCode::ConsumerKeyRejected,
                400,
            ));
        };

        tracing::debug!(callback_url = %callback_url, "issued request token");

        let mut params = issued.params;
        params.insert("oauth_token".to_string(), issued.token);
        params.insert("oauth_token_secret".to_string(), issued.secret);
        params.insert(
            "oauth_callback_confirmed".to_string(),
            "true".to_string(),
        );

        Ok(Outcome::Respond(DirectResponse::form(&params)))
    }
}
