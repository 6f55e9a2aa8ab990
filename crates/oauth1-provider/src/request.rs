//! Transport-neutral request context.
//!
//! The engine never touches a socket or a framework request type. The
//! embedding application assembles a [`ProviderRequest`] from whatever
//! transport it uses (parsed query and body, the identities its own
//! authentication middleware attached, and a handle to the user's session)
//! and the endpoint handlers read from and write to it.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::session::SessionStorage;
use crate::transaction::AuthorizationParams;

/// Ordered string parameter map (query, body and protocol parameters).
pub type Params = IndexMap<String, String>;

/// Protocol values attached during consumer authentication.
///
/// OAuth transmits these alongside the signed credentials, so they are
/// parsed by the authentication collaborator before any endpoint handler
/// runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthInfo {
    /// Callback URL requested by the consumer (request-token endpoint).
    pub callback_url: Option<String>,
    /// Request token under negotiation (access-token endpoint).
    pub token: Option<String>,
    /// Verifier presented for the exchange (access-token endpoint; absent
    /// under OAuth 1.0 without the 1.0a revision).
    pub verifier: Option<String>,
}

/// The user's allow/deny decision together with its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Whether access was granted.
    pub allow: bool,
    /// Additional decision parameters (scope restrictions and the like).
    pub params: Params,
}

/// Per-request protocol state populated by the endpoint handlers.
#[derive(Debug, Clone, Default)]
pub struct OAuthContext {
    /// Identifier of the pending transaction.
    pub transaction_id: Option<String>,
    /// The consumer this request concerns.
    pub client: Option<Value>,
    /// Callback URL bound to the request token.
    pub callback_url: Option<String>,
    /// Parameters of the original request-token request.
    pub request: Option<Params>,
    /// Parameters of the authorization request.
    pub authz: Option<AuthorizationParams>,
    /// The authenticated user deciding the request.
    pub user: Option<Value>,
    /// The user's decision.
    pub decision: Option<Decision>,
    /// Verifier issued for an out-of-band exchange.
    pub verifier: Option<String>,
}

impl OAuthContext {
    /// The consumer this request concerns. Alias for `client`.
    #[must_use]
    pub fn consumer(&self) -> Option<&Value> {
        self.client.as_ref()
    }
}

/// A request as seen by the endpoint handlers.
#[derive(Clone, Default)]
pub struct ProviderRequest {
    /// Parsed query-string parameters.
    pub query: Params,
    /// Parsed form body, when the transport parsed one.
    pub body: Option<Params>,
    /// Request-scoped values attached by outer middleware; the authenticated
    /// identity lives here under the endpoint's configured `user_property`.
    pub properties: IndexMap<String, Value>,
    /// Values parsed during consumer authentication.
    pub auth_info: Option<AuthInfo>,
    /// Handle to this user's session.
    pub session: Option<Arc<dyn SessionStorage>>,
    /// Protocol state populated by the endpoint handlers.
    pub oauth: Option<OAuthContext>,
}

impl ProviderRequest {
    /// Creates an empty request context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a request-scoped property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Attaches a request-scoped property.
    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties.insert(name.into(), value);
    }

    /// The protocol context, creating it on first access.
    pub fn oauth_mut(&mut self) -> &mut OAuthContext {
        self.oauth.get_or_insert_with(OAuthContext::default)
    }

    /// Looks up a parameter in the query, falling back to the body.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .or_else(|| self.body.as_ref().and_then(|body| body.get(name)))
            .map(String::as_str)
    }
}

impl std::fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRequest")
            .field("query", &self.query)
            .field("body", &self.body)
            .field("properties", &self.properties)
            .field("auth_info", &self.auth_info)
            .field("session", &self.session.as_ref().map(|_| "<session>"))
            .field("oauth", &self.oauth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_prefers_query_over_body() {
        let mut request = ProviderRequest::new();
        request
            .query
            .insert("transaction_id".to_string(), "from-query".to_string());
        let mut body = Params::new();
        body.insert("transaction_id".to_string(), "from-body".to_string());
        request.body = Some(body);

        assert_eq!(request.param("transaction_id"), Some("from-query"));
    }

    #[test]
    fn test_param_falls_back_to_body() {
        let mut request = ProviderRequest::new();
        let mut body = Params::new();
        body.insert("transaction_id".to_string(), "from-body".to_string());
        request.body = Some(body);

        assert_eq!(request.param("transaction_id"), Some("from-body"));
        assert_eq!(request.param("missing"), None);
    }

    #[test]
    fn test_properties() {
        let mut request = ProviderRequest::new();
        request.set_property("user", json!({"id": "u1"}));
        assert_eq!(request.property("user").unwrap()["id"], "u1");
        assert!(request.property("other").is_none());
    }

    #[test]
    fn test_consumer_aliases_client() {
        let mut request = ProviderRequest::new();
        request.oauth_mut().client = Some(json!({"id": "c1"}));

        let oauth = request.oauth.as_ref().unwrap();
        assert_eq!(oauth.consumer(), oauth.client.as_ref());
    }
}
