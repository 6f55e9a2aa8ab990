//! User-authorization endpoint (RFC 5849 §2.2, resource owner authorization).
//!
//! Invoked on a browser request carrying `oauth_token`. Validates the token
//! through the [`ValidateRequestToken`] collaborator, then opens a
//! transaction: the consumer is serialized through the engine and the
//! transaction record stored in the session. This endpoint never produces a
//! final response; rendering the authorization prompt is the application's
//! job, with `transaction_id`, `client` and the request parameters available
//! on the context.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::UserAuthorizationOptions;
use crate::engine::Engine;
use crate::error::{ProblemCode, ProviderError, ProviderResult};
use crate::request::{Params, ProviderRequest};
use crate::response::Outcome;
use crate::session::SessionStorage;
use crate::transaction::{AuthorizationParams, Transaction, transaction_id};

use super::ParseParams;

/// Result of validating an incoming request token.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    /// The consumer the token was issued to. `None` means the token is not
    /// (or no longer) valid.
    pub consumer: Option<Value>,
    /// Callback URL bound to the token at issuance.
    pub callback_url: Option<String>,
    /// Parameters of the original request-token request, if kept.
    pub request: Option<Params>,
}

/// Looks up a request token's owning consumer and bound callback URL.
#[async_trait]
pub trait ValidateRequestToken: Send + Sync {
    /// Validates `token`, returning the owning consumer and callback URL.
    ///
    /// A negative result should still carry the callback URL when one is
    /// known, so the failure can reach the consumer via redirect instead
    /// of dead-ending in the user's browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn validate(
        &self,
        token: &str,
        authz: &AuthorizationParams,
    ) -> ProviderResult<Validation>;
}

/// Handler for the user-authorization endpoint.
pub struct UserAuthorizationEndpoint {
    engine: Arc<Engine>,
    options: UserAuthorizationOptions,
    parse: Option<Arc<dyn ParseParams>>,
    validate: Arc<dyn ValidateRequestToken>,
}

impl UserAuthorizationEndpoint {
    /// Creates a user-authorization endpoint with default options.
    #[must_use]
    pub fn new(engine: Arc<Engine>, validate: Arc<dyn ValidateRequestToken>) -> Self {
        Self::with_options(engine, validate, UserAuthorizationOptions::default())
    }

    /// Creates a user-authorization endpoint.
    #[must_use]
    pub fn with_options(
        engine: Arc<Engine>,
        validate: Arc<dyn ValidateRequestToken>,
        options: UserAuthorizationOptions,
    ) -> Self {
        Self {
            engine,
            options,
            parse: None,
            validate,
        }
    }

    /// Configures a hook extracting extension parameters (display
    /// preferences and the like).
    #[must_use]
    pub fn parse_params(mut self, parse: Arc<dyn ParseParams>) -> Self {
        self.parse = Some(parse);
        self
    }

    /// Handles a user-authorization request, creating a pending transaction.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the request has no session handle
    /// - `BadRequest` if `oauth_token` is missing from the query
    /// - `token_rejected` (401) if validation yields no consumer; the
    ///   callback URL, when supplied, is attached to the context first so
    ///   the indirect error responder can still redirect
    pub async fn handle(&self, request: &mut ProviderRequest) -> ProviderResult<Outcome> {
        let Some(session) = request.session.clone() else {
            return Err(ProviderError::configuration(
                "OAuth service provider requires session support",
            ));
        };

        let Some(token) = request.query.get("oauth_token").cloned() else {
            return Err(ProviderError::bad_request("missing oauth_token parameter"));
        };

        // A callback accepted unconditionally at this phase can assist
        // session fixation attacks (oauth.net advisory 2009-1); it is
        // recorded for OAuth 1.0 interop and left to the validator to
        // accept or refuse.
        let requested_callback = request.query.get("oauth_callback").cloned();

        let params = match &self.parse {
            Some(parse) => parse.parse(request).await?,
            None => Params::new(),
        };

        let authz = AuthorizationParams {
            token: token.clone(),
            callback_url: requested_callback,
            params,
        };
        request.oauth_mut().authz = Some(authz.clone());

        let validation = self.validate.validate(&token, &authz).await?;

        // Attach before the failure check: a known callback URL means even a
        // rejection can be delivered to the consumer by redirect.
        let oauth = request.oauth_mut();
        oauth.client = validation.consumer.clone();
        oauth.callback_url = validation.callback_url.clone();

        let Some(consumer) = validation.consumer else {
            return Err(ProviderError::authorization(
                "request token not valid",
                ProblemCode::TokenRejected,
            ));
        };

        request.oauth_mut().request = validation.request.clone();

        let serialized = self.engine.serialize_client(&consumer).await?;

        let tid = transaction_id(self.options.id_length);
        let transaction = Transaction::new(
            serialized,
            validation.callback_url,
            validation.request,
            authz,
        );
        session
            .insert_transaction(&self.options.session_key, &tid, transaction)
            .await?;

        tracing::debug!(transaction_id = %tid, "created authorization transaction");
        request.oauth_mut().transaction_id = Some(tid);

        Ok(Outcome::Next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Serialization;
    use crate::session::{MemorySession, SessionStorage};
    use serde_json::json;

    struct FixedValidator {
        validation: Validation,
    }

    #[async_trait]
    impl ValidateRequestToken for FixedValidator {
        async fn validate(
            &self,
            token: &str,
            _authz: &AuthorizationParams,
        ) -> ProviderResult<Validation> {
            assert_eq!(token, "rt-1");
            Ok(self.validation.clone())
        }
    }

    fn engine() -> Arc<Engine> {
        Engine::builder()
            .serialize_client(|client: &Value| -> ProviderResult<Serialization> {
                Ok(Serialization::Serialized(client["id"].clone()))
            })
            .build()
    }

    fn browser_request(session: Arc<MemorySession>) -> ProviderRequest {
        let mut request = ProviderRequest::new();
        request
            .query
            .insert("oauth_token".to_string(), "rt-1".to_string());
        request.session = Some(session);
        request
    }

    #[tokio::test]
    async fn test_creates_transaction() {
        let endpoint = UserAuthorizationEndpoint::new(
            engine(),
            Arc::new(FixedValidator {
                validation: Validation {
                    consumer: Some(json!({"id": "c1"})),
                    callback_url: Some("http://consumer.example/cb".to_string()),
                    request: None,
                },
            }),
        );

        let session = Arc::new(MemorySession::new());
        let mut request = browser_request(session.clone());
        let outcome = endpoint.handle(&mut request).await.unwrap();
        assert!(outcome.is_next());

        let oauth = request.oauth.as_ref().unwrap();
        let tid = oauth.transaction_id.as_ref().unwrap();
        assert_eq!(tid.len(), 8);
        assert_eq!(oauth.client, Some(json!({"id": "c1"})));
        assert_eq!(
            oauth.callback_url.as_deref(),
            Some("http://consumer.example/cb")
        );

        let stored = session
            .find_transaction("authorize", tid)
            .await
            .unwrap()
            .expect("transaction stored in session");
        assert_eq!(stored.client, json!("c1"));
        assert_eq!(
            stored.callback_url.as_deref(),
            Some("http://consumer.example/cb")
        );
        assert_eq!(stored.authz.token, "rt-1");
    }

    #[tokio::test]
    async fn test_transaction_id_honors_configured_length() {
        let endpoint = UserAuthorizationEndpoint::with_options(
            engine(),
            Arc::new(FixedValidator {
                validation: Validation {
                    consumer: Some(json!({"id": "c1"})),
                    callback_url: None,
                    request: None,
                },
            }),
            UserAuthorizationOptions {
                id_length: 16,
                ..UserAuthorizationOptions::default()
            },
        );

        let mut request = browser_request(Arc::new(MemorySession::new()));
        endpoint.handle(&mut request).await.unwrap();
        let tid = request
            .oauth
            .as_ref()
            .unwrap()
            .transaction_id
            .as_ref()
            .unwrap();
        assert_eq!(tid.len(), 16);
    }

    #[tokio::test]
    async fn test_missing_token_is_bad_request() {
        let endpoint = UserAuthorizationEndpoint::new(
            engine(),
            Arc::new(FixedValidator {
                validation: Validation::default(),
            }),
        );

        let mut request = ProviderRequest::new();
        request.session = Some(Arc::new(MemorySession::new()));
        let err = endpoint.handle(&mut request).await.unwrap_err();
        assert!(matches!(err, ProviderError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn test_missing_session_is_fatal() {
        let endpoint = UserAuthorizationEndpoint::new(
            engine(),
            Arc::new(FixedValidator {
                validation: Validation::default(),
            }),
        );

        let mut request = ProviderRequest::new();
        request
            .query
            .insert("oauth_token".to_string(), "rt-1".to_string());
        let err = endpoint.handle(&mut request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_invalid_token_attaches_callback_before_failing() {
        let endpoint = UserAuthorizationEndpoint::new(
            engine(),
            Arc::new(FixedValidator {
                validation: Validation {
                    consumer: None,
                    callback_url: Some("http://consumer.example/cb".to_string()),
                    request: None,
                },
            }),
        );

        let mut request = browser_request(Arc::new(MemorySession::new()));
        let err = endpoint.handle(&mut request).await.unwrap_err();
        assert_eq!(err.problem_code(), Some(ProblemCode::TokenRejected));
        assert_eq!(err.status(), 401);

        // The indirect error responder depends on this attachment.
        let oauth = request.oauth.as_ref().unwrap();
        assert_eq!(
            oauth.callback_url.as_deref(),
            Some("http://consumer.example/cb")
        );
        assert!(oauth.client.is_none());
        assert!(oauth.transaction_id.is_none());
    }

    #[tokio::test]
    async fn test_oauth_callback_recorded_on_authz_params() {
        struct SeesCallback;

        #[async_trait]
        impl ValidateRequestToken for SeesCallback {
            async fn validate(
                &self,
                _token: &str,
                authz: &AuthorizationParams,
            ) -> ProviderResult<Validation> {
                assert_eq!(
                    authz.callback_url.as_deref(),
                    Some("http://consumer.example/legacy")
                );
                Ok(Validation {
                    consumer: Some(json!({"id": "c1"})),
                    callback_url: None,
                    request: None,
                })
            }
        }

        let endpoint = UserAuthorizationEndpoint::new(engine(), Arc::new(SeesCallback));

        let session = Arc::new(MemorySession::new());
        let mut request = browser_request(session.clone());
        request.query.insert(
            "oauth_callback".to_string(),
            "http://consumer.example/legacy".to_string(),
        );
        endpoint.handle(&mut request).await.unwrap();

        let tid = request
            .oauth
            .as_ref()
            .unwrap()
            .transaction_id
            .clone()
            .unwrap();
        let stored = session
            .find_transaction("authorize", &tid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.authz.callback_url.as_deref(),
            Some("http://consumer.example/legacy")
        );
    }

    #[tokio::test]
    async fn test_parse_params_stored_on_transaction() {
        let endpoint = UserAuthorizationEndpoint::new(
            engine(),
            Arc::new(FixedValidator {
                validation: Validation {
                    consumer: Some(json!({"id": "c1"})),
                    callback_url: None,
                    request: None,
                },
            }),
        )
        .parse_params(Arc::new(
            |request: &ProviderRequest| -> ProviderResult<Params> {
                let mut params = Params::new();
                if let Some(display) = request.param("display") {
                    params.insert("display".to_string(), display.to_string());
                }
                Ok(params)
            },
        ));

        let session = Arc::new(MemorySession::new());
        let mut request = browser_request(session.clone());
        request
            .query
            .insert("display".to_string(), "touch".to_string());
        endpoint.handle(&mut request).await.unwrap();

        let tid = request
            .oauth
            .as_ref()
            .unwrap()
            .transaction_id
            .clone()
            .unwrap();
        let stored = session
            .find_transaction("authorize", &tid)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.authz.params.get("display").unwrap(), "touch");
    }
}
