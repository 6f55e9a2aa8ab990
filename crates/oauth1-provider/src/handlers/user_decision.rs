//! User-decision endpoint.
//!
//! Consumes a pending transaction: records the authenticated user's
//! allow/deny decision, obtains a verifier from the [`IssueVerifier`]
//! collaborator on allow, and delivers the result to the consumer: by
//! redirect when a callback URL is bound, otherwise by passing control to
//! the application (out-of-band display).
//!
//! The transaction must outlive the response: a consumer retry arriving
//! before the response is fully written must still find it. The handler
//! therefore never deletes the transaction itself; every successful outcome
//! carries a [`TransactionRetirement`] guard the transport consumes once the
//! response bytes are flushed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{TransactionLoaderOptions, UserDecisionOptions};
use crate::engine::Engine;
use crate::error::{ProviderError, ProviderResult};
use crate::request::{Decision, Params, ProviderRequest};
use crate::response::{Outcome, callback_redirect};
use crate::session::SessionStorage;

use super::TransactionLoader;

/// Out-of-band sentinel: the consumer cannot receive a callback and the
/// verifier is displayed to the user instead.
pub const OOB: &str = "oob";

/// Decision payload extracted by a [`ParseDecision`] hook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionParams {
    /// Explicit allow flag. When `None`, the decision is derived from the
    /// configured cancel field in the body.
    pub allow: Option<bool>,
    /// Additional decision parameters (scope restrictions and the like).
    pub params: Params,
}

/// Hook extracting the decision payload from the submitted form.
#[async_trait]
pub trait ParseDecision: Send + Sync {
    /// Extracts the decision payload from `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the form is malformed; the endpoint aborts and
    /// the transaction remains available for retry.
    async fn parse(&self, request: &ProviderRequest) -> ProviderResult<DecisionParams>;
}

#[async_trait]
impl<F> ParseDecision for F
where
    F: Fn(&ProviderRequest) -> ProviderResult<DecisionParams> + Send + Sync,
{
    async fn parse(&self, request: &ProviderRequest) -> ProviderResult<DecisionParams> {
        (self)(request)
    }
}

/// Issues the verifier proving the user authorized a request token.
///
/// Implementations record the approval (user id, verifier) on the stored
/// request token. Invoked on the allow path only.
#[async_trait]
pub trait IssueVerifier: Send + Sync {
    /// Issues a verifier for `token`. `Ok(None)` is valid for OAuth 1.0
    /// deployments without the verifier step.
    ///
    /// # Errors
    ///
    /// Returns an error if recording the approval fails; the endpoint
    /// aborts and the transaction remains available for retry.
    async fn issue(
        &self,
        token: &str,
        user: Option<&Value>,
        decision: &Decision,
    ) -> ProviderResult<Option<String>>;
}

/// Single-use guard deleting a retired transaction from the session.
///
/// Consumed by [`retire`](Self::retire) after the response for the decision
/// request has been fully written, so retirement happens exactly once per
/// outcome. Dropping the guard without retiring leaves the transaction in
/// the session.
///
/// Two concurrent decision requests for the same transaction id are a known
/// race: each obtains its own guard and the last removal wins. The session
/// layer is assumed to keep same-session writes from corrupting each other;
/// nothing makes the decision exclusive.
#[must_use = "call retire() once the response has been written, or the transaction lingers"]
pub struct TransactionRetirement {
    session: Arc<dyn SessionStorage>,
    session_key: String,
    transaction_id: String,
}

impl std::fmt::Debug for TransactionRetirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionRetirement")
            .field("session_key", &self.session_key)
            .field("transaction_id", &self.transaction_id)
            .finish_non_exhaustive()
    }
}

impl TransactionRetirement {
    /// The id of the transaction this guard retires.
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Deletes the transaction from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn retire(self) -> ProviderResult<()> {
        tracing::debug!(transaction_id = %self.transaction_id, "retiring transaction");
        self.session
            .remove_transaction(&self.session_key, &self.transaction_id)
            .await
    }
}

/// A decision handler's result: the response to deliver plus the retirement
/// guard for the consumed transaction.
#[derive(Debug)]
pub struct DecisionOutcome {
    /// Response to deliver to the user agent.
    pub response: Outcome,
    /// Guard retiring the transaction once the response is written.
    pub retirement: TransactionRetirement,
}

/// Handler for the user-decision endpoint.
pub struct UserDecisionEndpoint {
    options: UserDecisionOptions,
    loader: Option<TransactionLoader>,
    parse: Option<Arc<dyn ParseDecision>>,
    issue: Arc<dyn IssueVerifier>,
}

impl UserDecisionEndpoint {
    /// Creates a user-decision endpoint with default options.
    #[must_use]
    pub fn new(engine: Arc<Engine>, issue: Arc<dyn IssueVerifier>) -> Self {
        Self::with_options(engine, issue, UserDecisionOptions::default())
    }

    /// Creates a user-decision endpoint.
    ///
    /// Unless `load_transaction` is disabled, a [`TransactionLoader`] is
    /// chained ahead of the decision handling, sharing the endpoint's
    /// session key and transaction field.
    #[must_use]
    pub fn with_options(
        engine: Arc<Engine>,
        issue: Arc<dyn IssueVerifier>,
        options: UserDecisionOptions,
    ) -> Self {
        let loader = options.load_transaction.then(|| {
            TransactionLoader::with_options(
                engine,
                TransactionLoaderOptions {
                    session_key: options.session_key.clone(),
                    transaction_field: options.transaction_field.clone(),
                },
            )
        });
        Self {
            options,
            loader,
            parse: None,
            issue,
        }
    }

    /// Configures a hook extracting the decision payload.
    #[must_use]
    pub fn parse_decision(mut self, parse: Arc<dyn ParseDecision>) -> Self {
        self.parse = Some(parse);
        self
    }

    /// Handles a decision request.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the session, parsed body or transaction context
    ///   is missing
    /// - any error from the transaction loader, the parse hook or the
    ///   verifier collaborator; the transaction is untouched in these cases
    pub async fn handle(&self, request: &mut ProviderRequest) -> ProviderResult<DecisionOutcome> {
        if let Some(loader) = &self.loader {
            loader.handle(request).await?;
        }

        let Some(session) = request.session.clone() else {
            return Err(ProviderError::configuration(
                "OAuth service provider requires session support",
            ));
        };
        let Some(body) = request.body.clone() else {
            return Err(ProviderError::configuration(
                "OAuth service provider requires body parsing",
            ));
        };
        let Some(oauth) = request.oauth.as_ref() else {
            return Err(ProviderError::configuration("OAuth transaction not found"));
        };
        let (Some(tid), Some(authz)) = (oauth.transaction_id.clone(), oauth.authz.clone()) else {
            return Err(ProviderError::configuration("OAuth transaction not found"));
        };

        let parsed = match &self.parse {
            Some(parse) => parse.parse(request).await?,
            None => DecisionParams::default(),
        };

        let user = request.property(&self.options.user_property).cloned();
        let allow = parsed
            .allow
            .unwrap_or_else(|| !body.contains_key(&self.options.cancel_field));
        let decision = Decision {
            allow,
            params: parsed.params,
        };

        {
            let oauth = request.oauth_mut();
            oauth.user = user.clone();
            oauth.decision = Some(decision.clone());
        }

        let callback_url = request
            .oauth
            .as_ref()
            .and_then(|oauth| oauth.callback_url.clone());
        let deliverable = callback_url.as_deref().filter(|url| *url != OOB);

        let response = if allow {
            let verifier = self
                .issue
                .issue(&authz.token, user.as_ref(), &decision)
                .await?;

            match deliverable {
                None => {
                    request.oauth_mut().verifier = verifier;
                    Outcome::Next
                }
                Some(callback) => {
                    let mut params = vec![("oauth_token", authz.token.as_str())];
                    if let Some(verifier) = verifier.as_deref() {
                        params.push(("oauth_verifier", verifier));
                    }
                    Outcome::Redirect(callback_redirect(callback, &params)?)
                }
            }
        } else {
            // The protocol does not say what denial looks like. Matching the
            // OAuth 2.0 convention, the consumer is told via a problem
            // redirect unless the application opts to render its own page.
            tracing::debug!(transaction_id = %tid, "user refused authorization");
            match deliverable {
                None => Outcome::Next,
                Some(callback) if self.options.redirect_on_cancel => Outcome::Redirect(
                    callback_redirect(callback, &[("oauth_problem", "user_refused")])?,
                ),
                Some(_) => Outcome::Next,
            }
        };

        Ok(DecisionOutcome {
            response,
            retirement: TransactionRetirement {
                session,
                session_key: self.options.session_key.clone(),
                transaction_id: tid,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Deserialization;
    use crate::session::MemorySession;
    use crate::transaction::{AuthorizationParams, Transaction};
    use serde_json::json;

    struct FixedVerifier {
        verifier: Option<String>,
    }

    #[async_trait]
    impl IssueVerifier for FixedVerifier {
        async fn issue(
            &self,
            token: &str,
            _user: Option<&Value>,
            _decision: &Decision,
        ) -> ProviderResult<Option<String>> {
            assert_eq!(token, "rt-1");
            Ok(self.verifier.clone())
        }
    }

    fn engine() -> Arc<Engine> {
        Engine::builder()
            .deserialize_client(|obj: &Value| -> ProviderResult<Deserialization> {
                Ok(Deserialization::Client(json!({ "id": obj.clone() })))
            })
            .build()
    }

    async fn seeded_session(callback_url: Option<&str>) -> Arc<MemorySession> {
        let session = Arc::new(MemorySession::new());
        session
            .insert_transaction(
                "authorize",
                "tid1",
                Transaction::new(
                    json!("c1"),
                    callback_url.map(String::from),
                    None,
                    AuthorizationParams::new("rt-1"),
                ),
            )
            .await
            .unwrap();
        session
    }

    fn decision_request(session: Arc<MemorySession>, cancel: bool) -> ProviderRequest {
        let mut request = ProviderRequest::new();
        request.session = Some(session);
        request.set_property("user", json!({"id": "u1"}));
        let mut body = Params::new();
        body.insert("transaction_id".to_string(), "tid1".to_string());
        if cancel {
            body.insert("cancel".to_string(), "Deny".to_string());
        }
        request.body = Some(body);
        request
    }

    #[tokio::test]
    async fn test_allow_redirects_with_token_and_verifier() {
        let endpoint = UserDecisionEndpoint::new(
            engine(),
            Arc::new(FixedVerifier {
                verifier: Some("v-1".to_string()),
            }),
        );

        let session = seeded_session(Some("http://consumer.example/cb")).await;
        let mut request = decision_request(session.clone(), false);
        let outcome = endpoint.handle(&mut request).await.unwrap();

        assert_eq!(
            outcome.response,
            Outcome::Redirect(
                "http://consumer.example/cb?oauth_token=rt-1&oauth_verifier=v-1".to_string()
            )
        );

        // Still present until the response is written...
        assert!(
            session
                .find_transaction("authorize", "tid1")
                .await
                .unwrap()
                .is_some()
        );
        // ...and gone once retired.
        outcome.retirement.retire().await.unwrap();
        assert!(
            session
                .find_transaction("authorize", "tid1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_allow_without_verifier_redirects_token_only() {
        let endpoint = UserDecisionEndpoint::new(engine(), Arc::new(FixedVerifier { verifier: None }));

        let session = seeded_session(Some("http://consumer.example/cb")).await;
        let mut request = decision_request(session, false);
        let outcome = endpoint.handle(&mut request).await.unwrap();

        assert_eq!(
            outcome.response,
            Outcome::Redirect("http://consumer.example/cb?oauth_token=rt-1".to_string())
        );
        outcome.retirement.retire().await.unwrap();
    }

    #[tokio::test]
    async fn test_allow_oob_passes_verifier_to_application() {
        let endpoint = UserDecisionEndpoint::new(
            engine(),
            Arc::new(FixedVerifier {
                verifier: Some("v-1".to_string()),
            }),
        );

        let session = seeded_session(Some(OOB)).await;
        let mut request = decision_request(session.clone(), false);
        let outcome = endpoint.handle(&mut request).await.unwrap();

        assert_eq!(outcome.response, Outcome::Next);
        assert_eq!(
            request.oauth.as_ref().unwrap().verifier.as_deref(),
            Some("v-1")
        );

        outcome.retirement.retire().await.unwrap();
        assert!(
            session
                .find_transaction("authorize", "tid1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_deny_redirects_with_problem() {
        let endpoint = UserDecisionEndpoint::new(engine(), Arc::new(FixedVerifier { verifier: None }));

        let session = seeded_session(Some("http://consumer.example/cb")).await;
        let mut request = decision_request(session.clone(), true);
        let outcome = endpoint.handle(&mut request).await.unwrap();

        assert_eq!(
            outcome.response,
            Outcome::Redirect("http://consumer.example/cb?oauth_problem=user_refused".to_string())
        );
        assert!(!request.oauth.as_ref().unwrap().decision.as_ref().unwrap().allow);

        outcome.retirement.retire().await.unwrap();
        assert!(
            session
                .find_transaction("authorize", "tid1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_deny_without_redirect_on_cancel_passes_through() {
        let endpoint = UserDecisionEndpoint::with_options(
            engine(),
            Arc::new(FixedVerifier { verifier: None }),
            UserDecisionOptions {
                redirect_on_cancel: false,
                ..UserDecisionOptions::default()
            },
        );

        let session = seeded_session(Some("http://consumer.example/cb")).await;
        let mut request = decision_request(session.clone(), true);
        let outcome = endpoint.handle(&mut request).await.unwrap();

        assert_eq!(outcome.response, Outcome::Next);

        // Transaction is still removed after the application's response.
        outcome.retirement.retire().await.unwrap();
        assert!(
            session
                .find_transaction("authorize", "tid1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_deny_oob_passes_through() {
        struct MustNotIssue;

        #[async_trait]
        impl IssueVerifier for MustNotIssue {
            async fn issue(
                &self,
                _token: &str,
                _user: Option<&Value>,
                _decision: &Decision,
            ) -> ProviderResult<Option<String>> {
                panic!("no verifier is issued on deny");
            }
        }

        let endpoint = UserDecisionEndpoint::new(engine(), Arc::new(MustNotIssue));

        let session = seeded_session(None).await;
        let mut request = decision_request(session, true);
        let outcome = endpoint.handle(&mut request).await.unwrap();
        assert_eq!(outcome.response, Outcome::Next);
        outcome.retirement.retire().await.unwrap();
    }

    #[tokio::test]
    async fn test_explicit_allow_from_parse_overrides_cancel_field() {
        let endpoint = UserDecisionEndpoint::new(
            engine(),
            Arc::new(FixedVerifier {
                verifier: Some("v-1".to_string()),
            }),
        )
        .parse_decision(Arc::new(
            |_: &ProviderRequest| -> ProviderResult<DecisionParams> {
                Ok(DecisionParams {
                    allow: Some(true),
                    params: Params::new(),
                })
            },
        ));

        let session = seeded_session(Some("http://consumer.example/cb")).await;
        // cancel field present, but the hook decided allow
        let mut request = decision_request(session, true);
        let outcome = endpoint.handle(&mut request).await.unwrap();
        assert!(matches!(outcome.response, Outcome::Redirect(ref url) if url.contains("oauth_verifier")));
        outcome.retirement.retire().await.unwrap();
    }

    #[tokio::test]
    async fn test_issue_error_leaves_transaction_for_retry() {
        struct FailingVerifier;

        #[async_trait]
        impl IssueVerifier for FailingVerifier {
            async fn issue(
                &self,
                _token: &str,
                _user: Option<&Value>,
                _decision: &Decision,
            ) -> ProviderResult<Option<String>> {
                Err(ProviderError::server("approval store unavailable"))
            }
        }

        let endpoint = UserDecisionEndpoint::new(engine(), Arc::new(FailingVerifier));

        let session = seeded_session(Some("http://consumer.example/cb")).await;
        let mut request = decision_request(session.clone(), false);
        let err = endpoint.handle(&mut request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Server { .. }));

        assert!(
            session
                .find_transaction("authorize", "tid1")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_missing_body_is_fatal() {
        let endpoint = UserDecisionEndpoint::new(engine(), Arc::new(FixedVerifier { verifier: None }));

        let session = seeded_session(None).await;
        let mut request = ProviderRequest::new();
        request.session = Some(session);
        let err = endpoint.handle(&mut request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_unloaded_transaction_is_fatal_when_loader_disabled() {
        let endpoint = UserDecisionEndpoint::with_options(
            engine(),
            Arc::new(FixedVerifier { verifier: None }),
            UserDecisionOptions {
                load_transaction: false,
                ..UserDecisionOptions::default()
            },
        );

        let session = seeded_session(Some("http://consumer.example/cb")).await;
        let mut request = decision_request(session, false);
        let err = endpoint.handle(&mut request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_decisions_race_is_tolerated() {
        // Two decision requests for the same transaction both succeed and
        // both retire; the second removal is a no-op. Accepted behavior, not
        // an exclusivity guarantee.
        let endpoint = UserDecisionEndpoint::new(
            engine(),
            Arc::new(FixedVerifier {
                verifier: Some("v-1".to_string()),
            }),
        );

        let session = seeded_session(Some("http://consumer.example/cb")).await;
        let mut first = decision_request(session.clone(), false);
        let mut second = decision_request(session.clone(), false);

        let first_outcome = endpoint.handle(&mut first).await.unwrap();
        let second_outcome = endpoint.handle(&mut second).await.unwrap();

        first_outcome.retirement.retire().await.unwrap();
        second_outcome.retirement.retire().await.unwrap();
        assert!(
            session
                .find_transaction("authorize", "tid1")
                .await
                .unwrap()
                .is_none()
        );
    }
}
