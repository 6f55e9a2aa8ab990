//! Transaction reload.
//!
//! Repopulates the request context from a transaction serialized into the
//! session, ahead of processing the user's decision. In most setups this
//! runs implicitly inside
//! [`UserDecisionEndpoint`](super::UserDecisionEndpoint) and is not mounted
//! by hand.

use std::sync::Arc;

use crate::config::TransactionLoaderOptions;
use crate::engine::Engine;
use crate::error::{ProblemCode, ProviderError, ProviderResult};
use crate::request::ProviderRequest;
use crate::response::Outcome;
use crate::session::SessionStorage;

/// Handler reloading a pending transaction from the session.
pub struct TransactionLoader {
    engine: Arc<Engine>,
    options: TransactionLoaderOptions,
}

impl TransactionLoader {
    /// Creates a transaction loader with default options.
    #[must_use]
    pub fn new(engine: Arc<Engine>) -> Self {
        Self::with_options(engine, TransactionLoaderOptions::default())
    }

    /// Creates a transaction loader.
    #[must_use]
    pub fn with_options(engine: Arc<Engine>, options: TransactionLoaderOptions) -> Self {
        Self { engine, options }
    }

    /// Loads the transaction named by the configured field.
    ///
    /// A missing field or unknown id passes through with nothing populated;
    /// some integrations attach the transaction by other means. The loaded
    /// transaction stays in the session; removal belongs to the decision
    /// handler.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the request has no session handle
    /// - `consumer_key_rejected` (401) if the stored consumer no longer
    ///   deserializes; the stale transaction is removed
    pub async fn handle(&self, request: &mut ProviderRequest) -> ProviderResult<Outcome> {
        let Some(session) = request.session.clone() else {
            return Err(ProviderError::configuration(
                "OAuth service provider requires session support",
            ));
        };

        let Some(tid) = request.param(&self.options.transaction_field).map(String::from) else {
            return Ok(Outcome::Next);
        };
        let Some(transaction) = session
            .find_transaction(&self.options.session_key, &tid)
            .await?
        else {
            return Ok(Outcome::Next);
        };

        let client = self.engine.deserialize_client(&transaction.client).await?;
        let Some(client) = client else {
            // The consumer was valid when the transaction was created but has
            // since been deauthorized. No response can be sent to it; the
            // transaction is dropped.
            tracing::warn!(transaction_id = %tid, "consumer deauthorized mid-transaction");
            session
                .remove_transaction(&self.options.session_key, &tid)
                .await?;
            return Err(ProviderError::authorization(
                "no longer authorized",
                ProblemCode::ConsumerKeyRejected,
            ));
        };

        let oauth = request.oauth_mut();
        oauth.transaction_id = Some(tid);
        oauth.client = Some(client);
        oauth.callback_url = transaction.callback_url;
        oauth.request = transaction.request;
        oauth.authz = Some(transaction.authz);

        Ok(Outcome::Next)
    }
}
