//! Endpoint configuration.
//!
//! One options struct per endpoint, deserializable from the embedding
//! application's configuration with every field defaulted.
//!
//! # Example (TOML)
//!
//! ```toml
//! [oauth.user_decision]
//! cancel_field = "deny"
//! redirect_on_cancel = false
//! ```

use serde::{Deserialize, Serialize};

fn default_user_property() -> String {
    "user".to_string()
}

fn default_session_key() -> String {
    "authorize".to_string()
}

fn default_transaction_field() -> String {
    "transaction_id".to_string()
}

/// Options for the request-token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestTokenOptions {
    /// Request property holding the authenticated consumer.
    pub user_property: String,
}

impl Default for RequestTokenOptions {
    fn default() -> Self {
        Self {
            user_property: default_user_property(),
        }
    }
}

/// Options for the access-token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessTokenOptions {
    /// Request property holding the authenticated consumer.
    pub user_property: String,
}

impl Default for AccessTokenOptions {
    fn default() -> Self {
        Self {
            user_property: default_user_property(),
        }
    }
}

/// Options for the user-authorization endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserAuthorizationOptions {
    /// Session key under which pending transactions are stored.
    pub session_key: String,
    /// Length of generated transaction ids.
    pub id_length: usize,
}

impl Default for UserAuthorizationOptions {
    fn default() -> Self {
        Self {
            session_key: default_session_key(),
            id_length: 8,
        }
    }
}

/// Options for the transaction loader.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionLoaderOptions {
    /// Session key under which pending transactions are stored.
    pub session_key: String,
    /// Query/body field carrying the transaction id.
    pub transaction_field: String,
}

impl Default for TransactionLoaderOptions {
    fn default() -> Self {
        Self {
            session_key: default_session_key(),
            transaction_field: default_transaction_field(),
        }
    }
}

/// Options for the user-decision endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserDecisionOptions {
    /// Session key under which pending transactions are stored.
    pub session_key: String,
    /// Query/body field carrying the transaction id.
    pub transaction_field: String,
    /// Body field whose presence denies the request.
    pub cancel_field: String,
    /// Request property holding the authenticated user.
    pub user_property: String,
    /// Redirect to the consumer with `oauth_problem=user_refused` on deny.
    /// When disabled, control passes to the application instead.
    pub redirect_on_cancel: bool,
    /// Run the transaction loader ahead of the decision handler.
    pub load_transaction: bool,
}

impl Default for UserDecisionOptions {
    fn default() -> Self {
        Self {
            session_key: default_session_key(),
            transaction_field: default_transaction_field(),
            cancel_field: "cancel".to_string(),
            user_property: default_user_property(),
            redirect_on_cancel: true,
            load_transaction: true,
        }
    }
}

/// Delivery mode for protocol error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorResponderMode {
    /// Respond to the consumer inline (request-token and access-token
    /// endpoints).
    Direct,
    /// Deliver via a redirect through the user's browser (user-authorization
    /// endpoints).
    Indirect,
}

/// Options for the error responder.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorResponderOptions {
    /// Mode of operation.
    pub mode: ErrorResponderMode,
    /// Authentication realm for `WWW-Authenticate` challenges.
    pub realm: String,
}

impl Default for ErrorResponderOptions {
    fn default() -> Self {
        Self {
            mode: ErrorResponderMode::Direct,
            realm: "Clients".to_string(),
        }
    }
}
