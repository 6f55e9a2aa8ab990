//! Pending authorization transactions.
//!
//! A transaction is the session-persisted record of an in-progress
//! authorization dialog: created when the user is first shown the prompt,
//! reloaded when their decision comes back, and retired once the decision
//! response has been written.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::Params;

/// Protocol tag stored on every transaction.
pub const TRANSACTION_PROTOCOL: &str = "oauth";

/// Parameters of the authorization request that opened a transaction.
///
/// Always carries the `oauth_token` under negotiation; the callback URL is
/// only present when the user-authorization request itself supplied an
/// `oauth_callback` (OAuth 1.0 style). Extension parameters extracted by a
/// parse hook are flattened alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationParams {
    /// The request token being authorized.
    pub token: String,

    /// Callback URL supplied on the authorization request, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,

    /// Extension parameters (display preferences and the like).
    #[serde(flatten)]
    pub params: Params,
}

impl AuthorizationParams {
    /// Creates authorization parameters for a token with no extensions.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            callback_url: None,
            params: Params::new(),
        }
    }
}

/// A pending authorization transaction.
///
/// The consumer is held in its serialized form (see
/// [`Engine`](crate::engine::Engine)); both it and the callback URL are
/// frozen at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Protocol tag, always [`TRANSACTION_PROTOCOL`].
    pub protocol: String,

    /// Serialized consumer.
    pub client: Value,

    /// Callback URL bound to the request token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,

    /// Parameters of the original request-token request, if the validator
    /// supplied them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Params>,

    /// Parameters of the authorization request.
    pub authz: AuthorizationParams,
}

impl Transaction {
    /// Creates a transaction record.
    #[must_use]
    pub fn new(
        client: Value,
        callback_url: Option<String>,
        request: Option<Params>,
        authz: AuthorizationParams,
    ) -> Self {
        Self {
            protocol: TRANSACTION_PROTOCOL.to_string(),
            client,
            callback_url,
            request,
            authz,
        }
    }
}

/// Generates a random transaction id of `length` characters.
///
/// Ids are base64url without padding, so they travel safely in form fields
/// and query strings. Uniqueness within a session's transaction map is
/// probabilistic, bounded by the id length, which is acceptable for
/// short-lived, per-session records.
#[must_use]
pub fn transaction_id(length: usize) -> String {
    let mut bytes = vec![0u8; (length * 3).div_ceil(4)];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut id = URL_SAFE_NO_PAD.encode(&bytes);
    id.truncate(length);
    id
}
