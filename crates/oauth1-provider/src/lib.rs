//! # oauth1-provider
//!
//! Service-provider engine for the OAuth 1.0/1.0a three-legged authorization
//! flow (RFC 5849).
//!
//! This crate implements the protocol machinery of a service provider
//! (issuing temporary request tokens, walking a user through authorization,
//! and exchanging authorized tokens for access tokens) while staying
//! agnostic to how tokens, consumers and sessions are actually stored.
//! Persistence, consumer/user authentication, session transport and view
//! rendering are collaborators supplied by the embedding application.
//!
//! ## Modules
//!
//! - [`engine`] - client serialization chains shared by all endpoints
//! - [`handlers`] - the five request-handling stages and the error responder
//! - [`error`] - protocol error taxonomy (Problem Reporting codes)
//! - [`config`] - per-endpoint options
//! - [`request`] - transport-neutral request context
//! - [`response`] - wire encoding and response types
//! - [`session`] - session storage trait for pending transactions
//! - [`transaction`] - the pending-transaction record
//!
//! ## Flow
//!
//! ```text
//! POST /oauth/request_token   RequestTokenEndpoint    temporary credential
//! GET  /oauth/authorize       UserAuthorizationEndpoint   transaction opened
//! POST /oauth/authorize       UserDecisionEndpoint    verifier issued,
//!                             (TransactionLoader runs first)  transaction retired
//! POST /oauth/access_token    AccessTokenEndpoint     token credential
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod request;
pub mod response;
pub mod session;
pub mod transaction;

pub use config::{
    AccessTokenOptions, ErrorResponderMode, ErrorResponderOptions, RequestTokenOptions,
    TransactionLoaderOptions, UserAuthorizationOptions, UserDecisionOptions,
};
pub use engine::{
    Deserialization, DeserializeClient, Engine, EngineBuilder, Serialization, SerializeClient,
};
pub use error::{ProblemCode, ProviderError, ProviderResult};
pub use handlers::{
    AccessTokenEndpoint, DecisionOutcome, DecisionParams, ErrorResponder, IssueAccessToken,
    IssueRequestToken, IssueVerifier, IssuedToken, NoVerifierCheck, ParseDecision, ParseParams,
    RequestTokenEndpoint, TransactionLoader, TransactionRetirement, UserAuthorizationEndpoint,
    UserDecisionEndpoint, ValidateRequestToken, Validation, VerifyRequestToken,
};
pub use request::{AuthInfo, Decision, OAuthContext, Params, ProviderRequest};
pub use response::{DirectResponse, Outcome};
pub use session::{MemorySession, SessionStorage};
pub use transaction::{AuthorizationParams, Transaction};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use oauth1_provider::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        AccessTokenOptions, ErrorResponderMode, ErrorResponderOptions, RequestTokenOptions,
        TransactionLoaderOptions, UserAuthorizationOptions, UserDecisionOptions,
    };
    pub use crate::engine::{Deserialization, Engine, Serialization};
    pub use crate::error::{ProblemCode, ProviderError, ProviderResult};
    pub use crate::handlers::{
        AccessTokenEndpoint, DecisionOutcome, ErrorResponder, IssueAccessToken, IssueRequestToken,
        IssueVerifier, IssuedToken, RequestTokenEndpoint, TransactionLoader,
        UserAuthorizationEndpoint, UserDecisionEndpoint, ValidateRequestToken, Validation,
        VerifyRequestToken,
    };
    pub use crate::request::{AuthInfo, Decision, Params, ProviderRequest};
    pub use crate::response::{DirectResponse, Outcome};
    pub use crate::session::{MemorySession, SessionStorage};
    pub use crate::transaction::{AuthorizationParams, Transaction};
}
