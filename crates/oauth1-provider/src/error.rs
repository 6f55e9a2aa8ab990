//! Protocol and integration error types.
//!
//! Two kinds of failure flow out of the endpoint handlers: protocol-level
//! rejections carrying a Problem Reporting code ([`ProviderError::Authorization`])
//! and malformed requests ([`ProviderError::BadRequest`]). Integration
//! failures (a missing precondition, a collaborator that blew up) use the
//! [`ProviderError::Configuration`] and [`ProviderError::Server`] variants and
//! render as `server_error`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type alias for results produced by the provider engine.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by the OAuth service-provider endpoints.
///
/// Every handler propagates failures to its caller rather than recovering
/// locally; how an error becomes an HTTP response is decided entirely by
/// [`ErrorResponder`](crate::handlers::ErrorResponder).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A protocol-level rejection, reported with a Problem Reporting code.
    #[error("{message}")]
    Authorization {
        /// Human-readable advice, rendered as `oauth_problem_advice`.
        message: String,
        /// Machine-readable problem code.
        code: ProblemCode,
        /// HTTP status for direct responses.
        status: u16,
    },

    /// A malformed request (missing required parameter).
    #[error("{message}")]
    BadRequest {
        /// Description of what was malformed.
        message: String,
    },

    /// The endpoint was mounted without a required capability (session
    /// support, body parsing, a populated transaction context).
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the missing precondition.
        message: String,
    },

    /// An unexpected failure from a collaborator, propagated unchanged.
    #[error("{message}")]
    Server {
        /// Description of the failure.
        message: String,
    },
}

impl ProviderError {
    /// Creates an `Authorization` error with the status derived from the code.
    #[must_use]
    pub fn authorization(message: impl Into<String>, code: ProblemCode) -> Self {
        Self::Authorization {
            message: message.into(),
            status: code.default_status(),
            code,
        }
    }

    /// Creates an `Authorization` error with an explicit status.
    #[must_use]
    pub fn authorization_with_status(
        message: impl Into<String>,
        code: ProblemCode,
        status: u16,
    ) -> Self {
        Self::Authorization {
            message: message.into(),
            code,
            status,
        }
    }

    /// Creates a new `BadRequest` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Server` error.
    #[must_use]
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Returns the HTTP status this error renders with in direct mode.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Authorization { status, .. } => *status,
            Self::BadRequest { .. } => 400,
            Self::Configuration { .. } | Self::Server { .. } => 500,
        }
    }

    /// Returns the Problem Reporting code, if this error carries one.
    #[must_use]
    pub fn problem_code(&self) -> Option<ProblemCode> {
        match self {
            Self::Authorization { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Authorization { .. } | Self::BadRequest { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Server { .. })
    }
}

/// OAuth Problem Reporting codes.
///
/// The vocabulary defined by the Problem Reporting extension, rendered as
/// the `oauth_problem` parameter in direct responses and redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCode {
    /// The `oauth_version` value is unacceptable to the service provider.
    VersionRejected,
    /// A required parameter was not received.
    ParameterAbsent,
    /// An unexpected or repeated parameter was received.
    ParameterRejected,
    /// The timestamp is too far from the server time.
    TimestampRefused,
    /// The nonce has already been used.
    NonceUsed,
    /// The signature method is not supported.
    SignatureMethodRejected,
    /// The signature does not match.
    SignatureInvalid,
    /// The consumer key is unknown to the service provider.
    ConsumerKeyUnknown,
    /// The consumer key is permanently unacceptable.
    ConsumerKeyRejected,
    /// The consumer key is temporarily unacceptable.
    ConsumerKeyRefused,
    /// The token has expired.
    TokenExpired,
    /// The token has been revoked.
    TokenRevoked,
    /// The token has already been consumed.
    TokenUsed,
    /// The token is unacceptable.
    TokenRejected,
    /// The verifier is incorrect.
    VerifierInvalid,
    /// The user needs to grant further permissions.
    AdditionalAuthorizationRequired,
    /// The service provider cannot determine whether access is allowed.
    PermissionUnknown,
    /// The user refused to grant, or revoked, access.
    PermissionDenied,
    /// The user refused the authorization request.
    UserRefused,
}

impl ProblemCode {
    /// Returns the string representation of the problem code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VersionRejected => "version_rejected",
            Self::ParameterAbsent => "parameter_absent",
            Self::ParameterRejected => "parameter_rejected",
            Self::TimestampRefused => "timestamp_refused",
            Self::NonceUsed => "nonce_used",
            Self::SignatureMethodRejected => "signature_method_rejected",
            Self::SignatureInvalid => "signature_invalid",
            Self::ConsumerKeyUnknown => "consumer_key_unknown",
            Self::ConsumerKeyRejected => "consumer_key_rejected",
            Self::ConsumerKeyRefused => "consumer_key_refused",
            Self::TokenExpired => "token_expired",
            Self::TokenRevoked => "token_revoked",
            Self::TokenUsed => "token_used",
            Self::TokenRejected => "token_rejected",
            Self::VerifierInvalid => "verifier_invalid",
            Self::AdditionalAuthorizationRequired => "additional_authorization_required",
            Self::PermissionUnknown => "permission_unknown",
            Self::PermissionDenied => "permission_denied",
            Self::UserRefused => "user_refused",
        }
    }

    /// Returns the HTTP status used when none is given explicitly.
    ///
    /// Parameter and signature problems are the consumer's fault in forming
    /// the request (400); `permission_denied` is a refusal (403); every other
    /// code is a credential rejection (401).
    #[must_use]
    pub fn default_status(&self) -> u16 {
        match self {
            Self::VersionRejected
            | Self::ParameterAbsent
            | Self::ParameterRejected
            | Self::TimestampRefused
            | Self::NonceUsed
            | Self::SignatureMethodRejected => 400,
            Self::PermissionDenied => 403,
            _ => 401,
        }
    }
}

impl Default for ProblemCode {
    fn default() -> Self {
        Self::TokenRejected
    }
}

impl fmt::Display for ProblemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
