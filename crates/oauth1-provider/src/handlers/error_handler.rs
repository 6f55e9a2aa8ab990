//! Problem Reporting error responder.
//!
//! Renders any failure from the protocol endpoints in accordance with the
//! Problem Reporting extension to OAuth. Two modes: **direct** for endpoints
//! the consumer calls itself (request-token, access-token), where the report
//! is the response body; **indirect** for endpoints reached through the
//! user's browser, where the report travels to the consumer as query
//! parameters on a callback redirect.
//!
//! # Example
//!
//! ```ignore
//! let responder = ErrorResponder::new();
//! match endpoint.handle(&mut request).await {
//!     Ok(outcome) => outcome,
//!     Err(err) => responder.respond(&err, &request),
//! }
//! ```

use crate::config::{ErrorResponderMode, ErrorResponderOptions};
use crate::error::ProviderError;
use crate::request::{Params, ProviderRequest};
use crate::response::{DirectResponse, Outcome, callback_redirect, encode};

use super::user_decision::OOB;

/// Handler rendering protocol failures.
pub struct ErrorResponder {
    options: ErrorResponderOptions,
}

impl Default for ErrorResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorResponder {
    /// Creates a direct-mode responder with the default realm.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ErrorResponderOptions::default())
    }

    /// Creates an error responder.
    #[must_use]
    pub fn with_options(options: ErrorResponderOptions) -> Self {
        Self { options }
    }

    /// Renders `error` for the request it occurred on.
    ///
    /// In indirect mode, `Outcome::Next` means no redirect target is known
    /// (no transaction callback, or the out-of-band sentinel) and the error
    /// should be rendered for direct display to the user by the next
    /// handler.
    #[must_use]
    pub fn respond(&self, error: &ProviderError, request: &ProviderRequest) -> Outcome {
        match self.options.mode {
            ErrorResponderMode::Direct => Outcome::Respond(self.direct(error)),
            ErrorResponderMode::Indirect => self.indirect(error, request),
        }
    }

    fn direct(&self, error: &ProviderError) -> DirectResponse {
        let status = error.status();
        let problem = error
            .problem_code()
            .map_or("server_error", |code| code.as_str());

        let mut params = Params::new();
        params.insert("oauth_problem".to_string(), problem.to_string());
        let advice = error.to_string();
        if !advice.is_empty() {
            params.insert("oauth_problem_advice".to_string(), advice);
        }

        let www_authenticate = (status == 401 || status == 403).then(|| {
            let mut challenge = vec![format!("realm=\"{}\"", self.options.realm)];
            challenge.extend(
                params
                    .iter()
                    .map(|(key, value)| format!("{}=\"{}\"", encode(key), encode(value))),
            );
            format!("OAuth {}", challenge.join(", "))
        });

        if error.is_server_error() {
            tracing::error!(%error, "internal failure in OAuth endpoint");
        }

        DirectResponse::problem(status, &params, www_authenticate)
    }

    fn indirect(&self, error: &ProviderError, request: &ProviderRequest) -> Outcome {
        let callback_url = request
            .oauth
            .as_ref()
            .and_then(|oauth| oauth.callback_url.as_deref())
            .filter(|url| *url != OOB);
        let Some(callback_url) = callback_url else {
            return Outcome::Next;
        };

        let problem = error
            .problem_code()
            .map_or("server_error", |code| code.as_str());
        let advice = error.to_string();
        let mut params = vec![("oauth_problem", problem)];
        if !advice.is_empty() {
            params.push(("oauth_problem_advice", advice.as_str()));
        }

        match callback_redirect(callback_url, &params) {
            Ok(location) => Outcome::Redirect(location),
            // The stored callback does not parse; nothing can reach the
            // consumer, so let the application render the failure.
            Err(_) => Outcome::Next,
        }
    }
}
