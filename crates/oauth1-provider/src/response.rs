//! Wire format for protocol responses.
//!
//! Direct responses (request-token and access-token endpoints, direct-mode
//! error reporting) are `application/x-www-form-urlencoded` bodies using the
//! RFC 5849 §3.6 parameter encoding. Indirect delivery appends protocol
//! parameters to the transaction's callback URL.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::{ProviderError, ProviderResult};
use crate::request::Params;

/// RFC 5849 §3.6 encode set: everything but ALPHA / DIGIT / `-` / `.` /
/// `_` / `~` is percent-encoded. Stricter than form encoding: `!`, `'`,
/// `(`, `)` and `*` are escaped too.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes a parameter name or value per RFC 5849 §3.6.
#[must_use]
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Encodes an ordered parameter map as a form-urlencoded body.
#[must_use]
pub fn form_encode(params: &Params) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// What an endpoint handler resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A terminal response to write to the consumer.
    Respond(DirectResponse),
    /// A terminal redirect of the user agent to `Location`.
    Redirect(String),
    /// Control passes to the next handler in the application's chain.
    Next,
}

impl Outcome {
    /// Returns `true` if this outcome passes control onward.
    #[must_use]
    pub fn is_next(&self) -> bool {
        matches!(self, Self::Next)
    }
}

/// A direct protocol response: status, headers and a form-urlencoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectResponse {
    /// HTTP status code.
    pub status: u16,
    /// `WWW-Authenticate` challenge, when the status calls for one.
    pub www_authenticate: Option<String>,
    /// Send `Cache-Control: no-store` and `Pragma: no-cache`. Token
    /// responses carry credentials and must never be cached.
    pub no_store: bool,
    /// Form-urlencoded body.
    pub body: String,
}

impl DirectResponse {
    /// Creates a 200 token response from an ordered parameter map.
    #[must_use]
    pub fn form(params: &Params) -> Self {
        Self {
            status: 200,
            www_authenticate: None,
            no_store: true,
            body: form_encode(params),
        }
    }

    /// Creates an error-report response.
    #[must_use]
    pub fn problem(status: u16, params: &Params, www_authenticate: Option<String>) -> Self {
        Self {
            status,
            www_authenticate,
            no_store: false,
            body: form_encode(params),
        }
    }
}

impl IntoResponse for DirectResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = (status, self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        if self.no_store {
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        }
        if let Some(challenge) = self.www_authenticate
            && let Ok(value) = HeaderValue::from_str(&challenge)
        {
            headers.insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

/// Builds a redirect location from a callback URL and protocol parameters.
///
/// The callback's own query pairs are kept, its fragment is dropped, and the
/// given parameters are appended.
///
/// # Errors
///
/// Returns a `Server` error if the stored callback URL does not parse.
pub fn callback_redirect(callback_url: &str, params: &[(&str, &str)]) -> ProviderResult<String> {
    let mut url = url::Url::parse(callback_url)
        .map_err(|e| ProviderError::server(format!("invalid callback URL: {e}")))?;
    url.set_fragment(None);
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}
