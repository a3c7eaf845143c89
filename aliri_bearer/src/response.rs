//! Token endpoint responses
//!
//! See [RFC 6749 §5](https://datatracker.ietf.org/doc/html/rfc6749#section-5).

use std::fmt;

use aliri_clock::DurationSecs;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{Properties, SealedAccessToken, SealedRefreshToken};

/// The token type reported in every successful response
pub const BEARER_TOKEN_TYPE: &str = "bearer";

/// A successful token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The sealed access token
    pub access_token: SealedAccessToken,
    /// The sealed refresh token
    pub refresh_token: SealedRefreshToken,
    /// Always `bearer`
    pub token_type: String,
    /// The lifetime of the access token in seconds
    pub expires_in: DurationSecs,
    /// The lifetime of the refresh token in seconds
    pub refresh_token_expires_in: DurationSecs,
    /// Additional verifier-provided properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

/// An RFC 6749 error code
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request is missing a required parameter, includes an unsupported
    /// parameter value, repeats a parameter, or is otherwise malformed
    InvalidRequest,
    /// Client authentication failed
    InvalidClient,
    /// The provided authorization grant or refresh token is invalid,
    /// expired, or revoked
    InvalidGrant,
    /// The authenticated client is not authorized to use this grant type
    UnauthorizedClient,
    /// The grant type is not supported by the authorization server
    UnsupportedGrantType,
    /// The requested scope is invalid, unknown, or malformed
    InvalidScope,
    /// The authorization server encountered an unexpected condition
    ServerError,
    /// The authorization server is temporarily unable to handle the request
    TemporarilyUnavailable,
}

impl ErrorKind {
    /// The error code as it appears on the wire
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error response body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// The error code
    pub error: ErrorKind,
    /// A human-readable description of the error
    #[serde(rename = "error_description")]
    pub description: String,
    /// A URI identifying a page with more information about the error
    #[serde(rename = "error_uri", default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// The `state` parameter from the client request, echoed back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// A failed token request, carrying the response body and HTTP status
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}: {}", .response.error, .response.description)]
pub struct TokenError {
    status: StatusCode,
    response: ErrorResponse,
}

impl TokenError {
    fn new(status: StatusCode, error: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse {
                error,
                description: description.into(),
                uri: None,
                state: None,
            },
        }
    }

    /// `invalid_request` with `400 Bad Request`
    pub fn invalid_request(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidRequest, description)
    }

    /// `invalid_client` with `401 Unauthorized`
    pub fn invalid_client(description: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorKind::InvalidClient, description)
    }

    /// `invalid_grant` with `401 Unauthorized`
    pub fn invalid_grant(description: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorKind::InvalidGrant, description)
    }

    /// `unauthorized_client` with `400 Bad Request`
    pub fn unauthorized_client(description: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::UnauthorizedClient,
            description,
        )
    }

    /// `unsupported_grant_type` with `400 Bad Request`
    pub fn unsupported_grant_type() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::UnsupportedGrantType,
            "grant type is unsupported",
        )
    }

    /// `invalid_scope` with `400 Bad Request`
    pub fn invalid_scope(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidScope, description)
    }

    /// `server_error` with `500 Internal Server Error`
    pub fn server_error(description: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::ServerError,
            description,
        )
    }

    /// `temporarily_unavailable` with `503 Service Unavailable`
    pub fn temporarily_unavailable(description: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::TemporarilyUnavailable,
            description,
        )
    }

    /// Attaches a URI with more information about the error
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.response.uri = Some(uri.into());
        self
    }

    /// Echoes the client's `state` parameter
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.response.state = Some(state.into());
        self
    }

    /// The HTTP status to respond with
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The error code
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.response.error
    }

    /// The response body
    #[inline]
    pub fn response(&self) -> &ErrorResponse {
        &self.response
    }

    /// Splits the error into its status and response body
    #[inline]
    pub fn into_parts(self) -> (StatusCode, ErrorResponse) {
        (self.status, self.response)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_kinds_serialize_as_rfc_codes() {
        for kind in [
            ErrorKind::InvalidRequest,
            ErrorKind::InvalidClient,
            ErrorKind::InvalidGrant,
            ErrorKind::UnauthorizedClient,
            ErrorKind::UnsupportedGrantType,
            ErrorKind::InvalidScope,
            ErrorKind::ServerError,
            ErrorKind::TemporarilyUnavailable,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn error_response_omits_empty_optionals() {
        let err = TokenError::invalid_grant("invalid username or password");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            serde_json::to_value(err.response()).unwrap(),
            json!({
                "error": "invalid_grant",
                "error_description": "invalid username or password",
            })
        );
    }

    #[test]
    fn error_response_includes_uri_and_state() {
        let err = TokenError::invalid_request("missing code")
            .with_uri("https://example.com/errors/missing-code")
            .with_state("xyz");
        assert_eq!(
            serde_json::to_value(err.response()).unwrap(),
            json!({
                "error": "invalid_request",
                "error_description": "missing code",
                "error_uri": "https://example.com/errors/missing-code",
                "state": "xyz",
            })
        );
    }

    #[test]
    fn token_response_shape() {
        let resp = TokenResponse {
            access_token: SealedAccessToken::from_static("access"),
            refresh_token: SealedRefreshToken::from_static("refresh"),
            token_type: BEARER_TOKEN_TYPE.to_owned(),
            expires_in: DurationSecs(3600),
            refresh_token_expires_in: DurationSecs(86400),
            properties: None,
        };

        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({
                "access_token": "access",
                "refresh_token": "refresh",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token_expires_in": 86400,
            })
        );
    }
}
