//! Common errors

#![allow(missing_copy_implementations)]

use std::error::Error as StdError;

use thiserror::Error;

/// A boxed error, as returned by application-supplied verifiers
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The secret key could not be used to construct a formatter
#[derive(Debug, Error)]
#[error("secret key rejected: {reason}")]
pub struct KeyRejected {
    reason: &'static str,
}

pub(crate) const fn key_rejected(reason: &'static str) -> KeyRejected {
    KeyRejected { reason }
}

/// A token could not be sealed
#[derive(Debug, Error)]
#[error("unable to seal token")]
pub struct SealError {
    #[from]
    source: BoxError,
}

pub(crate) fn seal_error(source: impl Into<BoxError>) -> SealError {
    SealError {
        source: source.into(),
    }
}

/// A sealed string could not be unsealed
///
/// This is returned when the value is not well formed, was not produced with
/// the same key, was sealed for a different purpose, or fails its integrity
/// check.
#[derive(Debug, Error)]
#[error("unable to decode sealed token")]
pub struct DecodeError {
    #[from]
    source: BoxError,
}

pub(crate) fn decode_error(source: impl Into<BoxError>) -> DecodeError {
    DecodeError {
        source: source.into(),
    }
}

/// The `Authorization` header could not be read as HTTP Basic credentials
#[derive(Debug, Error)]
#[error("malformed basic authorization header")]
pub struct MalformedBasicAuth {
    #[from]
    source: BoxError,
}

pub(crate) fn malformed_basic_auth(source: impl Into<BoxError>) -> MalformedBasicAuth {
    MalformedBasicAuth {
        source: source.into(),
    }
}

/// An error occurring while authenticating a bearer token presented to a
/// protected resource
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// No bearer token was presented
    #[error("bearer token missing")]
    MissingToken,

    /// The `Authorization` header did not carry a bearer token
    #[error("malformed authorization header")]
    MalformedHeader,

    /// The bearer token could not be unsealed
    #[error("invalid bearer token")]
    InvalidToken(#[from] DecodeError),

    /// The bearer token is no longer valid
    #[error("bearer token expired")]
    Expired,
}

impl AuthenticationError {
    /// Whether the request simply did not carry a token
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingToken)
    }
}
