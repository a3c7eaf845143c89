//! Application-supplied credential verification
//!
//! The server itself holds no user or client database. Instead, every
//! decision about whether a credential is valid, along with any persistence
//! of issued token identifiers, is delegated to a [`CredentialsVerifier`]
//! supplied by the application.
//!
//! Support for the authorization code grant is an optional capability. A
//! verifier advertises it by returning itself from
//! [`CredentialsVerifier::authorization_code_verifier`].

use async_trait::async_trait;
use http::HeaderMap;

use crate::{
    error::BoxError, AuthorizationCodeRef, Claims, ClientIdRef, ClientSecretRef, PasswordRef,
    Properties, TokenIdRef, TokenType,
};

/// Details of the inbound request, passed through to the verifier
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    headers: HeaderMap,
}

impl RequestContext {
    /// Constructs a request context from the inbound request headers
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// The inbound request headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Verifies user and client credentials and participates in token issuance
#[async_trait]
pub trait CredentialsVerifier: Send + Sync {
    /// Validates a username and password, returning an error if the user
    /// credentials are wrong
    async fn validate_user(
        &self,
        username: &str,
        password: &PasswordRef,
        scope: &str,
        ctx: &RequestContext,
    ) -> Result<(), BoxError>;

    /// Validates a client ID and secret, returning an error if the client
    /// credentials are wrong
    async fn validate_client(
        &self,
        client_id: &ClientIdRef,
        client_secret: &ClientSecretRef,
        scope: &str,
        ctx: &RequestContext,
    ) -> Result<(), BoxError>;

    /// Provides claims to be sealed into a newly issued token
    ///
    /// Claims are computed only when a token is first issued. Refreshed
    /// tokens carry the claims of the refresh token verbatim.
    async fn add_claims(
        &self,
        _token_type: TokenType,
        _credential: &str,
        _token_id: &TokenIdRef,
        _scope: &str,
        _ctx: &RequestContext,
    ) -> Result<Claims, BoxError> {
        Ok(Claims::new())
    }

    /// Provides additional properties to be included in the token response
    async fn add_properties(
        &self,
        _token_type: TokenType,
        _credential: &str,
        _token_id: &TokenIdRef,
        _scope: &str,
        _ctx: &RequestContext,
    ) -> Result<Option<Properties>, BoxError> {
        Ok(None)
    }

    /// Validates a previously stored token ID during a refresh request
    ///
    /// Whether a refresh token may be reused is decided here. A verifier that
    /// rotates refresh tokens should reject any `refresh_token_id` that is not
    /// the most recent one stored for the credential.
    async fn validate_token_id(
        &self,
        _token_type: TokenType,
        _credential: &str,
        _token_id: &TokenIdRef,
        _refresh_token_id: &TokenIdRef,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Stores the identifiers of a newly issued token pair
    ///
    /// If this fails, the token pair is not returned to the caller.
    async fn store_token_id(
        &self,
        _token_type: TokenType,
        _credential: &str,
        _token_id: &TokenIdRef,
        _refresh_token_id: &TokenIdRef,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Queries for the authorization code capability
    ///
    /// Verifiers that support the authorization code grant should return
    /// `Some(self)`.
    fn authorization_code_verifier(&self) -> Option<&dyn AuthorizationCodeVerifier> {
        None
    }
}

/// Verifies authorization codes
#[async_trait]
pub trait AuthorizationCodeVerifier: Send + Sync {
    /// Checks the authorization code, returning the credential of the subject
    /// that the code was issued to
    async fn validate_code(
        &self,
        client_id: &ClientIdRef,
        client_secret: Option<&ClientSecretRef>,
        code: &AuthorizationCodeRef,
        redirect_uri: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<String, BoxError>;
}
