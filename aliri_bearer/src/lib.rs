//! A stateless OAuth2 bearer token server
//!
//! This crate issues, seals, and refreshes bearer tokens for the
//! [RFC 6749](https://datatracker.ietf.org/doc/html/rfc6749) `password`,
//! `client_credentials`, `authorization_code`, and `refresh_token` grants.
//!
//! The server keeps no session state. Issued tokens are self-contained: the
//! token is serialized, sealed with an authenticated cipher, and handed to the
//! client as an opaque string. Presenting it back is enough to recover every
//! field, and any tampering causes unsealing to fail.
//!
//! Everything that requires knowledge of users or clients is delegated to an
//! application-supplied [`CredentialsVerifier`], which decides whether
//! credentials are valid, which claims and response properties a token
//! carries, and whether a refresh token is still honored.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use aliri_bearer::{
//!     error::BoxError, BearerServer, ClientIdRef, ClientSecretRef, CredentialsVerifier,
//!     Password, PasswordRef, RequestContext, TokenRequest,
//! };
//! use async_trait::async_trait;
//!
//! struct Users;
//!
//! #[async_trait]
//! impl CredentialsVerifier for Users {
//!     async fn validate_user(
//!         &self,
//!         username: &str,
//!         password: &PasswordRef,
//!         _scope: &str,
//!         _ctx: &RequestContext,
//!     ) -> Result<(), BoxError> {
//!         if username == "alice" && password.as_str() == "wonderland" {
//!             Ok(())
//!         } else {
//!             Err("unknown user".into())
//!         }
//!     }
//!
//!     async fn validate_client(
//!         &self,
//!         _client_id: &ClientIdRef,
//!         _client_secret: &ClientSecretRef,
//!         _scope: &str,
//!         _ctx: &RequestContext,
//!     ) -> Result<(), BoxError> {
//!         Err("clients are not supported".into())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> color_eyre::Result<()> {
//! let server = BearerServer::builder(&b"a long and random secret"[..]).build(Arc::new(Users))?;
//!
//! let request = TokenRequest {
//!     grant_type: Some("password".into()),
//!     username: Some("alice".into()),
//!     password: Some(Password::from_static("wonderland")),
//!     ..TokenRequest::default()
//! };
//!
//! let grant = request.into_grant(None)?;
//! let response = server
//!     .generate_token_response(grant, &RequestContext::default())
//!     .await?;
//!
//! let token = server.authenticator().authenticate(&response.access_token)?;
//! assert_eq!(token.credential(), "alice");
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod authentication;
mod braids;
pub mod codec;
pub mod error;
mod grant;
mod issuer;
mod request;
mod response;
mod server;
mod token;
mod verifier;


pub use authentication::BearerAuthenticator;
pub use braids::*;
pub use codec::{ChaCha20Poly1305Formatter, Purpose, SecureFormatter, TokenCodec};
pub use grant::{Grant, GrantType, UnknownGrantType};
pub use issuer::{TokenIssuer, DEFAULT_REFRESH_TOKEN_TTL, DEFAULT_TOKEN_TTL};
pub use request::{BasicCredentials, TokenRequest};
pub use response::{ErrorKind, ErrorResponse, TokenError, TokenResponse, BEARER_TOKEN_TYPE};
pub use server::{BearerServer, BearerServerBuilder};
pub use token::{Claims, Properties, RefreshToken, Token, TokenType};
pub use verifier::{AuthorizationCodeVerifier, CredentialsVerifier, RequestContext};
