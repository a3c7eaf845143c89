//! Axum bindings for serving an [`aliri_bearer`] token endpoint and
//! protecting routes with the bearer tokens it issues.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use aliri_bearer::{BearerServer, CredentialsVerifier};
//! use aliri_bearer_axum::Authenticated;
//! use axum::{routing::get, Extension, Router};
//!
//! async fn whoami(Authenticated(token): Authenticated) -> String {
//!     format!("hello, {}", token.credential())
//! }
//!
//! # fn verifier() -> Arc<dyn CredentialsVerifier> { todo!() }
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = BearerServer::builder(&b"a long and random secret"[..]).build(verifier())?;
//!
//!     let protected = Router::new()
//!         .route("/whoami", get(whoami))
//!         .layer(Extension(server.authenticator()));
//!
//!     let app = aliri_bearer_axum::router(server).merge(protected);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
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

use std::fmt;

use aliri_bearer::{
    error::AuthenticationError, BearerAuthenticator, BearerServer, RequestContext, Token,
    TokenError, TokenRequest,
};
use aliri_clock::Clock;
use axum::{
    async_trait,
    extract::{rejection::FormRejection, FromRequestParts, State},
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;

const JSON_UTF8: HeaderValue = HeaderValue::from_static("application/json; charset=utf-8");
const NO_STORE: HeaderValue = HeaderValue::from_static("no-store");

/// Constructs a router that serves the token endpoint at `POST /token`
pub fn router<C>(server: BearerServer<C>) -> Router
where
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/token", post(token_endpoint::<C>))
        .with_state(server)
}

/// Handles a form-encoded token request
///
/// Client credentials may be provided either in the body or with HTTP Basic
/// authentication. Responses to refresh grants are marked `no-store`.
///
/// JSON bodies escape `<`, `>`, and `&` as `\u` sequences so that they are
/// safe to embed in HTML.
#[tracing::instrument(skip_all)]
pub async fn token_endpoint<C>(
    State(server): State<BearerServer<C>>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response
where
    C: Clock + Send + Sync + 'static,
{
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            tracing::debug!(%rejection, "malformed token request");
            return error_response(TokenError::invalid_request(rejection.body_text()));
        }
    };

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let grant = match request.into_grant(authorization) {
        Ok(grant) => grant,
        Err(err) => {
            tracing::debug!(error = %err, "token request rejected");
            return error_response(err);
        }
    };

    let is_refresh = grant.is_refresh();
    let ctx = RequestContext::new(headers);

    match server.generate_token_response(grant, &ctx).await {
        Ok(resp) => json_response(StatusCode::OK, &resp, is_refresh),
        Err(err) => error_response(err),
    }
}

fn error_response(err: TokenError) -> Response {
    let (status, body) = err.into_parts();
    json_response(status, &body, false)
}

fn json_response<T: Serialize>(status: StatusCode, body: &T, no_store: bool) -> Response {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(%err, "unable to serialize token endpoint response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut resp = (status, escape_html(bytes)).into_response();
    resp.headers_mut().insert(header::CONTENT_TYPE, JSON_UTF8);
    if no_store {
        resp.headers_mut().insert(header::CACHE_CONTROL, NO_STORE);
    }
    resp
}

/// Escapes `<`, `>`, `&`, U+2028, and U+2029 in serialized JSON
///
/// These can only occur inside JSON strings, so the `\uXXXX` forms decode to
/// the same value.
fn escape_html(json: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(json.len());
    let mut rest = &json[..];
    loop {
        let (escaped, len): (&[u8], usize) = match rest {
            [] => break,
            [b'<', ..] => (br"\u003c", 1),
            [b'>', ..] => (br"\u003e", 1),
            [b'&', ..] => (br"\u0026", 1),
            [0xE2, 0x80, 0xA8, ..] => (br"\u2028", 3),
            [0xE2, 0x80, 0xA9, ..] => (br"\u2029", 3),
            [b, ..] => (std::slice::from_ref(b), 1),
        };
        out.extend_from_slice(escaped);
        rest = &rest[len..];
    }
    out
}

/// An extractor that authenticates the request's bearer token
///
/// Requires a [`BearerAuthenticator`] to be available as a request extension,
/// usually by adding `Extension(server.authenticator())` as a layer.
#[derive(Debug)]
pub struct Authenticated(pub Token);

/// The request could not be authenticated
#[derive(Debug)]
#[non_exhaustive]
pub enum AuthRejected {
    /// No authenticator has been configured for the route
    MissingAuthenticator,

    /// The bearer token was missing or invalid
    Unauthenticated(AuthenticationError),
}

impl fmt::Display for AuthRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAuthenticator => f.write_str("bearer authenticator missing"),
            Self::Unauthenticated(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for AuthRejected {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MissingAuthenticator => None,
            Self::Unauthenticated(err) => Some(err),
        }
    }
}

impl IntoResponse for AuthRejected {
    fn into_response(self) -> Response {
        match self {
            Self::MissingAuthenticator => {
                (StatusCode::INTERNAL_SERVER_ERROR, "bearer authenticator missing").into_response()
            }
            Self::Unauthenticated(err) => {
                let description = err.to_string();
                let challenge = if err.is_missing() {
                    HeaderValue::from_static("Bearer")
                } else {
                    www_authenticate_invalid_token(&description)
                };

                let mut resp = (StatusCode::UNAUTHORIZED, description).into_response();
                resp.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, challenge);
                resp
            }
        }
    }
}

fn www_authenticate_invalid_token(description: &str) -> HeaderValue {
    HeaderValue::try_from(format!(
        r#"Bearer error="invalid_token", error_description="{}""#,
        description.escape_default()
    ))
    .unwrap_or_else(|_| HeaderValue::from_static(r#"Bearer error="invalid_token""#))
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Sync,
{
    type Rejection = AuthRejected;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = parts
            .extensions
            .get::<BearerAuthenticator>()
            .ok_or(AuthRejected::MissingAuthenticator)?;

        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .map(|value| value.to_str().map_err(|_| AuthenticationError::MalformedHeader))
            .transpose()
            .map_err(AuthRejected::Unauthenticated)?;

        let token = authenticator
            .authenticate_header(authorization)
            .map_err(|err| {
                tracing::debug!(error = %err, "bearer authentication failed");
                AuthRejected::Unauthenticated(err)
            })?;

        Ok(Self(token))
    }
}
