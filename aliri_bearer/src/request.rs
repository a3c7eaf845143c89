//! Shaping of raw token endpoint requests into [`Grant`]s
//!
//! Clients may authenticate either with an HTTP Basic `Authorization` header
//! or by including their credentials in the request body. Which source wins
//! depends on the grant type:
//!
//! * `password` and `refresh_token` consult the header first and fall back to
//!   the body,
//! * `client_credentials` consults the body first and falls back to the
//!   header,
//! * `authorization_code` uses the body `client_id` when present (the secret
//!   is optional) and otherwise falls back to the header.

use aliri_base64::Base64;
use serde::{Deserialize, Serialize};

use crate::{
    error::{self, MalformedBasicAuth},
    AuthorizationCode, ClientId, ClientSecret, Grant, GrantType, Password, SealedRefreshToken,
    TokenError,
};

/// A form-encoded token endpoint request body
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    /// The requested grant type
    pub grant_type: Option<String>,
    /// The resource owner's username
    pub username: Option<String>,
    /// The resource owner's password
    pub password: Option<Password>,
    /// The client ID
    pub client_id: Option<ClientId>,
    /// The client secret
    pub client_secret: Option<ClientSecret>,
    /// The authorization code
    pub code: Option<AuthorizationCode>,
    /// The redirect URI used in the authorization request
    pub redirect_uri: Option<String>,
    /// The requested scope
    pub scope: Option<String>,
    /// The sealed refresh token
    pub refresh_token: Option<SealedRefreshToken>,
}

/// A username and password pair from an HTTP Basic `Authorization` header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicCredentials {
    /// The user ID, either a username or a client ID
    pub user_id: String,
    /// The password, either a user password or a client secret
    pub password: String,
}

impl BasicCredentials {
    /// Parses the value of an `Authorization` header
    ///
    /// Returns `Ok(None)` if the header does not use the Basic scheme or does
    /// not contain a `:` separated pair after a non-empty user ID.
    ///
    /// # Errors
    ///
    /// The header uses the Basic scheme, but its payload is not valid base64
    /// or does not decode to UTF-8.
    pub fn from_header_value(value: &str) -> Result<Option<Self>, MalformedBasicAuth> {
        let payload = match value.get(..6) {
            Some(scheme) if scheme.eq_ignore_ascii_case("basic ") => &value[6..],
            _ => return Ok(None),
        };

        let decoded = Base64::from_encoded(payload.trim()).map_err(error::malformed_basic_auth)?;
        let decoded =
            String::from_utf8(decoded.into_inner()).map_err(error::malformed_basic_auth)?;

        match decoded.split_once(':') {
            Some((user_id, password)) if !user_id.is_empty() => Ok(Some(Self {
                user_id: user_id.to_owned(),
                password: password.to_owned(),
            })),
            _ => Ok(None),
        }
    }
}

fn non_empty<T: AsRef<str>>(value: Option<T>) -> Option<T> {
    value.filter(|v| !v.as_ref().is_empty())
}

impl TokenRequest {
    /// Shapes the request into a grant, taking client credentials from the
    /// `Authorization` header value where appropriate
    ///
    /// # Errors
    ///
    /// The request lacks the credentials or parameters its grant type
    /// requires, or the `Authorization` header is malformed.
    pub fn into_grant(self, authorization: Option<&str>) -> Result<Grant, TokenError> {
        let grant_type = match self.grant_type.as_deref().map(str::parse::<GrantType>) {
            Some(Ok(grant_type)) => grant_type,
            Some(Err(_)) | None => {
                return Ok(Grant::Unsupported {
                    grant_type: self.grant_type.unwrap_or_default(),
                })
            }
        };

        let basic = || -> Result<Option<BasicCredentials>, TokenError> {
            authorization
                .map(BasicCredentials::from_header_value)
                .transpose()
                .map(Option::flatten)
                .map_err(|_| TokenError::invalid_client("invalid client id or secret"))
        };

        let scope = self.scope.unwrap_or_default();

        match grant_type {
            GrantType::Password => {
                let (username, password) = match basic()? {
                    Some(creds) if !creds.password.is_empty() => {
                        (creds.user_id, Password::new(creds.password))
                    }
                    _ => match (non_empty(self.username), non_empty(self.password)) {
                        (Some(username), Some(password)) => (username, password),
                        _ => {
                            return Err(TokenError::invalid_client(
                                "invalid username or password",
                            ))
                        }
                    },
                };

                Ok(Grant::Password {
                    username,
                    password,
                    scope,
                })
            }
            GrantType::ClientCredentials => {
                let (client_id, client_secret) =
                    match (non_empty(self.client_id), non_empty(self.client_secret)) {
                        (Some(id), Some(secret)) => (id, secret),
                        _ => match basic()? {
                            Some(creds) if !creds.password.is_empty() => (
                                ClientId::new(creds.user_id),
                                ClientSecret::new(creds.password),
                            ),
                            _ => {
                                return Err(TokenError::invalid_client(
                                    "invalid client id or secret",
                                ))
                            }
                        },
                    };

                Ok(Grant::ClientCredentials {
                    client_id,
                    client_secret,
                    scope,
                })
            }
            GrantType::AuthorizationCode => {
                let (client_id, client_secret) = match non_empty(self.client_id) {
                    Some(id) => (id, non_empty(self.client_secret)),
                    None => match basic()? {
                        Some(creds) => (
                            ClientId::new(creds.user_id),
                            non_empty(Some(ClientSecret::new(creds.password))),
                        ),
                        None => {
                            return Err(TokenError::invalid_client("invalid client id or secret"))
                        }
                    },
                };

                let code = non_empty(self.code)
                    .ok_or_else(|| TokenError::invalid_request("authorization code is missing"))?;

                Ok(Grant::AuthorizationCode {
                    client_id,
                    client_secret,
                    code,
                    redirect_uri: non_empty(self.redirect_uri),
                    scope,
                })
            }
            GrantType::RefreshToken => {
                let refresh_token = non_empty(self.refresh_token)
                    .ok_or_else(|| TokenError::invalid_request("refresh token is missing"))?;

                Ok(Grant::RefreshToken { refresh_token })
            }
        }
    }
}
