use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{AuthorizationCode, ClientId, ClientSecret, Password, SealedRefreshToken};

/// An OAuth2 grant type
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// The resource owner password credentials grant
    Password,
    /// The client credentials grant
    ClientCredentials,
    /// The authorization code grant
    AuthorizationCode,
    /// The refresh token grant
    RefreshToken,
}

impl GrantType {
    /// The grant type as it appears in the `grant_type` parameter
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The grant type is not one this server understands
#[derive(Debug, thiserror::Error)]
#[error("unsupported grant type '{grant_type}'")]
pub struct UnknownGrantType {
    grant_type: String,
}

impl FromStr for GrantType {
    type Err = UnknownGrantType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(Self::Password),
            "client_credentials" => Ok(Self::ClientCredentials),
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            _ => Err(UnknownGrantType {
                grant_type: s.to_owned(),
            }),
        }
    }
}

/// A grant request with credentials already extracted from the transport
#[derive(Debug)]
#[non_exhaustive]
pub enum Grant {
    /// Resource owner password credentials
    Password {
        /// The resource owner's username
        username: String,
        /// The resource owner's password
        password: Password,
        /// The requested scope
        scope: String,
    },
    /// Client credentials
    ClientCredentials {
        /// The client ID
        client_id: ClientId,
        /// The client secret
        client_secret: ClientSecret,
        /// The requested scope
        scope: String,
    },
    /// An authorization code exchange
    AuthorizationCode {
        /// The client ID
        client_id: ClientId,
        /// The client secret, if the client is confidential
        client_secret: Option<ClientSecret>,
        /// The authorization code
        code: AuthorizationCode,
        /// The redirect URI used in the authorization request
        redirect_uri: Option<String>,
        /// The requested scope
        scope: String,
    },
    /// A refresh token exchange
    RefreshToken {
        /// The sealed refresh token
        refresh_token: SealedRefreshToken,
    },
    /// A grant type this server does not support
    Unsupported {
        /// The grant type as requested
        grant_type: String,
    },
}

impl Grant {
    /// The grant type, if supported
    #[must_use]
    pub fn grant_type(&self) -> Option<GrantType> {
        match self {
            Self::Password { .. } => Some(GrantType::Password),
            Self::ClientCredentials { .. } => Some(GrantType::ClientCredentials),
            Self::AuthorizationCode { .. } => Some(GrantType::AuthorizationCode),
            Self::RefreshToken { .. } => Some(GrantType::RefreshToken),
            Self::Unsupported { .. } => None,
        }
    }

    /// Whether this grant is a refresh token exchange
    #[must_use]
    pub fn is_refresh(&self) -> bool {
        matches!(self, Self::RefreshToken { .. })
    }
}
