//! Authentication of bearer tokens presented to protected resources

use aliri_clock::{Clock, System};

use crate::{error::AuthenticationError, SealedAccessTokenRef, Token, TokenCodec};

/// Authenticates sealed access tokens
///
/// An authenticator accepts only tokens sealed with the same formatter that
/// issued them, and rejects those whose lifetime has elapsed.
#[derive(Clone, Debug)]
pub struct BearerAuthenticator<C = System> {
    codec: TokenCodec,
    clock: C,
}

impl BearerAuthenticator {
    /// Constructs an authenticator using the system clock
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec,
            clock: System,
        }
    }
}

impl<C> BearerAuthenticator<C> {
    /// Checks token expiry against the given clock
    pub fn with_clock<D>(self, clock: D) -> BearerAuthenticator<D> {
        BearerAuthenticator {
            codec: self.codec,
            clock,
        }
    }
}

impl<C: Clock> BearerAuthenticator<C> {
    /// Authenticates the value of an `Authorization` header
    ///
    /// # Errors
    ///
    /// The header is missing, does not use the `Bearer` scheme, or carries a
    /// token that is invalid or expired.
    pub fn authenticate_header(&self, authorization: Option<&str>) -> Result<Token, AuthenticationError> {
        let authorization = authorization.ok_or(AuthenticationError::MissingToken)?;
        let sealed = extract_bearer(authorization).ok_or(AuthenticationError::MalformedHeader)?;
        self.authenticate(sealed)
    }

    /// Authenticates a sealed access token
    ///
    /// # Errors
    ///
    /// The token cannot be unsealed or has expired.
    pub fn authenticate(&self, sealed: &SealedAccessTokenRef) -> Result<Token, AuthenticationError> {
        let token = self.codec.unseal_token(sealed)?;

        if token.is_expired_with_clock(&self.clock) {
            tracing::debug!(
                token.id = %token.id(),
                token.expiry = token.expiry().0,
                "bearer token expired"
            );
            return Err(AuthenticationError::Expired);
        }

        Ok(token)
    }
}

fn extract_bearer(auth: &str) -> Option<&SealedAccessTokenRef> {
    let token = match (auth.get(..7), auth.get(7..)) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer ") => token.trim(),
        _ => return None,
    };

    if token.is_empty() {
        None
    } else {
        Some(SealedAccessTokenRef::from_str(token))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aliri_clock::{DurationSecs, UnixTime};
    use color_eyre::Result;

    use super::*;
    use crate::{
        test::{self, FixedClock, StubVerifier},
        BearerServer, Grant, Password, RequestContext,
    };

    async fn issue(at: u64) -> Result<(BearerServer<FixedClock>, String)> {
        let server = BearerServer::builder(test::SECRET_KEY)
            .token_ttl(DurationSecs(60))
            .clock(FixedClock(UnixTime(at)))
            .build(Arc::new(StubVerifier::default()))?;

        let resp = server
            .generate_token_response(
                Grant::Password {
                    username: test::USERNAME.into(),
                    password: Password::from_static(test::PASSWORD),
                    scope: "read".into(),
                },
                &RequestContext::default(),
            )
            .await?;

        Ok((server, resp.access_token.take()))
    }

    #[tokio::test]
    async fn accepts_live_token() -> Result<()> {
        let (server, token) = issue(1_000).await?;
        let authn = server.authenticator().with_clock(FixedClock(UnixTime(1_060)));

        let token = authn.authenticate_header(Some(&format!("Bearer {token}")))?;
        assert_eq!(token.credential(), test::USERNAME);
        assert_eq!(token.scope(), "read");
        Ok(())
    }

    #[tokio::test]
    async fn scheme_is_case_insensitive() -> Result<()> {
        let (server, token) = issue(1_000).await?;
        let authn = server.authenticator();

        authn.authenticate_header(Some(&format!("bEaReR   {token} ")))?;
        Ok(())
    }

    #[tokio::test]
    async fn rejects_expired_token() -> Result<()> {
        let (server, token) = issue(1_000).await?;
        let authn = server.authenticator().with_clock(FixedClock(UnixTime(1_061)));

        let err = authn
            .authenticate_header(Some(&format!("Bearer {token}")))
            .unwrap_err();
        assert!(matches!(err, AuthenticationError::Expired));
        Ok(())
    }

    #[tokio::test]
    async fn rejects_refresh_token_as_access_token() -> Result<()> {
        let (server, _) = issue(1_000).await?;
        let resp = server
            .generate_token_response(
                Grant::Password {
                    username: test::USERNAME.into(),
                    password: Password::from_static(test::PASSWORD),
                    scope: String::new(),
                },
                &RequestContext::default(),
            )
            .await?;

        let err = server
            .authenticator()
            .authenticate_header(Some(&format!("Bearer {}", resp.refresh_token.as_str())))
            .unwrap_err();
        assert!(matches!(err, AuthenticationError::InvalidToken(_)));
        Ok(())
    }

    #[tokio::test]
    async fn classifies_header_problems() -> Result<()> {
        let (server, _) = issue(1_000).await?;
        let authn = server.authenticator();

        assert!(authn.authenticate_header(None).unwrap_err().is_missing());
        assert!(matches!(
            authn.authenticate_header(Some("Basic Zm9vOmJhcg==")),
            Err(AuthenticationError::MalformedHeader)
        ));
        assert!(matches!(
            authn.authenticate_header(Some("Bearer ")),
            Err(AuthenticationError::MalformedHeader)
        ));
        assert!(matches!(
            authn.authenticate_header(Some("Bearer not-a-token")),
            Err(AuthenticationError::InvalidToken(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn non_ascii_header_is_malformed() -> Result<()> {
        let (server, _) = issue(1_000).await?;
        let authn = server.authenticator();

        assert!(matches!(
            authn.authenticate_header(Some("Beareréabc")),
            Err(AuthenticationError::MalformedHeader)
        ));
        assert!(matches!(
            authn.authenticate_header(Some("ébearer abc")),
            Err(AuthenticationError::MalformedHeader)
        ));
        assert!(matches!(
            authn.authenticate_header(Some("Bearer é")),
            Err(AuthenticationError::InvalidToken(_))
        ));
        Ok(())
    }
}
