use std::{error::Error as StdError, fmt, sync::Arc};

use aliri_clock::{Clock, DurationSecs, System};

use crate::{
    error::{BoxError, KeyRejected},
    issuer::{DEFAULT_REFRESH_TOKEN_TTL, DEFAULT_TOKEN_TTL},
    BearerAuthenticator, ChaCha20Poly1305Formatter, CredentialsVerifier, Grant, GrantType,
    RefreshToken, RequestContext, SecureFormatter, Token, TokenCodec, TokenError, TokenIssuer,
    TokenResponse, TokenType, BEARER_TOKEN_TYPE,
};

struct Inner<C> {
    issuer: TokenIssuer<C>,
    codec: TokenCodec,
    verifier: Arc<dyn CredentialsVerifier>,
}

/// An OAuth2 bearer token server
///
/// The server is stateless: every call to
/// [`generate_token_response`][BearerServer::generate_token_response] is
/// independent, and the only state shared between calls is the immutable
/// configuration fixed at construction. Cloning is cheap.
#[must_use]
pub struct BearerServer<C = System> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for BearerServer<C> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for BearerServer<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BearerServer")
            .field("issuer", &self.inner.issuer)
            .field("codec", &self.inner.codec)
            .finish_non_exhaustive()
    }
}

impl BearerServer {
    /// Begins configuring a server that seals tokens with a key derived from
    /// `secret`
    pub fn builder(secret: impl Into<Vec<u8>>) -> BearerServerBuilder {
        BearerServerBuilder {
            secret: secret.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            formatter: None,
            clock: System,
        }
    }
}

/// Configuration for a [`BearerServer`]
#[must_use]
pub struct BearerServerBuilder<C = System> {
    secret: Vec<u8>,
    token_ttl: DurationSecs,
    refresh_token_ttl: DurationSecs,
    formatter: Option<Arc<dyn SecureFormatter>>,
    clock: C,
}

impl<C: fmt::Debug> fmt::Debug for BearerServerBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BearerServerBuilder")
            .field("secret", &"***")
            .field("token_ttl", &self.token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("formatter", &self.formatter)
            .field("clock", &self.clock)
            .finish()
    }
}

impl<C> BearerServerBuilder<C> {
    /// Sets the lifetime of issued access tokens
    ///
    /// Defaults to one hour.
    pub fn token_ttl(mut self, ttl: DurationSecs) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Sets the lifetime of issued refresh tokens
    ///
    /// Defaults to one day.
    pub fn refresh_token_ttl(mut self, ttl: DurationSecs) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Seals tokens with the given formatter instead of the default
    /// [`ChaCha20Poly1305Formatter`]
    ///
    /// When a formatter is provided, the configured secret is not used.
    pub fn formatter(mut self, formatter: Arc<dyn SecureFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Stamps and checks tokens using the given clock
    pub fn clock<D>(self, clock: D) -> BearerServerBuilder<D> {
        BearerServerBuilder {
            secret: self.secret,
            token_ttl: self.token_ttl,
            refresh_token_ttl: self.refresh_token_ttl,
            formatter: self.formatter,
            clock,
        }
    }

    /// Builds the server around an application-supplied verifier
    ///
    /// # Errors
    ///
    /// No formatter was provided and the secret cannot be used to derive a
    /// sealing key.
    pub fn build(self, verifier: Arc<dyn CredentialsVerifier>) -> Result<BearerServer<C>, KeyRejected> {
        let formatter = match self.formatter {
            Some(formatter) => formatter,
            None => Arc::new(ChaCha20Poly1305Formatter::new(&self.secret)?),
        };

        let issuer =
            TokenIssuer::new(self.token_ttl, self.refresh_token_ttl).with_clock(self.clock);

        Ok(BearerServer {
            inner: Arc::new(Inner {
                issuer,
                codec: TokenCodec::new(formatter),
                verifier,
            }),
        })
    }
}

fn as_dyn_error(err: &BoxError) -> &(dyn StdError + 'static) {
    &**err
}

impl<C> BearerServer<C> {
    /// The issuer used to mint token pairs
    #[inline]
    pub fn issuer(&self) -> &TokenIssuer<C> {
        &self.inner.issuer
    }

    /// The codec used to seal token pairs
    #[inline]
    pub fn codec(&self) -> &TokenCodec {
        &self.inner.codec
    }

    /// Constructs an authenticator that accepts access tokens sealed by this
    /// server
    pub fn authenticator(&self) -> BearerAuthenticator<C>
    where
        C: Clone,
    {
        BearerAuthenticator::new(self.inner.codec.clone()).with_clock(self.inner.issuer.clock().clone())
    }
}

impl<C: Clock + Send + Sync + 'static> BearerServer<C> {
    /// Evaluates a grant, producing either a sealed token pair or an
    /// RFC 6749 error
    ///
    /// A token pair is only returned once it has been stored by the
    /// verifier, sealed, and decorated with any properties. A failure at any
    /// of those stages produces a `server_error` and the pair is discarded.
    #[tracing::instrument(
        skip_all,
        fields(grant_type = grant.grant_type().map_or("unsupported", GrantType::as_str)),
    )]
    pub async fn generate_token_response(
        &self,
        grant: Grant,
        ctx: &RequestContext,
    ) -> Result<TokenResponse, TokenError> {
        let verifier = &*self.inner.verifier;

        let (token, refresh) = match grant {
            Grant::Password {
                username,
                password,
                scope,
            } => {
                verifier
                    .validate_user(&username, &password, &scope, ctx)
                    .await
                    .map_err(|err| {
                        tracing::warn!(error = as_dyn_error(&err), "user credentials rejected");
                        TokenError::invalid_grant("invalid username or password")
                    })?;

                self.generate_tokens(TokenType::User, &username, &scope, ctx)
                    .await?
            }
            Grant::ClientCredentials {
                client_id,
                client_secret,
                scope,
            } => {
                verifier
                    .validate_client(&client_id, &client_secret, &scope, ctx)
                    .await
                    .map_err(|err| {
                        tracing::warn!(
                            error = as_dyn_error(&err),
                            client_id = %client_id,
                            "client credentials rejected"
                        );
                        TokenError::invalid_grant("invalid username or password")
                    })?;

                self.generate_tokens(TokenType::Client, client_id.as_str(), &scope, ctx)
                    .await?
            }
            Grant::AuthorizationCode {
                client_id,
                client_secret,
                code,
                redirect_uri,
                scope,
            } => {
                let code_verifier = verifier.authorization_code_verifier().ok_or_else(|| {
                    tracing::debug!("verifier does not support authorization codes");
                    TokenError::unsupported_grant_type()
                })?;

                let subject = code_verifier
                    .validate_code(
                        &client_id,
                        client_secret.as_deref(),
                        &code,
                        redirect_uri.as_deref(),
                        ctx,
                    )
                    .await
                    .map_err(|err| {
                        tracing::warn!(
                            error = as_dyn_error(&err),
                            client_id = %client_id,
                            "authorization code rejected"
                        );
                        TokenError::invalid_request("invalid username or password")
                    })?;

                self.generate_tokens(TokenType::AuthCode, &subject, &scope, ctx)
                    .await?
            }
            Grant::RefreshToken { refresh_token } => {
                let prior = self.unseal_live_refresh_token(&refresh_token)?;

                verifier
                    .validate_token_id(
                        prior.token_type(),
                        prior.credential(),
                        prior.token_id(),
                        prior.id(),
                    )
                    .await
                    .map_err(|err| {
                        tracing::warn!(
                            error = as_dyn_error(&err),
                            refresh_token.id = %prior.id(),
                            "refresh token rejected by verifier"
                        );
                        TokenError::invalid_request("refresh token is invalid or expired")
                    })?;

                self.inner.issuer.refresh_tokens(
                    prior.token_type(),
                    prior.credential(),
                    prior.scope(),
                    prior.claims().clone(),
                )
            }
            Grant::Unsupported { grant_type } => {
                tracing::debug!(requested = %grant_type, "unsupported grant type");
                return Err(TokenError::unsupported_grant_type());
            }
        };

        self.complete(token, refresh, ctx).await
    }

    async fn generate_tokens(
        &self,
        token_type: TokenType,
        credential: &str,
        scope: &str,
        ctx: &RequestContext,
    ) -> Result<(Token, RefreshToken), TokenError> {
        self.inner
            .issuer
            .generate_tokens(&*self.inner.verifier, token_type, credential, scope, ctx)
            .await
            .map_err(|err| {
                tracing::error!(error = as_dyn_error(&err), "unable to compute token claims");
                TokenError::server_error(format!("token generation failed, check claims: {err}"))
            })
    }

    fn unseal_live_refresh_token(
        &self,
        sealed: &crate::SealedRefreshTokenRef,
    ) -> Result<RefreshToken, TokenError> {
        let invalid = || TokenError::invalid_request("refresh token is invalid or expired");

        let refresh = self.inner.codec.unseal_refresh_token(sealed).map_err(|err| {
            let error: &(dyn StdError + 'static) = &err;
            tracing::warn!(error, "unable to unseal refresh token");
            invalid()
        })?;

        if refresh.is_expired_with_clock(self.inner.issuer.clock()) {
            tracing::warn!(
                refresh_token.id = %refresh.id(),
                refresh_token.expiry = refresh.expiry().0,
                "refresh token expired"
            );
            return Err(invalid());
        }

        Ok(refresh)
    }

    async fn complete(
        &self,
        token: Token,
        refresh: RefreshToken,
        ctx: &RequestContext,
    ) -> Result<TokenResponse, TokenError> {
        let verifier = &*self.inner.verifier;

        verifier
            .store_token_id(
                token.token_type(),
                token.credential(),
                token.id(),
                refresh.id(),
            )
            .await
            .map_err(|err| {
                tracing::error!(error = as_dyn_error(&err), "unable to store token id");
                TokenError::server_error(format!("storing Token id failed: {err}"))
            })?;

        let seal_failed = |err: crate::error::SealError| {
            let error: &(dyn StdError + 'static) = &err;
            tracing::error!(error, "unable to seal token");
            TokenError::server_error(format!(
                "token generation failed, check security provider: {err}"
            ))
        };

        let access_token = self.inner.codec.seal_token(&token).map_err(seal_failed)?;
        let refresh_token = self
            .inner
            .codec
            .seal_refresh_token(&refresh)
            .map_err(seal_failed)?;

        let properties = verifier
            .add_properties(
                token.token_type(),
                token.credential(),
                token.id(),
                token.scope(),
                ctx,
            )
            .await
            .map_err(|err| {
                tracing::error!(error = as_dyn_error(&err), "unable to compute response properties");
                TokenError::server_error(format!(
                    "token generation failed, check security provider: {err}"
                ))
            })?;

        tracing::debug!(
            token.id = %token.id(),
            token.kind = token.token_type().as_str(),
            refresh_token.id = %refresh.id(),
            "issued token pair"
        );

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: BEARER_TOKEN_TYPE.to_owned(),
            expires_in: token.ttl(),
            refresh_token_expires_in: refresh.ttl(),
            properties,
        })
    }
}
