use aliri_clock::{Clock, DurationSecs, System};

use crate::{
    error::BoxError, Claims, CredentialsVerifier, RefreshToken, RequestContext, Token, TokenId,
    TokenType,
};

/// Default lifetime of an access token
pub const DEFAULT_TOKEN_TTL: DurationSecs = DurationSecs(60 * 60);

/// Default lifetime of a refresh token
pub const DEFAULT_REFRESH_TOKEN_TTL: DurationSecs = DurationSecs(24 * 60 * 60);

/// Mints new token pairs
#[derive(Clone, Debug)]
pub struct TokenIssuer<C = System> {
    token_ttl: DurationSecs,
    refresh_token_ttl: DurationSecs,
    clock: C,
}

impl Default for TokenIssuer {
    /// Issues tokens valid for one hour and refresh tokens valid for one day,
    /// using the system clock
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_TTL, DEFAULT_REFRESH_TOKEN_TTL)
    }
}

impl TokenIssuer {
    /// Constructs an issuer with the given lifetimes
    pub fn new(token_ttl: DurationSecs, refresh_token_ttl: DurationSecs) -> Self {
        Self {
            token_ttl,
            refresh_token_ttl,
            clock: System,
        }
    }
}

impl<C> TokenIssuer<C> {
    /// Replaces the clock used to stamp new tokens
    pub fn with_clock<D>(self, clock: D) -> TokenIssuer<D> {
        TokenIssuer {
            token_ttl: self.token_ttl,
            refresh_token_ttl: self.refresh_token_ttl,
            clock,
        }
    }

    /// The lifetime of newly issued access tokens
    #[inline]
    pub fn token_ttl(&self) -> DurationSecs {
        self.token_ttl
    }

    /// The lifetime of newly issued refresh tokens
    #[inline]
    pub fn refresh_token_ttl(&self) -> DurationSecs {
        self.refresh_token_ttl
    }

    /// The clock used to stamp new tokens
    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> TokenIssuer<C> {
    /// Mints a new token pair, obtaining claims from the verifier
    ///
    /// # Errors
    ///
    /// The verifier failed to provide claims.
    pub async fn generate_tokens(
        &self,
        verifier: &dyn CredentialsVerifier,
        token_type: TokenType,
        credential: &str,
        scope: &str,
        ctx: &RequestContext,
    ) -> Result<(Token, RefreshToken), BoxError> {
        let id = TokenId::generate();
        let claims = verifier
            .add_claims(token_type, credential, &id, scope, ctx)
            .await?;

        Ok(self.mint(id, token_type, credential, scope, claims))
    }

    /// Mints a new token pair carrying over claims from a prior refresh token
    pub fn refresh_tokens(
        &self,
        token_type: TokenType,
        credential: &str,
        scope: &str,
        claims: Claims,
    ) -> (Token, RefreshToken) {
        self.mint(TokenId::generate(), token_type, credential, scope, claims)
    }

    fn mint(
        &self,
        id: TokenId,
        token_type: TokenType,
        credential: &str,
        scope: &str,
        claims: Claims,
    ) -> (Token, RefreshToken) {
        let token = Token::new(
            id,
            token_type,
            credential.to_owned(),
            scope.to_owned(),
            claims,
            self.clock.now(),
            self.token_ttl,
        );
        let refresh = RefreshToken::new(TokenId::generate(), &token, self.refresh_token_ttl);
        (token, refresh)
    }
}
