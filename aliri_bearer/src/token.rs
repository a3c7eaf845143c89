use aliri_clock::{Clock, DurationSecs, System, UnixTime};
use serde::{Deserialize, Serialize};

use crate::{TokenId, TokenIdRef};

/// Verifier-defined data embedded in a token and carried through refreshes
///
/// The contents are never interpreted by this crate.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Verifier-defined data attached to a token response, but never sealed into
/// the token itself
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// The kind of subject a token was issued to
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    /// Issued to a resource owner through the password grant
    #[serde(rename = "U")]
    User,
    /// Issued to a client through the client credentials grant
    #[serde(rename = "C")]
    Client,
    /// Issued to the subject resolved from an authorization code
    #[serde(rename = "A")]
    AuthCode,
}

impl TokenType {
    /// The short code used to represent this token type
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "U",
            Self::Client => "C",
            Self::AuthCode => "A",
        }
    }
}

/// An access token before sealing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Token {
    id: TokenId,
    credential: String,
    #[serde(rename = "type")]
    token_type: TokenType,
    scope: String,
    claims: Claims,
    created: UnixTime,
    ttl: DurationSecs,
}

/// A refresh token before sealing
///
/// The refresh token refers back to the access token it was issued alongside
/// by identifier only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshToken {
    id: TokenId,
    token_id: TokenId,
    credential: String,
    #[serde(rename = "type")]
    token_type: TokenType,
    scope: String,
    claims: Claims,
    created: UnixTime,
    ttl: DurationSecs,
}

fn saturating_expiry(created: UnixTime, ttl: DurationSecs) -> UnixTime {
    UnixTime(created.0.saturating_add(ttl.0))
}

impl Token {
    pub(crate) fn new(
        id: TokenId,
        token_type: TokenType,
        credential: String,
        scope: String,
        claims: Claims,
        created: UnixTime,
        ttl: DurationSecs,
    ) -> Self {
        Self {
            id,
            credential,
            token_type,
            scope,
            claims,
            created,
            ttl,
        }
    }

    /// The token's unique identifier
    #[inline]
    pub fn id(&self) -> &TokenIdRef {
        &self.id
    }

    /// The authenticated subject, either a username or a client ID
    #[inline]
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// The kind of subject this token was issued to
    #[inline]
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// The scope granted to this token
    #[inline]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The claims attached by the verifier when the token was minted
    #[inline]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// The time that the token was issued
    #[inline]
    pub fn created(&self) -> UnixTime {
        self.created
    }

    /// The token's lifetime
    #[inline]
    pub fn ttl(&self) -> DurationSecs {
        self.ttl
    }

    /// The time after which the token is no longer valid
    #[inline]
    pub fn expiry(&self) -> UnixTime {
        saturating_expiry(self.created, self.ttl)
    }

    /// Whether the token has expired
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_clock(&System)
    }

    /// Whether the token has expired based on the current time as reported
    /// by the provided clock
    #[inline]
    pub fn is_expired_with_clock<C: Clock>(&self, clock: &C) -> bool {
        self.is_expired_at(clock.now())
    }

    /// Whether the token would be expired as of the provided time
    #[inline]
    pub fn is_expired_at(&self, time: UnixTime) -> bool {
        time > self.expiry()
    }

    /// Gets a duration for how much longer the token would be valid as of the
    /// provided time
    #[inline]
    pub fn until_expired_at(&self, time: UnixTime) -> DurationSecs {
        let expiry = self.expiry();
        if time < expiry {
            expiry - time
        } else {
            DurationSecs(0)
        }
    }
}

impl RefreshToken {
    pub(crate) fn new(id: TokenId, token: &Token, ttl: DurationSecs) -> Self {
        Self {
            id,
            token_id: token.id.clone(),
            credential: token.credential.clone(),
            token_type: token.token_type,
            scope: token.scope.clone(),
            claims: token.claims.clone(),
            created: token.created,
            ttl,
        }
    }

    /// The refresh token's unique identifier
    #[inline]
    pub fn id(&self) -> &TokenIdRef {
        &self.id
    }

    /// The identifier of the access token this refresh token was issued with
    #[inline]
    pub fn token_id(&self) -> &TokenIdRef {
        &self.token_id
    }

    /// The authenticated subject, either a username or a client ID
    #[inline]
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// The kind of subject this refresh token was issued to
    #[inline]
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// The scope granted to this refresh token
    #[inline]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The claims copied from the issuing access token
    #[inline]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// The time that the refresh token was issued
    #[inline]
    pub fn created(&self) -> UnixTime {
        self.created
    }

    /// The refresh token's lifetime
    #[inline]
    pub fn ttl(&self) -> DurationSecs {
        self.ttl
    }

    /// The time after which the refresh token is no longer valid
    #[inline]
    pub fn expiry(&self) -> UnixTime {
        saturating_expiry(self.created, self.ttl)
    }

    /// Whether the refresh token has expired
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_clock(&System)
    }

    /// Whether the refresh token has expired based on the current time as
    /// reported by the provided clock
    #[inline]
    pub fn is_expired_with_clock<C: Clock>(&self, clock: &C) -> bool {
        self.is_expired_at(clock.now())
    }

    /// Whether the refresh token would be expired as of the provided time
    #[inline]
    pub fn is_expired_at(&self, time: UnixTime) -> bool {
        time > self.expiry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(created: u64, ttl: u64) -> Token {
        Token::new(
            TokenId::from_static("a0c5b07c-97a3-4a4b-8d06-9c3bb3d3c1f5"),
            TokenType::User,
            "alice".into(),
            "read".into(),
            Claims::new(),
            UnixTime(created),
            DurationSecs(ttl),
        )
    }

    #[test]
    fn token_in_the_past_is_expired() {
        let t = token(1_000, 60);
        assert!(t.is_expired_at(UnixTime(1_061)));
        assert!(t.is_expired_at(UnixTime(5_000)));
    }

    #[test]
    fn token_within_lifetime_is_not_expired() {
        let t = token(1_000, 60);
        assert!(!t.is_expired_at(UnixTime(1_000)));
        assert!(!t.is_expired_at(UnixTime(1_059)));
        assert!(!t.is_expired_at(UnixTime(1_060)));
    }

    #[test]
    fn token_issued_now_is_not_expired_by_system_clock() {
        let t = token(System.now().0, 3600);
        assert!(!t.is_expired());
    }

    #[test]
    fn oversized_lifetime_saturates() {
        let t = token(1_000, u64::MAX);
        assert_eq!(t.expiry(), UnixTime(u64::MAX));
        assert!(!t.is_expired_at(UnixTime(u64::MAX)));
        assert_eq!(t.until_expired_at(UnixTime(1_000)), DurationSecs(u64::MAX - 1_000));

        let r = RefreshToken::new(TokenId::generate(), &t, DurationSecs(u64::MAX));
        assert_eq!(r.expiry(), UnixTime(u64::MAX));
        assert!(!r.is_expired_at(UnixTime(2_000)));
    }

    #[test]
    fn until_expired_counts_down_to_zero() {
        let t = token(1_000, 60);
        assert_eq!(t.until_expired_at(UnixTime(1_030)), DurationSecs(30));
        assert_eq!(t.until_expired_at(UnixTime(2_000)), DurationSecs(0));
    }

    #[test]
    fn refresh_token_copies_issuing_token_fields() {
        let mut claims = Claims::new();
        claims.insert("tenant".into(), "acme".into());
        let t = Token::new(
            TokenId::generate(),
            TokenType::Client,
            "client-1".into(),
            "read write".into(),
            claims,
            UnixTime(1_000),
            DurationSecs(60),
        );

        let r = RefreshToken::new(TokenId::generate(), &t, DurationSecs(600));

        assert_eq!(r.token_id(), t.id());
        assert_ne!(r.id(), t.id());
        assert_eq!(r.credential(), "client-1");
        assert_eq!(r.token_type(), TokenType::Client);
        assert_eq!(r.scope(), "read write");
        assert_eq!(r.claims(), t.claims());
        assert_eq!(r.expiry(), UnixTime(1_600));
        assert!(!r.is_expired_at(UnixTime(1_100)));
    }

    #[test]
    fn token_type_uses_short_codes() {
        assert_eq!(serde_json::to_string(&TokenType::User).unwrap(), "\"U\"");
        assert_eq!(serde_json::to_string(&TokenType::Client).unwrap(), "\"C\"");
        assert_eq!(serde_json::to_string(&TokenType::AuthCode).unwrap(), "\"A\"");
        assert_eq!(TokenType::AuthCode.as_str(), "A");
    }
}
