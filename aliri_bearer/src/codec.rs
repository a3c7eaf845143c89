//! Sealing of tokens into opaque strings
//!
//! Sealing is split into two layers. A [`SecureFormatter`] is the
//! cryptographic strategy: it turns plaintext bytes into authenticated,
//! confidential bytes and back. A [`TokenCodec`] wraps a formatter and is
//! responsible for the structure: it serializes a [`Token`] or
//! [`RefreshToken`], seals it, and encodes the result as unpadded base64url.
//!
//! Formatters are selected at construction and shared behind an [`Arc`], so
//! they must hold no per-call mutable state.

use std::{fmt, sync::Arc};

use aliri_base64::Base64Url;

use crate::{
    error::{self, DecodeError, SealError},
    RefreshToken, SealedAccessToken, SealedAccessTokenRef, SealedRefreshToken,
    SealedRefreshTokenRef, Token,
};

mod chacha;

pub use chacha::ChaCha20Poly1305Formatter;

/// What a sealed value is intended to be used as
///
/// Formatters must bind the purpose to the sealed value so that a value
/// sealed for one purpose cannot be unsealed for another.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Purpose {
    /// An access token
    AccessToken,
    /// A refresh token
    RefreshToken,
}

impl Purpose {
    /// A stable byte representation, suitable as associated data
    #[must_use]
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::AccessToken => b"aliri_bearer/access_token",
            Self::RefreshToken => b"aliri_bearer/refresh_token",
        }
    }
}

/// A strategy for sealing and unsealing token payloads
///
/// Implementations must provide confidentiality and integrity: a sealed
/// value must not reveal its plaintext, and any alteration must be detected
/// by [`unseal`][SecureFormatter::unseal].
pub trait SecureFormatter: fmt::Debug + Send + Sync {
    /// Seals the plaintext for the given purpose
    fn seal(&self, purpose: Purpose, plaintext: &[u8]) -> Result<Vec<u8>, SealError>;

    /// Unseals a value previously produced by [`seal`][SecureFormatter::seal]
    /// for the same purpose
    fn unseal(&self, purpose: Purpose, sealed: &[u8]) -> Result<Vec<u8>, DecodeError>;
}

/// Seals and unseals tokens using a configured formatter
#[derive(Clone, Debug)]
pub struct TokenCodec {
    formatter: Arc<dyn SecureFormatter>,
}

impl TokenCodec {
    /// Constructs a codec around the given formatter
    pub fn new(formatter: Arc<dyn SecureFormatter>) -> Self {
        Self { formatter }
    }

    /// Seals an access token
    pub fn seal_token(&self, token: &Token) -> Result<SealedAccessToken, SealError> {
        self.seal(Purpose::AccessToken, token)
            .map(SealedAccessToken::new)
    }

    /// Seals a refresh token
    pub fn seal_refresh_token(&self, token: &RefreshToken) -> Result<SealedRefreshToken, SealError> {
        self.seal(Purpose::RefreshToken, token)
            .map(SealedRefreshToken::new)
    }

    /// Unseals an access token
    pub fn unseal_token(&self, sealed: &SealedAccessTokenRef) -> Result<Token, DecodeError> {
        self.unseal(Purpose::AccessToken, sealed.as_str())
    }

    /// Unseals a refresh token
    pub fn unseal_refresh_token(
        &self,
        sealed: &SealedRefreshTokenRef,
    ) -> Result<RefreshToken, DecodeError> {
        self.unseal(Purpose::RefreshToken, sealed.as_str())
    }

    fn seal<T: serde::Serialize>(&self, purpose: Purpose, value: &T) -> Result<String, SealError> {
        let plaintext = serde_json::to_vec(value).map_err(error::seal_error)?;
        let sealed = self.formatter.seal(purpose, &plaintext)?;
        Ok(Base64Url::from_raw(sealed).to_string())
    }

    fn unseal<T: serde::de::DeserializeOwned>(
        &self,
        purpose: Purpose,
        sealed: &str,
    ) -> Result<T, DecodeError> {
        let raw = Base64Url::from_encoded(sealed).map_err(error::decode_error)?;
        let plaintext = self.formatter.unseal(purpose, raw.as_slice())?;
        serde_json::from_slice(&plaintext).map_err(error::decode_error)
    }
}

#[cfg(test)]
mod tests {
    use aliri_clock::{DurationSecs, UnixTime};
    use color_eyre::Result;

    use super::*;
    use crate::{Claims, TokenId, TokenType};

    fn codec() -> TokenCodec {
        let formatter = ChaCha20Poly1305Formatter::new(b"a very secret key").unwrap();
        TokenCodec::new(Arc::new(formatter))
    }

    fn sample_token() -> Token {
        let mut claims = Claims::new();
        claims.insert("tenant".into(), "acme".into());
        claims.insert("roles".into(), serde_json::json!(["admin", "ops"]));
        Token::new(
            TokenId::generate(),
            TokenType::User,
            "alice".into(),
            "read write".into(),
            claims,
            UnixTime(1_700_000_000),
            DurationSecs(3600),
        )
    }

    #[test]
    fn token_round_trips() -> Result<()> {
        let codec = codec();
        let token = sample_token();

        let sealed = codec.seal_token(&token)?;
        let unsealed = codec.unseal_token(&sealed)?;

        assert_eq!(unsealed, token);
        Ok(())
    }

    #[test]
    fn refresh_token_round_trips() -> Result<()> {
        let codec = codec();
        let token = sample_token();
        let refresh = RefreshToken::new(TokenId::generate(), &token, DurationSecs(86400));

        let sealed = codec.seal_refresh_token(&refresh)?;
        let unsealed = codec.unseal_refresh_token(&sealed)?;

        assert_eq!(unsealed, refresh);
        Ok(())
    }

    #[test]
    fn sealed_token_reveals_no_plaintext() -> Result<()> {
        let codec = codec();
        let token = sample_token();

        let sealed = codec.seal_token(&token)?;
        let raw = Base64Url::from_encoded(sealed.as_str())?;
        let haystack = String::from_utf8_lossy(raw.as_slice());

        for needle in ["alice", "read write", "tenant", "acme", token.id().as_str()] {
            assert!(!sealed.as_str().contains(needle));
            assert!(!haystack.contains(needle));
        }
        Ok(())
    }

    #[test]
    fn flipping_any_byte_is_detected() -> Result<()> {
        let codec = codec();
        let sealed = codec.seal_token(&sample_token())?;
        let raw = Base64Url::from_encoded(sealed.as_str())?.into_inner();

        for idx in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[idx] ^= 0x01;
            let tampered = SealedAccessToken::new(Base64Url::from_raw(tampered).to_string());
            assert!(
                codec.unseal_token(&tampered).is_err(),
                "tampering with byte {idx} went undetected"
            );
        }
        Ok(())
    }

    #[test]
    fn garbage_is_rejected() {
        let codec = codec();
        for garbage in ["", "not base64!", "AAAA", "eyJpZCI6ImZvbyJ9"] {
            let sealed = SealedAccessToken::new(garbage.to_owned());
            assert!(codec.unseal_token(&sealed).is_err(), "{garbage:?} accepted");
        }
    }

    #[test]
    fn access_token_cannot_be_used_as_refresh_token() -> Result<()> {
        let codec = codec();
        let sealed = codec.seal_token(&sample_token())?;
        let confused = SealedRefreshToken::new(sealed.as_str().to_owned());

        assert!(codec.unseal_refresh_token(&confused).is_err());
        Ok(())
    }

    #[test]
    fn tokens_from_another_key_are_rejected() -> Result<()> {
        let ours = codec();
        let theirs = TokenCodec::new(Arc::new(ChaCha20Poly1305Formatter::new(
            b"some other secret",
        )?));

        let sealed = theirs.seal_token(&sample_token())?;
        assert!(ours.unseal_token(&sealed).is_err());
        Ok(())
    }

    #[derive(Debug)]
    struct Reversing;

    impl SecureFormatter for Reversing {
        fn seal(&self, purpose: Purpose, plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
            let mut out = purpose.as_bytes().to_vec();
            out.extend(plaintext.iter().rev());
            Ok(out)
        }

        fn unseal(&self, purpose: Purpose, sealed: &[u8]) -> Result<Vec<u8>, DecodeError> {
            let body = sealed
                .strip_prefix(purpose.as_bytes())
                .ok_or_else(|| error::decode_error("purpose mismatch"))?;
            Ok(body.iter().rev().copied().collect())
        }
    }

    #[test]
    fn alternate_formatters_preserve_the_data_model() -> Result<()> {
        let codec = TokenCodec::new(Arc::new(Reversing));
        let token = sample_token();

        let sealed = codec.seal_token(&token)?;
        assert_eq!(codec.unseal_token(&sealed)?, token);
        Ok(())
    }
}
