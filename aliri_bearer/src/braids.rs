use aliri_braid::braid;
use std::fmt;

macro_rules! limited_reveal {
    ($ty:ty: $hidden:literal, $default:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    f.write_str("\"")?;
                    limited_reveal(&self.0, &mut *f, $default)?;
                    f.write_str("\"")
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                if f.alternate() {
                    limited_reveal(&self.0, &mut *f, usize::MAX)
                } else {
                    f.write_str(concat!("***", $hidden, "***"))
                }
            }
        }
    };
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// A unique, unguessable token identifier
#[braid(serde)]
pub struct TokenId;

impl TokenId {
    /// Generates a fresh identifier from the operating system's secure
    /// random number generator
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().hyphenated().to_string())
    }
}

/// A client ID
#[braid(serde)]
pub struct ClientId;

/// A client secret
#[braid(serde, debug = "owned", display = "owned")]
pub struct ClientSecret;

limited_reveal!(ClientSecretRef: "CLIENT SECRET", 5);

/// A resource owner's password
#[braid(serde, debug = "owned", display = "owned")]
pub struct Password;

limited_reveal!(PasswordRef: "PASSWORD", 1);

/// An OAuth2 authorization code
#[braid(serde, debug = "owned", display = "owned")]
pub struct AuthorizationCode;

limited_reveal!(AuthorizationCodeRef: "AUTHORIZATION CODE", 5);

/// A sealed access token, as handed to the client
#[braid(serde, debug = "owned", display = "owned")]
pub struct SealedAccessToken;

limited_reveal!(SealedAccessTokenRef: "ACCESS TOKEN", 15);

/// A sealed refresh token, as handed to the client
#[braid(serde, debug = "owned", display = "owned")]
pub struct SealedRefreshToken;

limited_reveal!(SealedRefreshTokenRef: "REFRESH TOKEN", 5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_hidden_by_default() {
        let secret = ClientSecret::from_static("super-secret-value");
        assert_eq!(format!("{secret}"), "***CLIENT SECRET***");
        assert_eq!(format!("{secret:?}"), "***CLIENT SECRET***");

        let password = Password::from_static("hunter2");
        assert_eq!(format!("{password:?}"), "***PASSWORD***");
    }

    #[test]
    fn alternate_debug_reveals_a_prefix() {
        let secret = ClientSecret::from_static("super-secret-value");
        assert_eq!(format!("{secret:#?}"), "\"supe…\"");
    }

    #[test]
    fn alternate_display_reveals_everything() {
        let token = SealedAccessToken::from_static("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(format!("{token:#}"), "abcdefghijklmnopqrstuvwxyz");
    }

    #[test]
    fn generated_token_ids_are_distinct() {
        let a = TokenId::generate();
        let b = TokenId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
