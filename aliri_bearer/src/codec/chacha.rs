//! ChaCha20-Poly1305 sealing

use std::fmt;

use ring::{
    aead::{Aad, LessSafeKey, Nonce, UnboundKey, CHACHA20_POLY1305, NONCE_LEN},
    hkdf,
    rand::{SecureRandom, SystemRandom},
};

use super::{Purpose, SecureFormatter};
use crate::error::{self, DecodeError, KeyRejected, SealError};

const KEY_SALT: &[u8] = b"aliri_bearer token sealing";
const KEY_INFO: &[u8] = b"chacha20-poly1305";

/// Seals tokens with ChaCha20-Poly1305
///
/// The encryption key is derived from the configured secret with
/// HKDF-SHA256. Every sealed value carries its own random nonce, so sealing
/// the same token twice yields different outputs. The purpose of the value is
/// authenticated as associated data.
///
/// Sealed values have the layout `nonce || ciphertext || tag`.
#[must_use]
pub struct ChaCha20Poly1305Formatter {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for ChaCha20Poly1305Formatter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("ChaCha20Poly1305Formatter { key }")
    }
}

impl ChaCha20Poly1305Formatter {
    /// Constructs a formatter from a shared secret
    ///
    /// # Errors
    ///
    /// The secret is empty or a key could not be derived from it.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, KeyRejected> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(error::key_rejected("secret must not be empty"));
        }

        let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, KEY_SALT).extract(secret);
        let key: UnboundKey = prk
            .expand(&[KEY_INFO], &CHACHA20_POLY1305)
            .map_err(|_| error::key_rejected("key derivation failed"))?
            .into();

        Ok(Self {
            key: LessSafeKey::new(key),
            rng: SystemRandom::new(),
        })
    }
}

impl SecureFormatter for ChaCha20Poly1305Formatter {
    fn seal(&self, purpose: Purpose, plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| error::seal_error("random number generator failure"))?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce),
                Aad::from(purpose.as_bytes()),
                &mut in_out,
            )
            .map_err(|_| error::seal_error("encryption failed"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&in_out);
        Ok(sealed)
    }

    fn unseal(&self, purpose: Purpose, sealed: &[u8]) -> Result<Vec<u8>, DecodeError> {
        if sealed.len() < NONCE_LEN + self.key.algorithm().tag_len() {
            return Err(error::decode_error("sealed value too short"));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce)
            .map_err(|_| error::decode_error("invalid nonce"))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(purpose.as_bytes()), &mut in_out)
            .map_err(|_| error::decode_error("integrity check failed"))?;

        Ok(plaintext.to_vec())
    }
}
