//! Column cipher capability and the built-in deterministic cipher.
//!
//! Encrypted columns are compared by equality on ciphertext, so the cipher
//! used for lookup columns must map equal plaintexts to equal ciphertexts.
//! [`DeterministicCipher`] does this with a synthetic nonce: the nonce is a
//! keyed hash of the plaintext, and decryption re-derives and checks it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

/// Prefix marking values produced by [`DeterministicCipher`].
pub const CIPHERTEXT_PREFIX: &str = "tk1:";

/// Master key length in bytes.
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const INFO_ENCRYPTION_KEY: &[u8] = b"tablekit:column:enc";
const INFO_NONCE_KEY: &[u8] = b"tablekit:column:nonce";
const INFO_SYNTHETIC_NONCE: &[u8] = b"tablekit:column:siv";

/// Errors from column encryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// Key material has the wrong length or encoding.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// Ciphertext is not in the expected format.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),
    /// Ciphertext failed authentication.
    #[error("ciphertext failed authentication")]
    Authentication,
}

/// String-to-string encryption applied to configured columns.
///
/// Implementations must be deterministic for columns used in equality
/// predicates. A randomized cipher still round-trips values but lookups on
/// its columns never match.
pub trait Cipher: Send + Sync {
    /// Encrypts `plaintext`.
    ///
    /// # Errors
    ///
    /// Returns a [`CipherError`] if encryption fails.
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Decrypts `ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns a [`CipherError`] if the value is malformed or does not
    /// authenticate under this key.
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

/// Deterministic authenticated cipher over ChaCha20-Poly1305.
///
/// Output format: `tk1:` followed by unpadded URL-safe base64 of
/// `nonce || ciphertext || tag`.
#[derive(Clone)]
pub struct DeterministicCipher {
    enc_key: Zeroizing<[u8; KEY_LEN]>,
    nonce_key: Zeroizing<[u8; KEY_LEN]>,
}

impl DeterministicCipher {
    /// Derives the encryption and nonce keys from a 32-byte master key.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKey`] if `master` is not 32 bytes.
    pub fn new(master: &[u8]) -> Result<Self, CipherError> {
        if master.len() != KEY_LEN {
            return Err(CipherError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                master.len()
            )));
        }
        let hk = Hkdf::<Sha256>::new(None, master);
        let mut enc_key = Zeroizing::new([0u8; KEY_LEN]);
        let mut nonce_key = Zeroizing::new([0u8; KEY_LEN]);
        hk.expand(INFO_ENCRYPTION_KEY, &mut enc_key[..])
            .map_err(|err| CipherError::InvalidKey(err.to_string()))?;
        hk.expand(INFO_NONCE_KEY, &mut nonce_key[..])
            .map_err(|err| CipherError::InvalidKey(err.to_string()))?;
        Ok(Self { enc_key, nonce_key })
    }

    /// Parses a hex-encoded 32-byte master key. Surrounding whitespace is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKey`] for bad hex or a wrong length.
    pub fn from_hex(master_hex: &str) -> Result<Self, CipherError> {
        let master = Zeroizing::new(
            hex::decode(master_hex.trim())
                .map_err(|err| CipherError::InvalidKey(err.to_string()))?,
        );
        Self::new(&master)
    }

    /// HKDF-SHA256 with the nonce key as salt, so the extract step is an
    /// HMAC of the plaintext under that key.
    fn synthetic_nonce(&self, plaintext: &[u8]) -> Result<[u8; NONCE_LEN], CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        Hkdf::<Sha256>::new(Some(&self.nonce_key[..]), plaintext)
            .expand(INFO_SYNTHETIC_NONCE, &mut nonce)
            .map_err(|err| CipherError::InvalidKey(err.to_string()))?;
        Ok(nonce)
    }

    fn aead(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.enc_key[..]))
    }
}

impl Cipher for DeterministicCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = self.synthetic_nonce(plaintext.as_bytes())?;
        let ciphertext = self
            .aead()
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CipherError::Authentication)?;
        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(format!("{CIPHERTEXT_PREFIX}{}", URL_SAFE_NO_PAD.encode(payload)))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let encoded = ciphertext
            .strip_prefix(CIPHERTEXT_PREFIX)
            .ok_or_else(|| CipherError::Malformed("missing prefix".to_string()))?;
        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|err| CipherError::Malformed(err.to_string()))?;
        if payload.len() <= NONCE_LEN {
            return Err(CipherError::Malformed("payload too short".to_string()));
        }
        let (nonce, sealed) = payload.split_at(NONCE_LEN);
        let plaintext = Zeroizing::new(
            self.aead()
                .decrypt(Nonce::from_slice(nonce), sealed)
                .map_err(|_| CipherError::Authentication)?,
        );
        let expected = self.synthetic_nonce(&plaintext)?;
        if !bool::from(expected[..].ct_eq(nonce)) {
            return Err(CipherError::Authentication);
        }
        String::from_utf8(plaintext.to_vec())
            .map_err(|err| CipherError::Malformed(err.to_string()))
    }
}

impl std::fmt::Debug for DeterministicCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeterministicCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(byte: u8) -> DeterministicCipher {
        DeterministicCipher::new(&[byte; KEY_LEN]).expect("valid key")
    }

    #[test]
    fn test_round_trip() {
        let cipher = cipher(7);
        let sealed = cipher.encrypt("b@x.com").expect("encrypt");
        assert!(sealed.starts_with(CIPHERTEXT_PREFIX));
        assert_ne!(sealed, "b@x.com");
        assert_eq!(cipher.decrypt(&sealed).expect("decrypt"), "b@x.com");
    }

    #[test]
    fn test_encryption_is_deterministic() {
        let cipher = cipher(7);
        let a = cipher.encrypt("same").expect("encrypt");
        let b = cipher.encrypt("same").expect("encrypt");
        let c = cipher.encrypt("other").expect("encrypt");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_empty_plaintext_round_trips() {
        let cipher = cipher(1);
        let sealed = cipher.encrypt("").expect("encrypt");
        assert_eq!(cipher.decrypt(&sealed).expect("decrypt"), "");
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let sealed = cipher(1).encrypt("secret").expect("encrypt");
        assert_eq!(cipher(2).decrypt(&sealed), Err(CipherError::Authentication));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = cipher(3);
        let sealed = cipher.encrypt("secret").expect("encrypt");
        let mut payload = URL_SAFE_NO_PAD
            .decode(&sealed[CIPHERTEXT_PREFIX.len()..])
            .expect("decode");
        let last = payload.len() - 1;
        payload[last] ^= 0x01;
        let tampered = format!("{CIPHERTEXT_PREFIX}{}", URL_SAFE_NO_PAD.encode(payload));
        assert_eq!(cipher.decrypt(&tampered), Err(CipherError::Authentication));
    }

    #[test]
    fn test_malformed_inputs() {
        let cipher = cipher(4);
        assert!(matches!(
            cipher.decrypt("plain"),
            Err(CipherError::Malformed(_))
        ));
        assert!(matches!(
            cipher.decrypt("tk1:!!!"),
            Err(CipherError::Malformed(_))
        ));
        assert!(matches!(
            cipher.decrypt("tk1:AAAA"),
            Err(CipherError::Malformed(_))
        ));
    }

    #[test]
    fn test_key_validation() {
        assert!(matches!(
            DeterministicCipher::new(&[0u8; 16]),
            Err(CipherError::InvalidKey(_))
        ));
        assert!(matches!(
            DeterministicCipher::from_hex("zz"),
            Err(CipherError::InvalidKey(_))
        ));
        let hex_key = format!("{}\n", "ab".repeat(KEY_LEN));
        assert!(DeterministicCipher::from_hex(&hex_key).is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", cipher(9));
        assert!(rendered.contains("REDACTED"));
    }
}
