//! AES-256-GCM encryption for per-tenant secrets at rest (LLM provider keys,
//! channel tokens). The master key comes from `EncryptionConfig` and never
//! touches storage; only the ciphertext does.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{ConversaError, Result};

const NONCE_LEN: usize = 12;

/// A 32-byte master key, decoded once at startup and shared behind an `Arc`
/// by every component that stores a secret.
#[derive(Clone)]
pub struct MasterKey(Key<Aes256Gcm>);

impl MasterKey {
    /// Accepts a base64-encoded 32-byte key, the form `API_KEY_ENCRYPTION_KEY`
    /// is expected to hold.
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| ConversaError::Encryption(format!("invalid base64 key: {e}")))?;
        if bytes.len() != 32 {
            return Err(ConversaError::Encryption(format!(
                "encryption key must decode to 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(*Key::<Aes256Gcm>::from_slice(&bytes)))
    }

    /// Encrypt `plaintext`, returning a base64 string of `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new(&self.0);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| ConversaError::Encryption(format!("encrypt failed: {e}")))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    /// Inverse of [`MasterKey::encrypt`].
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| ConversaError::Encryption(format!("invalid base64 payload: {e}")))?;
        if raw.len() < NONCE_LEN {
            return Err(ConversaError::Encryption("ciphertext too short".into()));
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let cipher = Aes256Gcm::new(&self.0);
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| ConversaError::Encryption(format!("decrypt failed: {e}")))?;
        String::from_utf8(plaintext)
            .map_err(|e| ConversaError::Encryption(format!("decrypted payload not utf8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> MasterKey {
        let raw = [7u8; 32];
        MasterKey::from_base64(&STANDARD.encode(raw)).unwrap()
    }

    #[test]
    fn round_trips() {
        let key = test_key();
        let ciphertext = key.encrypt("sk-super-secret").unwrap();
        assert_ne!(ciphertext, "sk-super-secret");
        assert_eq!(key.decrypt(&ciphertext).unwrap(), "sk-super-secret");
    }

    #[test]
    fn rejects_short_key() {
        let short = STANDARD.encode([1u8; 16]);
        assert!(MasterKey::from_base64(&short).is_err());
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let key = test_key();
        let mut ciphertext = STANDARD.decode(key.encrypt("payload").unwrap()).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;
        let tampered = STANDARD.encode(ciphertext);
        assert!(key.decrypt(&tampered).is_err());
    }
}
