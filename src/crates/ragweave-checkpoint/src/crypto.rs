//! Symmetric encryption for checkpoint state at rest
//!
//! Checkpoints hold full conversation history, so they are sealed with
//! AES-256-GCM before they reach a storage backend. The key is supplied
//! out-of-band (environment, keychain, secret manager); the engine never
//! generates or persists it. Each seal uses a fresh random 12-byte nonce,
//! packed as `nonce || ciphertext+tag` so a sealed blob is self-contained.

use crate::error::{CheckpointError, Result};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::RngCore;

/// Required key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// 256-bit symmetric key, supplied out-of-band
#[derive(Clone)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CheckpointError::InvalidKey(format!("expected {} bytes, got {}", KEY_LEN, bytes.len()))
        })?;
        Ok(Self(array))
    }
}

// Key material must never appear in logs or debug output.
impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(..)")
    }
}

/// AES-256-GCM seal/open over serialized checkpoint bytes
pub struct StateCipher {
    cipher: Aes256Gcm,
}

impl StateCipher {
    pub fn new(key: &CipherKey) -> Self {
        let cipher = Aes256Gcm::new_from_slice(&key.0).expect("key length checked by CipherKey");
        Self { cipher }
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext+tag`
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CheckpointError::Decrypt(format!("encryption failed: {}", e)))?;

        let mut packed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        packed.extend_from_slice(&nonce_bytes);
        packed.extend_from_slice(&ciphertext);
        Ok(packed)
    }

    /// Decrypt a packed blob produced by [`seal`](Self::seal)
    ///
    /// Fails on truncated input, a wrong key, or tampered ciphertext. The
    /// checkpoint store maps this failure to "no checkpoint" so a run can
    /// start cold instead of crashing.
    pub fn open(&self, packed: &[u8]) -> Result<Vec<u8>> {
        if packed.len() < NONCE_LEN + TAG_LEN {
            return Err(CheckpointError::Decrypt("ciphertext too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = packed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CheckpointError::Decrypt("wrong key or corrupted data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> CipherKey {
        CipherKey::from_bytes([byte; KEY_LEN])
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let cipher = StateCipher::new(&key(0x42));
        let plaintext = br#"{"messages":[{"role":"user","content":"hello"}]}"#;

        let sealed = cipher.seal(plaintext).unwrap();
        assert_ne!(&sealed[NONCE_LEN..], plaintext.as_slice());

        let opened = cipher.open(&sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_nonce_is_fresh_per_seal() {
        let cipher = StateCipher::new(&key(0x42));
        let a = cipher.seal(b"same plaintext").unwrap();
        let b = cipher.seal(b"same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = StateCipher::new(&key(0x01)).seal(b"secret").unwrap();
        let result = StateCipher::new(&key(0x02)).open(&sealed);
        assert!(matches!(result, Err(CheckpointError::Decrypt(_))));
    }

    #[test]
    fn test_truncated_input_fails() {
        let cipher = StateCipher::new(&key(0x42));
        assert!(matches!(cipher.open(&[0u8; 5]), Err(CheckpointError::Decrypt(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = StateCipher::new(&key(0x42));
        let mut sealed = cipher.seal(b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(matches!(cipher.open(&sealed), Err(CheckpointError::Decrypt(_))));
    }

    #[test]
    fn test_key_from_slice_rejects_bad_length() {
        // base64 of 16 bytes: a common mistake is supplying an AES-128 key
        use base64::Engine;
        let short = base64::engine::general_purpose::STANDARD
            .decode("AAAAAAAAAAAAAAAAAAAAAA==")
            .unwrap();
        assert!(matches!(
            CipherKey::from_slice(&short),
            Err(CheckpointError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let debug = format!("{:?}", key(0x42));
        assert_eq!(debug, "CipherKey(..)");
    }
}
