//! Подпись транскрипта для SIGNED.
//!
//! Движок не знает, чем подписывается транскрипт: это внешний
//! коллаборатор. Готовая реализация на ed25519-dalek: [`Ed25519HelloSigner`].

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// Подписант транскрипта SIGNED. Сервер вызывает `sign`, клиент `verify`.
pub trait HandshakeSigner: Send + Sync {
    fn sign(&self, transcript: &[u8]) -> Result<Vec<u8>, String>;

    fn verify(&self, transcript: &[u8], signature: &[u8]) -> Result<(), String>;
}

/// Ed25519: у сервера полная пара, у клиента только verifying key
pub struct Ed25519HelloSigner {
    signing_key: Option<SigningKey>,
    verifying_key: VerifyingKey,
}

impl Ed25519HelloSigner {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key: Some(signing_key),
            verifying_key,
        }
    }

    pub fn from_signing_key_bytes(bytes: &[u8]) -> Result<Self, String> {
        let bytes: &[u8; 32] = bytes
            .try_into()
            .map_err(|_| "Invalid signing key length".to_string())?;
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Ok(Self {
            signing_key: Some(signing_key),
            verifying_key,
        })
    }

    /// Только проверка (сторона клиента)
    pub fn verifier(verifying_key: &[u8]) -> Result<Self, String> {
        let bytes: &[u8; 32] = verifying_key
            .try_into()
            .map_err(|_| "Invalid verifying key length".to_string())?;
        let verifying_key = VerifyingKey::from_bytes(bytes)
            .map_err(|e| format!("Invalid verifying key: {}", e))?;
        Ok(Self {
            signing_key: None,
            verifying_key,
        })
    }

    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Копия без ключа подписи
    pub fn to_verifier(&self) -> Self {
        Self {
            signing_key: None,
            verifying_key: self.verifying_key,
        }
    }
}

impl HandshakeSigner for Ed25519HelloSigner {
    fn sign(&self, transcript: &[u8]) -> Result<Vec<u8>, String> {
        let signing_key = self
            .signing_key
            .as_ref()
            .ok_or_else(|| "Signer holds no signing key".to_string())?;
        Ok(signing_key.sign(transcript).to_bytes().to_vec())
    }

    fn verify(&self, transcript: &[u8], signature: &[u8]) -> Result<(), String> {
        let signature = Signature::from_slice(signature)
            .map_err(|e| format!("Invalid signature encoding: {}", e))?;
        self.verifying_key
            .verify(transcript, &signature)
            .map_err(|e| format!("Signature verification failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let signer = Ed25519HelloSigner::generate();
        let signature = signer.sign(b"transcript").unwrap();
        assert_eq!(signature.len(), 64);

        let verifier = Ed25519HelloSigner::verifier(&signer.verifying_key_bytes()).unwrap();
        assert!(verifier.verify(b"transcript", &signature).is_ok());
        assert!(verifier.verify(b"other transcript", &signature).is_err());
        assert!(verifier.verify(b"transcript", &signature[..10]).is_err());
    }

    #[test]
    fn test_verifier_cannot_sign() {
        let verifier = Ed25519HelloSigner::generate().to_verifier();
        assert!(verifier.sign(b"transcript").is_err());
    }

    #[test]
    fn test_from_signing_key_bytes() {
        let first = Ed25519HelloSigner::from_signing_key_bytes(&[3u8; 32]).unwrap();
        let second = Ed25519HelloSigner::from_signing_key_bytes(&[3u8; 32]).unwrap();
        assert_eq!(first.verifying_key_bytes(), second.verifying_key_bytes());
        assert!(Ed25519HelloSigner::from_signing_key_bytes(&[3u8; 31]).is_err());
    }
}
