// Обёртка секрета для ENCAPSULATION: HKDF-SHA256 → ChaCha20-Poly1305.

use crate::crypto::kdf::hkdf_sha256;
use crate::error::{BackendError, BackendResult};
use chacha20poly1305::{
    aead::{Aead, Payload},
    ChaCha20Poly1305, Key, KeyInit, Nonce,
};
use zeroize::Zeroizing;

pub const WRAP_INFO: &[u8] = b"agreement-core secret wrapping";
const WRAP_KEY_LENGTH: usize = 32;
const WRAP_NONCE_LENGTH: usize = 12;

/// Ключ обёртки из общего секрета DH/KEM; nonce handshake'а служит солью
pub fn wrapping_key(shared: &[u8], salt: &[u8]) -> BackendResult<Zeroizing<Vec<u8>>> {
    hkdf_sha256(salt, shared, WRAP_INFO, WRAP_KEY_LENGTH)
}

fn aead_nonce(handshake_nonce: &[u8]) -> BackendResult<&Nonce> {
    if handshake_nonce.len() < WRAP_NONCE_LENGTH {
        return Err(BackendError::Agreement(format!(
            "Handshake nonce too short for wrapping: {} bytes",
            handshake_nonce.len()
        )));
    }
    Ok(Nonce::from_slice(&handshake_nonce[..WRAP_NONCE_LENGTH]))
}

/// Ключ одноразовый (свежий DH/KEM на каждый handshake), поэтому nonce
/// берётся из nonce ClientHello.
pub fn seal(key: &[u8], handshake_nonce: &[u8], secret: &[u8], aad: &[u8]) -> BackendResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(aead_nonce(handshake_nonce)?, Payload { msg: secret, aad })
        .map_err(|e| BackendError::Agreement(format!("Secret wrapping failed: {}", e)))
}

pub fn open(
    key: &[u8],
    handshake_nonce: &[u8],
    wrapped: &[u8],
    aad: &[u8],
) -> BackendResult<Zeroizing<Vec<u8>>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(aead_nonce(handshake_nonce)?, Payload { msg: wrapped, aad })
        .map(Zeroizing::new)
        .map_err(|e| BackendError::Agreement(format!("Secret unwrapping failed: {}", e)))
}
