// Key confirmation для UNIFIED/MQV (SP 800-56A, KC_1_U / KC_1_V).

use crate::crypto::kdf::hkdf_sha256;
use crate::error::{BackendError, BackendResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

pub const CONFIRMATION_INFO: &[u8] = b"agreement-core key confirmation";
pub const RESPONDER_LABEL: &[u8] = b"KC_1_V";
pub const INITIATOR_LABEL: &[u8] = b"KC_1_U";
const MAC_KEY_LENGTH: usize = 32;

/// MacKey = HKDF-SHA256(Z, salt = clientNonce || serverNonce)
pub fn confirmation_key(
    raw_secret: &[u8],
    client_nonce: &[u8],
    server_nonce: &[u8],
) -> BackendResult<Zeroizing<Vec<u8>>> {
    let mut salt = Vec::with_capacity(client_nonce.len() + server_nonce.len());
    salt.extend_from_slice(client_nonce);
    salt.extend_from_slice(server_nonce);
    hkdf_sha256(&salt, raw_secret, CONFIRMATION_INFO, MAC_KEY_LENGTH)
}

fn keyed_mac(mac_key: &[u8], label: &[u8], own: &[u8], peer: &[u8]) -> BackendResult<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key)
        .map_err(|e| BackendError::KeyDerivation(e.to_string()))?;
    mac.update(label);
    mac.update(own);
    mac.update(peer);
    Ok(mac)
}

/// HMAC-SHA256(MacKey, label || own ephemeral || peer ephemeral)
pub fn confirmation_tag(mac_key: &[u8], label: &[u8], own: &[u8], peer: &[u8]) -> BackendResult<Vec<u8>> {
    Ok(keyed_mac(mac_key, label, own, peer)?
        .finalize()
        .into_bytes()
        .to_vec())
}

/// Проверка тега в постоянном времени
pub fn verify_confirmation_tag(
    mac_key: &[u8],
    label: &[u8],
    own: &[u8],
    peer: &[u8],
    tag: &[u8],
) -> BackendResult<bool> {
    Ok(keyed_mac(mac_key, label, own, peer)?.verify_slice(tag).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_verifies_and_binds_label() {
        let key = confirmation_key(b"raw", b"client", b"server").unwrap();
        let tag = confirmation_tag(&key, RESPONDER_LABEL, b"server-eph", b"client-eph").unwrap();

        assert!(verify_confirmation_tag(&key, RESPONDER_LABEL, b"server-eph", b"client-eph", &tag).unwrap());
        assert!(!verify_confirmation_tag(&key, INITIATOR_LABEL, b"server-eph", b"client-eph", &tag).unwrap());
        assert!(!verify_confirmation_tag(&key, RESPONDER_LABEL, b"client-eph", b"server-eph", &tag).unwrap());
    }

    #[test]
    fn test_confirmation_key_depends_on_nonces() {
        let a = confirmation_key(b"raw", b"n1", b"n2").unwrap();
        let b = confirmation_key(b"raw", b"n1", b"n3").unwrap();
        assert_ne!(*a, *b);
    }
}
