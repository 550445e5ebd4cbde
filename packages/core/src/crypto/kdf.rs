//! Деривация секретов.
//!
//! - KDF2 (ANSI X9.63 / ISO 18033-2): `H(Z || counter || otherInfo)`
//! - KDF3 (concatenation KDF, SP 800-56A): `H(counter || Z || otherInfo)`
//!
//! Счётчик: big-endian u32, начинается с 1. Обе функции чистые:
//! одинаковые входы дают одинаковый выход.

use crate::crypto::spec::DerivationId;
use crate::error::{BackendError, BackendResult};
use hkdf::Hkdf;
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

/// Верхняя граница длины результата (защита от бессмысленных запросов)
pub const MAX_DERIVED_LENGTH: usize = 8 * 1024;

/// Порядок счётчика относительно общего секрета
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CounterPosition {
    AfterSecret,
    BeforeSecret,
}

/// Вычисляет `length` байт ключевого материала выбранным алгоритмом.
pub fn derive(
    id: DerivationId,
    secret: &[u8],
    other_info: &[u8],
    length: usize,
) -> BackendResult<Zeroizing<Vec<u8>>> {
    if length == 0 || length > MAX_DERIVED_LENGTH {
        return Err(BackendError::KeyDerivation(format!(
            "Requested length {} outside 1..={}",
            length, MAX_DERIVED_LENGTH
        )));
    }

    match id {
        DerivationId::None => Err(BackendError::KeyDerivation(
            "No derivation algorithm selected".to_string(),
        )),
        DerivationId::Kdf2Sha256 => Ok(x963::<Sha256>(
            CounterPosition::AfterSecret,
            secret,
            other_info,
            length,
        )),
        DerivationId::Kdf2Sha512 => Ok(x963::<Sha512>(
            CounterPosition::AfterSecret,
            secret,
            other_info,
            length,
        )),
        DerivationId::Kdf3Sha256 => Ok(x963::<Sha256>(
            CounterPosition::BeforeSecret,
            secret,
            other_info,
            length,
        )),
        DerivationId::Kdf3Sha512 => Ok(x963::<Sha512>(
            CounterPosition::BeforeSecret,
            secret,
            other_info,
            length,
        )),
    }
}

fn x963<D: Digest>(
    position: CounterPosition,
    secret: &[u8],
    other_info: &[u8],
    length: usize,
) -> Zeroizing<Vec<u8>> {
    // Ёмкость задаётся заранее, чтобы не было реаллокаций с копиями секрета
    let mut output = Zeroizing::new(Vec::with_capacity(length));
    let mut counter: u32 = 1;

    while output.len() < length {
        let mut hasher = D::new();
        match position {
            CounterPosition::AfterSecret => {
                hasher.update(secret);
                hasher.update(counter.to_be_bytes());
            }
            CounterPosition::BeforeSecret => {
                hasher.update(counter.to_be_bytes());
                hasher.update(secret);
            }
        }
        hasher.update(other_info);
        let block = Zeroizing::new(hasher.finalize().to_vec());

        let take = (length - output.len()).min(block.len());
        output.extend_from_slice(&block[..take]);
        counter += 1;
    }

    output
}

/// HKDF-SHA256 (extract + expand)
pub fn hkdf_sha256(
    salt: &[u8],
    ikm: &[u8],
    info: &[u8],
    len: usize,
) -> BackendResult<Zeroizing<Vec<u8>>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = Zeroizing::new(vec![0u8; len]);
    hkdf.expand(info, &mut okm)
        .map_err(|e| BackendError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic() {
        let secret = [0x11u8; 32];
        for id in [
            DerivationId::Kdf2Sha256,
            DerivationId::Kdf2Sha512,
            DerivationId::Kdf3Sha256,
            DerivationId::Kdf3Sha512,
        ] {
            let first = derive(id, &secret, b"info", 48).unwrap();
            let second = derive(id, &secret, b"info", 48).unwrap();
            assert_eq!(*first, *second, "{} must be a pure function", id);
            assert_eq!(first.len(), 48);
        }
    }

    #[test]
    fn test_kdf2_single_block_matches_manual_hash() {
        let secret = b"shared secret";
        let info = b"other info";

        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.update(1u32.to_be_bytes());
        hasher.update(info);
        let expected = hasher.finalize();

        let derived = derive(DerivationId::Kdf2Sha256, secret, info, 32).unwrap();
        assert_eq!(derived.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_kdf3_puts_counter_first() {
        let secret = b"shared secret";

        let mut hasher = Sha512::new();
        hasher.update(1u32.to_be_bytes());
        hasher.update(secret);
        let expected = hasher.finalize();

        let derived = derive(DerivationId::Kdf3Sha512, secret, b"", 64).unwrap();
        assert_eq!(derived.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_kdf2_and_kdf3_differ() {
        let secret = [0x5Au8; 32];
        let kdf2 = derive(DerivationId::Kdf2Sha256, &secret, b"", 32).unwrap();
        let kdf3 = derive(DerivationId::Kdf3Sha256, &secret, b"", 32).unwrap();
        assert_ne!(*kdf2, *kdf3);
    }

    #[test]
    fn test_multi_block_output_prefix_is_stable() {
        // Первые 32 байта 80-байтового вывода совпадают с 32-байтовым выводом
        let secret = [0x01u8; 16];
        let long = derive(DerivationId::Kdf2Sha256, &secret, b"x", 80).unwrap();
        let short = derive(DerivationId::Kdf2Sha256, &secret, b"x", 32).unwrap();
        assert_eq!(&long[..32], short.as_slice());
        assert_eq!(long.len(), 80);
    }

    #[test]
    fn test_derive_rejects_none_and_bad_lengths() {
        assert!(derive(DerivationId::None, b"z", b"", 32).is_err());
        assert!(derive(DerivationId::Kdf2Sha256, b"z", b"", 0).is_err());
        assert!(derive(DerivationId::Kdf2Sha256, b"z", b"", MAX_DERIVED_LENGTH + 1).is_err());
    }

    #[test]
    fn test_hkdf_sha256_length() {
        let okm = hkdf_sha256(b"salt", b"ikm", b"info", 42).unwrap();
        assert_eq!(okm.len(), 42);
    }
}
