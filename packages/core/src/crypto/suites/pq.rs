//! ML-KEM (FIPS 203) через fips203.
//!
//! Кодировки: стандартные байтовые массивы FIPS 203 (ek, dk, ct).
//! Секрет инкапсуляции 32 байта; при заданной деривации он сразу
//! проходит через KDF2/KDF3 с пустым otherInfo.

use crate::crypto::kdf;
use crate::crypto::keys::{KeyPair, PrivateKey, PublicKey};
use crate::crypto::spec::{Derivation, DerivationId, KeyPairSpec, MlKemParams};
use crate::error::{BackendError, BackendResult};
use fips203::traits::{Decaps, Encaps, KeyGen, SerDes};
use zeroize::Zeroizing;

/// Один набор параметров ML-KEM
trait MlKemVariant {
    const NAME: &'static str;
    const EK_LEN: usize;
    const CT_LEN: usize;

    /// (ek, dk)
    fn keygen() -> BackendResult<(Vec<u8>, Zeroizing<Vec<u8>>)>;

    fn encaps(ek: &[u8]) -> BackendResult<(Vec<u8>, Zeroizing<Vec<u8>>)>;

    fn decaps(dk: &[u8], ct: &[u8]) -> BackendResult<Zeroizing<Vec<u8>>>;

    /// dk = dk_pke || ek || H(ek) || z; ek начинается сразу после dk_pke
    fn embedded_ek(dk: &[u8]) -> Option<&[u8]> {
        let start = Self::EK_LEN - 32;
        dk.get(start..start + Self::EK_LEN)
    }
}

macro_rules! ml_kem_variant {
    ($variant:ident, $module:ident, $name:literal) => {
        struct $variant;

        impl MlKemVariant for $variant {
            const NAME: &'static str = $name;
            const EK_LEN: usize = fips203::$module::EK_LEN;
            const CT_LEN: usize = fips203::$module::CT_LEN;

            fn keygen() -> BackendResult<(Vec<u8>, Zeroizing<Vec<u8>>)> {
                let (ek, dk) = <fips203::$module::KG as KeyGen>::try_keygen()
                    .map_err(|e| BackendError::KeyGeneration(format!("{}: {}", $name, e)))?;
                Ok((ek.into_bytes().to_vec(), Zeroizing::new(dk.into_bytes().to_vec())))
            }

            fn encaps(ek: &[u8]) -> BackendResult<(Vec<u8>, Zeroizing<Vec<u8>>)> {
                let bytes: [u8; fips203::$module::EK_LEN] = ek.try_into().map_err(|_| {
                    BackendError::InvalidPublicKey(format!("{} encapsulation key must be {} bytes", $name, Self::EK_LEN))
                })?;
                let ek = fips203::$module::EncapsKey::try_from_bytes(bytes)
                    .map_err(|e| BackendError::InvalidPublicKey(format!("{}: {}", $name, e)))?;
                let (ssk, ct) = ek
                    .try_encaps()
                    .map_err(|e| BackendError::KemEncapsulation(format!("{}: {}", $name, e)))?;
                Ok((ct.into_bytes().to_vec(), Zeroizing::new(ssk.into_bytes().to_vec())))
            }

            fn decaps(dk: &[u8], ct: &[u8]) -> BackendResult<Zeroizing<Vec<u8>>> {
                let dk_bytes: Zeroizing<[u8; fips203::$module::DK_LEN]> =
                    Zeroizing::new(dk.try_into().map_err(|_| {
                        BackendError::InvalidPrivateKey(format!("{} decapsulation key has wrong length", $name))
                    })?);
                let dk = fips203::$module::DecapsKey::try_from_bytes(*dk_bytes)
                    .map_err(|e| BackendError::InvalidPrivateKey(format!("{}: {}", $name, e)))?;
                let ct_bytes: [u8; fips203::$module::CT_LEN] = ct.try_into().map_err(|_| {
                    BackendError::KemDecapsulation(format!("{} ciphertext must be {} bytes", $name, Self::CT_LEN))
                })?;
                let ct = fips203::$module::CipherText::try_from_bytes(ct_bytes)
                    .map_err(|e| BackendError::KemDecapsulation(format!("{}: {}", $name, e)))?;
                let ssk = dk
                    .try_decaps(&ct)
                    .map_err(|e| BackendError::KemDecapsulation(format!("{}: {}", $name, e)))?;
                Ok(Zeroizing::new(ssk.into_bytes().to_vec()))
            }
        }
    };
}

ml_kem_variant!(MlKem512, ml_kem_512, "ML-KEM-512");
ml_kem_variant!(MlKem768, ml_kem_768, "ML-KEM-768");
ml_kem_variant!(MlKem1024, ml_kem_1024, "ML-KEM-1024");

fn generate_with<V: MlKemVariant>(spec: &KeyPairSpec) -> BackendResult<KeyPair> {
    let (ek, dk) = V::keygen()?;
    Ok(KeyPair::new(
        spec.clone(),
        PublicKey::from_bytes(ek),
        PrivateKey::from_bytes(dk.to_vec()),
    ))
}

fn check_with<V: MlKemVariant>(pair: &KeyPair) -> BackendResult<()> {
    if pair.public().len() != V::EK_LEN {
        return Err(BackendError::InvalidPublicKey(format!(
            "{} encapsulation key must be {} bytes, got {}",
            V::NAME,
            V::EK_LEN,
            pair.public().len()
        )));
    }
    if let Some(private) = pair.private() {
        if V::embedded_ek(private.expose_secret()) != Some(pair.public().as_bytes()) {
            return Err(BackendError::InvalidPrivateKey(format!(
                "{} decapsulation key does not match encapsulation key",
                V::NAME
            )));
        }
    }
    Ok(())
}

fn fuse(secret: Zeroizing<Vec<u8>>, derivation: &Derivation) -> BackendResult<Zeroizing<Vec<u8>>> {
    match derivation.id {
        DerivationId::None => Ok(secret),
        id => kdf::derive(id, &secret, &[], derivation.length),
    }
}

fn params(spec: &KeyPairSpec) -> BackendResult<MlKemParams> {
    match spec {
        KeyPairSpec::MlKem(params) => Ok(*params),
        other => Err(BackendError::Unsupported(format!("{} is not an ML-KEM spec", other))),
    }
}

pub(super) fn generate(spec: &KeyPairSpec) -> BackendResult<KeyPair> {
    match params(spec)? {
        MlKemParams::MlKem512 => generate_with::<MlKem512>(spec),
        MlKemParams::MlKem768 => generate_with::<MlKem768>(spec),
        MlKemParams::MlKem1024 => generate_with::<MlKem1024>(spec),
    }
}

pub(super) fn check(pair: &KeyPair, spec: &KeyPairSpec) -> BackendResult<()> {
    match params(spec)? {
        MlKemParams::MlKem512 => check_with::<MlKem512>(pair),
        MlKemParams::MlKem768 => check_with::<MlKem768>(pair),
        MlKemParams::MlKem1024 => check_with::<MlKem1024>(pair),
    }
}

pub(super) fn encapsulate(
    spec: &KeyPairSpec,
    peer: &PublicKey,
    derivation: &Derivation,
) -> BackendResult<(Vec<u8>, Zeroizing<Vec<u8>>)> {
    let (ct, secret) = match params(spec)? {
        MlKemParams::MlKem512 => MlKem512::encaps(peer.as_bytes())?,
        MlKemParams::MlKem768 => MlKem768::encaps(peer.as_bytes())?,
        MlKemParams::MlKem1024 => MlKem1024::encaps(peer.as_bytes())?,
    };
    Ok((ct, fuse(secret, derivation)?))
}

pub(super) fn decapsulate(
    spec: &KeyPairSpec,
    local: &PrivateKey,
    ciphertext: &[u8],
    derivation: &Derivation,
) -> BackendResult<Zeroizing<Vec<u8>>> {
    let secret = match params(spec)? {
        MlKemParams::MlKem512 => MlKem512::decaps(local.expose_secret(), ciphertext)?,
        MlKemParams::MlKem768 => MlKem768::decaps(local.expose_secret(), ciphertext)?,
        MlKemParams::MlKem1024 => MlKem1024::decaps(local.expose_secret(), ciphertext)?,
    };
    fuse(secret, derivation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encapsulate_decapsulate_all_params() {
        for params in [MlKemParams::MlKem512, MlKemParams::MlKem768, MlKemParams::MlKem1024] {
            let spec = KeyPairSpec::ml_kem(params);
            let pair = generate(&spec).unwrap();
            assert!(check(&pair, &spec).is_ok(), "{} pair must be consistent", spec);

            let (ct, sent) = encapsulate(&spec, pair.public(), &Derivation::none()).unwrap();
            let received = decapsulate(&spec, pair.private().unwrap(), &ct, &Derivation::none()).unwrap();
            assert_eq!(*sent, *received, "{} secrets must match", spec);
            assert_eq!(sent.len(), 32);
        }
    }

    #[test]
    fn test_fused_derivation_length() {
        let spec = KeyPairSpec::ml_kem(MlKemParams::MlKem768);
        let pair = generate(&spec).unwrap();
        let derivation = Derivation {
            id: DerivationId::Kdf3Sha512,
            length: 48,
        };

        let (ct, sent) = encapsulate(&spec, pair.public(), &derivation).unwrap();
        let received = decapsulate(&spec, pair.private().unwrap(), &ct, &derivation).unwrap();
        assert_eq!(sent.len(), 48);
        assert_eq!(*sent, *received);
    }

    #[test]
    fn test_check_detects_foreign_key() {
        let spec = KeyPairSpec::ml_kem(MlKemParams::MlKem512);
        let first = generate(&spec).unwrap();
        let second = generate(&spec).unwrap();
        let mixed = KeyPair::new(spec.clone(), first.public().clone(), second.private().unwrap().clone());
        assert!(check(&mixed, &spec).is_err());

        let truncated = KeyPair::public_only(spec.clone(), PublicKey::from_bytes(vec![0u8; 10]));
        assert!(check(&truncated, &spec).is_err());
    }

    #[test]
    fn test_wrong_ciphertext_length_is_rejected() {
        let spec = KeyPairSpec::ml_kem(MlKemParams::MlKem768);
        let pair = generate(&spec).unwrap();
        assert!(matches!(
            decapsulate(&spec, pair.private().unwrap(), &[0u8; 16], &Derivation::none()),
            Err(BackendError::KemDecapsulation(_))
        ));
    }
}
