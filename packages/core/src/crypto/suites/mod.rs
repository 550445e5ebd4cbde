//! Криптографические наборы (реализации CryptoBackend)
//!
//! ## Стандартный набор
//! - **EC**: P-256 (ECDH, Unified, MQV)
//! - **XDH**: X25519 (ECDH, Unified)
//! - **KEM**: ML-KEM-512 / 768 / 1024 (FIPS 203)
//!
//! P-384, X448 и конечное поле DH стандартный набор не реализует:
//! `supports` для них возвращает `false`, и фабрика отказывает заранее.
//!
//! ## Пример
//!
//! ```rust
//! use agreement_core::crypto::suites::StandardSuite;
//! use agreement_core::crypto::provider::CryptoBackend;
//! use agreement_core::crypto::spec::KeyPairSpec;
//!
//! let suite = StandardSuite::new();
//! let pair = suite.generate_key_pair(&KeyPairSpec::x25519()).unwrap();
//! assert_eq!(pair.public().len(), 32);
//! ```

pub mod classic;
pub mod pq;

use crate::crypto::keys::{KeyPair, PrivateKey, PublicKey};
use crate::crypto::provider::{Combination, CombinedInputs, CryptoBackend};
use crate::crypto::spec::{Derivation, EcCurve, KeyPairSpec, XdhCurve};
use crate::error::{BackendError, BackendResult};
use rand::rngs::OsRng;
use rand_core::RngCore;
use tracing::trace;
use zeroize::Zeroizing;

/// Какие семейства стандартный набор обслуживает
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteConfig {
    pub p256: bool,
    pub x25519: bool,
    pub ml_kem: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            p256: true,
            x25519: true,
            ml_kem: true,
        }
    }
}

/// Семейство, к которому относится разрешённая спецификация
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    P256,
    X25519,
    MlKem,
}

/// Стандартный backend на RustCrypto / dalek / fips203
#[derive(Debug, Clone, Default)]
pub struct StandardSuite {
    config: SuiteConfig,
}

impl StandardSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SuiteConfig) -> Self {
        Self { config }
    }

    fn family(&self, spec: &KeyPairSpec) -> BackendResult<Family> {
        let family = match spec {
            KeyPairSpec::Ec(EcCurve::P256) if self.config.p256 => Family::P256,
            KeyPairSpec::Xdh(Some(XdhCurve::X25519)) if self.config.x25519 => Family::X25519,
            KeyPairSpec::MlKem(_) if self.config.ml_kem => Family::MlKem,
            other => return Err(BackendError::Unsupported(other.to_string())),
        };
        Ok(family)
    }

    fn classical(&self, spec: &KeyPairSpec) -> BackendResult<Family> {
        match self.family(spec)? {
            Family::MlKem => Err(BackendError::Unsupported(format!(
                "{} has no Diffie-Hellman operation",
                spec
            ))),
            family => Ok(family),
        }
    }

    fn kem(&self, spec: &KeyPairSpec) -> BackendResult<()> {
        match self.family(spec)? {
            Family::MlKem => Ok(()),
            _ => Err(BackendError::Unsupported(format!("{} is not a KEM", spec))),
        }
    }
}

impl CryptoBackend for StandardSuite {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn supports(&self, spec: &KeyPairSpec) -> bool {
        match spec {
            // Семейство XDH: достаточно одной кривой
            KeyPairSpec::Xdh(None) => self.config.x25519,
            other => self.family(other).is_ok(),
        }
    }

    fn generate_key_pair(&self, spec: &KeyPairSpec) -> BackendResult<KeyPair> {
        trace!(target: "agreement::backend", spec = %spec, "Generating key pair");
        match self.family(spec)? {
            Family::P256 => classic::p256_generate(spec),
            Family::X25519 => classic::x25519_generate(spec),
            Family::MlKem => pq::generate(spec),
        }
    }

    fn check_key_pair(&self, pair: &KeyPair, expected: &KeyPairSpec) -> BackendResult<()> {
        if pair.spec() != expected {
            return Err(BackendError::Unsupported(format!(
                "Key pair is {}, expected {}",
                pair.spec(),
                expected
            )));
        }
        match self.family(expected)? {
            Family::P256 => classic::p256_check(pair),
            Family::X25519 => classic::x25519_check(pair),
            Family::MlKem => pq::check(pair, expected),
        }
    }

    fn dh_agree(
        &self,
        spec: &KeyPairSpec,
        local: &PrivateKey,
        peer: &PublicKey,
    ) -> BackendResult<Zeroizing<Vec<u8>>> {
        match self.classical(spec)? {
            Family::P256 => classic::p256_agree(local, peer),
            _ => classic::x25519_agree(local, peer),
        }
    }

    fn dh_agree_combined(
        &self,
        spec: &KeyPairSpec,
        combination: Combination,
        inputs: CombinedInputs<'_>,
    ) -> BackendResult<Zeroizing<Vec<u8>>> {
        trace!(
            target: "agreement::backend",
            spec = %spec,
            combination = ?combination,
            "Combined agreement"
        );
        match self.classical(spec)? {
            Family::P256 => classic::p256_combined(combination, inputs),
            _ => classic::x25519_combined(combination, inputs),
        }
    }

    fn kem_generate(
        &self,
        spec: &KeyPairSpec,
        peer: &PublicKey,
        derivation: &Derivation,
    ) -> BackendResult<(Vec<u8>, Zeroizing<Vec<u8>>)> {
        self.kem(spec)?;
        pq::encapsulate(spec, peer, derivation)
    }

    fn kem_extract(
        &self,
        spec: &KeyPairSpec,
        local: &PrivateKey,
        ciphertext: &[u8],
        derivation: &Derivation,
    ) -> BackendResult<Zeroizing<Vec<u8>>> {
        self.kem(spec)?;
        pq::decapsulate(spec, local, ciphertext, derivation)
    }

    fn random_bytes(&self, len: usize) -> BackendResult<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::spec::MlKemParams;

    #[test]
    fn test_supports() {
        let suite = StandardSuite::new();
        assert!(suite.supports(&KeyPairSpec::ec_p256()));
        assert!(suite.supports(&KeyPairSpec::x25519()));
        assert!(suite.supports(&KeyPairSpec::xdh()));
        assert!(suite.supports(&KeyPairSpec::ml_kem(MlKemParams::MlKem1024)));
        assert!(!suite.supports(&KeyPairSpec::Ec(EcCurve::P384)));
        assert!(!suite.supports(&KeyPairSpec::Xdh(Some(XdhCurve::X448))));
        assert!(!suite.supports(&KeyPairSpec::dh(2048)));

        let no_pq = StandardSuite::with_config(SuiteConfig {
            ml_kem: false,
            ..SuiteConfig::default()
        });
        assert!(!no_pq.supports(&KeyPairSpec::ml_kem(MlKemParams::MlKem768)));
    }

    #[test]
    fn test_resolve_xdh_family() {
        let suite = StandardSuite::new();
        assert_eq!(suite.resolve(&KeyPairSpec::x25519()).unwrap(), KeyPairSpec::x25519());
        assert!(suite.resolve(&KeyPairSpec::xdh()).is_err());
        assert!(suite.resolve(&KeyPairSpec::Xdh(Some(XdhCurve::X448))).is_err());
    }

    #[test]
    fn test_kem_rejected_for_curves() {
        let suite = StandardSuite::new();
        let pair = suite.generate_key_pair(&KeyPairSpec::ec_p256()).unwrap();
        assert!(matches!(
            suite.kem_generate(&KeyPairSpec::ec_p256(), pair.public(), &Derivation::none()),
            Err(BackendError::Unsupported(_))
        ));
    }

    #[test]
    fn test_check_key_pair_rejects_other_spec() {
        let suite = StandardSuite::new();
        let pair = suite.generate_key_pair(&KeyPairSpec::x25519()).unwrap();
        assert!(suite.check_key_pair(&pair, &KeyPairSpec::x25519()).is_ok());
        assert!(suite.check_key_pair(&pair, &KeyPairSpec::ec_p256()).is_err());
    }

    #[test]
    fn test_check_key_pair_against_own_spec() {
        let suite = StandardSuite::new();
        let pair = suite.generate_key_pair(&KeyPairSpec::ec_p256()).unwrap();
        assert!(suite.check_key_pair_self(&pair).is_ok());

        let broken = KeyPair::public_only(KeyPairSpec::ec_p256(), PublicKey::from_bytes(vec![0u8; 65]));
        assert!(suite.check_key_pair_self(&broken).is_err());

        let x448 = KeyPair::public_only(
            KeyPairSpec::Xdh(Some(XdhCurve::X448)),
            PublicKey::from_bytes(vec![9u8; 56]),
        );
        assert!(matches!(suite.check_key_pair_self(&x448), Err(BackendError::Unsupported(_))));
    }

    #[test]
    fn test_random_bytes() {
        let suite = StandardSuite::new();
        let first = suite.random_bytes(32).unwrap();
        let second = suite.random_bytes(32).unwrap();
        assert_eq!(first.len(), 32);
        assert_ne!(first, second);
    }
}
