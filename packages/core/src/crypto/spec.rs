//! Спецификации: тип ключевой пары, тип согласования, тип KDF.
//!
//! `AgreementSpec` это неизменяемое значение, которое фабрика проверяет
//! и по которому выбирает вариант движка. Все типы сериализуются, потому что
//! спецификация целиком передаётся в ClientHello/ServerHello.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Семейство ключевой пары
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPairType {
    Rsa,
    Ec,
    Dh,
    Xdh,
    MlKem,
}

impl fmt::Display for KeyPairType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyPairType::Rsa => "RSA",
            KeyPairType::Ec => "EC",
            KeyPairType::Dh => "DH",
            KeyPairType::Xdh => "XDH",
            KeyPairType::MlKem => "ML-KEM",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcCurve {
    P256,
    P384,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XdhCurve {
    X25519,
    X448,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MlKemParams {
    MlKem512,
    MlKem768,
    MlKem1024,
}

/// Конкретная спецификация ключевой пары.
///
/// `Xdh(None)` означает семейство XDH без выбранной кривой: кривая становится
/// известна только когда движку предъявляют реальную пару ключей.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPairSpec {
    Rsa { modulus_bits: u16 },
    Ec(EcCurve),
    Dh { group_bits: u16 },
    Xdh(Option<XdhCurve>),
    MlKem(MlKemParams),
}

impl KeyPairSpec {
    pub fn ec_p256() -> Self {
        KeyPairSpec::Ec(EcCurve::P256)
    }

    pub fn x25519() -> Self {
        KeyPairSpec::Xdh(Some(XdhCurve::X25519))
    }

    /// Семейство XDH, кривая разрешается лениво
    pub fn xdh() -> Self {
        KeyPairSpec::Xdh(None)
    }

    pub fn dh(group_bits: u16) -> Self {
        KeyPairSpec::Dh { group_bits }
    }

    pub fn rsa(modulus_bits: u16) -> Self {
        KeyPairSpec::Rsa { modulus_bits }
    }

    pub fn ml_kem(params: MlKemParams) -> Self {
        KeyPairSpec::MlKem(params)
    }

    pub fn key_type(&self) -> KeyPairType {
        match self {
            KeyPairSpec::Rsa { .. } => KeyPairType::Rsa,
            KeyPairSpec::Ec(_) => KeyPairType::Ec,
            KeyPairSpec::Dh { .. } => KeyPairType::Dh,
            KeyPairSpec::Xdh(_) => KeyPairType::Xdh,
            KeyPairSpec::MlKem(_) => KeyPairType::MlKem,
        }
    }

    /// `false` только для семейства XDH без кривой
    pub fn is_resolved(&self) -> bool {
        !matches!(self, KeyPairSpec::Xdh(None))
    }

    /// Может ли конкретная пара `presented` использоваться там, где ожидается `self`.
    pub fn admits(&self, presented: &KeyPairSpec) -> bool {
        match self {
            KeyPairSpec::Xdh(None) => matches!(presented, KeyPairSpec::Xdh(Some(_))),
            other => other == presented,
        }
    }
}

impl fmt::Display for KeyPairSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPairSpec::Rsa { modulus_bits } => write!(f, "RSA-{}", modulus_bits),
            KeyPairSpec::Ec(EcCurve::P256) => f.write_str("EC-P256"),
            KeyPairSpec::Ec(EcCurve::P384) => f.write_str("EC-P384"),
            KeyPairSpec::Dh { group_bits } => write!(f, "DH-{}", group_bits),
            KeyPairSpec::Xdh(None) => f.write_str("XDH"),
            KeyPairSpec::Xdh(Some(XdhCurve::X25519)) => f.write_str("X25519"),
            KeyPairSpec::Xdh(Some(XdhCurve::X448)) => f.write_str("X448"),
            KeyPairSpec::MlKem(MlKemParams::MlKem512) => f.write_str("ML-KEM-512"),
            KeyPairSpec::MlKem(MlKemParams::MlKem768) => f.write_str("ML-KEM-768"),
            KeyPairSpec::MlKem(MlKemParams::MlKem1024) => f.write_str("ML-KEM-1024"),
        }
    }
}

/// Тип протокола согласования.
///
/// `Sm2` присутствует только для того, чтобы фабрика могла его явно отклонить.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementType {
    Anon,
    Basic,
    Signed,
    Unified,
    Mqv,
    Kem,
    Encapsulation,
    Sm2,
}

impl AgreementType {
    pub const ALL: [AgreementType; 8] = [
        AgreementType::Anon,
        AgreementType::Basic,
        AgreementType::Signed,
        AgreementType::Unified,
        AgreementType::Mqv,
        AgreementType::Kem,
        AgreementType::Encapsulation,
        AgreementType::Sm2,
    ];
}

impl fmt::Display for AgreementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgreementType::Anon => "ANON",
            AgreementType::Basic => "BASIC",
            AgreementType::Signed => "SIGNED",
            AgreementType::Unified => "UNIFIED",
            AgreementType::Mqv => "MQV",
            AgreementType::Kem => "KEM",
            AgreementType::Encapsulation => "ENCAPSULATION",
            AgreementType::Sm2 => "SM2",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KdfType {
    None,
    Sha256Kdf,
    Sha512Kdf,
    Sha256Ckdf,
    Sha512Ckdf,
}

impl KdfType {
    pub const ALL: [KdfType; 5] = [
        KdfType::None,
        KdfType::Sha256Kdf,
        KdfType::Sha512Kdf,
        KdfType::Sha256Ckdf,
        KdfType::Sha512Ckdf,
    ];

    /// KDF2 для `*Kdf`, KDF3 (concatenation) для `*Ckdf`
    pub fn derivation_id(self) -> DerivationId {
        match self {
            KdfType::None => DerivationId::None,
            KdfType::Sha256Kdf => DerivationId::Kdf2Sha256,
            KdfType::Sha512Kdf => DerivationId::Kdf2Sha512,
            KdfType::Sha256Ckdf => DerivationId::Kdf3Sha256,
            KdfType::Sha512Ckdf => DerivationId::Kdf3Sha512,
        }
    }
}

impl fmt::Display for KdfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KdfType::None => "NONE",
            KdfType::Sha256Kdf => "SHA256KDF",
            KdfType::Sha512Kdf => "SHA512KDF",
            KdfType::Sha256Ckdf => "SHA256CKDF",
            KdfType::Sha512Ckdf => "SHA512CKDF",
        };
        f.write_str(name)
    }
}

/// Идентификатор алгоритма деривации.
///
/// Передаётся по сети (для KEM деривация встроена в сам примитив)
/// и используется локально для пост-обработки классических секретов.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivationId {
    None,
    Kdf2Sha256,
    Kdf2Sha512,
    Kdf3Sha256,
    Kdf3Sha512,
}

impl DerivationId {
    /// Стабильный однобайтовый код для wire-формата
    pub fn code(self) -> u8 {
        match self {
            DerivationId::None => 0,
            DerivationId::Kdf2Sha256 => 1,
            DerivationId::Kdf2Sha512 => 2,
            DerivationId::Kdf3Sha256 => 3,
            DerivationId::Kdf3Sha512 => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DerivationId::None),
            1 => Some(DerivationId::Kdf2Sha256),
            2 => Some(DerivationId::Kdf2Sha512),
            3 => Some(DerivationId::Kdf3Sha256),
            4 => Some(DerivationId::Kdf3Sha512),
            _ => None,
        }
    }
}

impl fmt::Display for DerivationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DerivationId::None => "NONE",
            DerivationId::Kdf2Sha256 => "KDF2-SHA256",
            DerivationId::Kdf2Sha512 => "KDF2-SHA512",
            DerivationId::Kdf3Sha256 => "KDF3-SHA256",
            DerivationId::Kdf3Sha512 => "KDF3-SHA512",
        };
        f.write_str(name)
    }
}

/// Параметры деривации, передаваемые в KEM-примитив
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derivation {
    pub id: DerivationId,
    /// Длина результата в байтах (игнорируется для `DerivationId::None`)
    pub length: usize,
}

impl Derivation {
    pub fn none() -> Self {
        Self {
            id: DerivationId::None,
            length: 0,
        }
    }
}

/// Спецификация согласования: {KeyPairSpec, AgreementType, KdfType}
/// плюс флаг взаимного подтверждения ключа.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgreementSpec {
    key_pair_spec: KeyPairSpec,
    agreement_type: AgreementType,
    kdf_type: KdfType,
    with_confirm: bool,
}

impl AgreementSpec {
    pub fn new(key_pair_spec: KeyPairSpec, agreement_type: AgreementType, kdf_type: KdfType) -> Self {
        Self {
            key_pair_spec,
            agreement_type,
            kdf_type,
            with_confirm: false,
        }
    }

    /// Та же спецификация с запросом взаимного подтверждения (UNIFIED/MQV)
    pub fn with_confirmation(mut self) -> Self {
        self.with_confirm = true;
        self
    }

    pub fn key_pair_spec(&self) -> &KeyPairSpec {
        &self.key_pair_spec
    }

    pub fn agreement_type(&self) -> AgreementType {
        self.agreement_type
    }

    pub fn kdf_type(&self) -> KdfType {
        self.kdf_type
    }

    pub fn with_confirm(&self) -> bool {
        self.with_confirm
    }
}

impl fmt::Display for AgreementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.key_pair_spec, self.agreement_type, self.kdf_type)?;
        if self.with_confirm {
            f.write_str("+CONFIRM")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xdh_family_admits_concrete_curves_only() {
        let family = KeyPairSpec::xdh();
        assert!(!family.is_resolved());
        assert!(family.admits(&KeyPairSpec::x25519()));
        assert!(family.admits(&KeyPairSpec::Xdh(Some(XdhCurve::X448))));
        assert!(!family.admits(&KeyPairSpec::xdh()));
        assert!(!family.admits(&KeyPairSpec::ec_p256()));

        assert!(KeyPairSpec::ec_p256().admits(&KeyPairSpec::ec_p256()));
        assert!(!KeyPairSpec::ec_p256().admits(&KeyPairSpec::Ec(EcCurve::P384)));
    }

    #[test]
    fn test_kdf_maps_to_derivation_id() {
        assert_eq!(KdfType::None.derivation_id(), DerivationId::None);
        assert_eq!(KdfType::Sha256Kdf.derivation_id(), DerivationId::Kdf2Sha256);
        assert_eq!(KdfType::Sha512Kdf.derivation_id(), DerivationId::Kdf2Sha512);
        assert_eq!(KdfType::Sha256Ckdf.derivation_id(), DerivationId::Kdf3Sha256);
        assert_eq!(KdfType::Sha512Ckdf.derivation_id(), DerivationId::Kdf3Sha512);
    }

    #[test]
    fn test_derivation_codes_are_stable() {
        for kdf in KdfType::ALL {
            let id = kdf.derivation_id();
            assert_eq!(DerivationId::from_code(id.code()), Some(id));
        }
        assert_eq!(DerivationId::from_code(5), None);
    }

    #[test]
    fn test_spec_display() {
        let spec = AgreementSpec::new(KeyPairSpec::ec_p256(), AgreementType::Unified, KdfType::Sha256Kdf)
            .with_confirmation();
        assert_eq!(spec.to_string(), "EC-P256/UNIFIED/SHA256KDF+CONFIRM");
        assert!(spec.with_confirm());
    }
}
