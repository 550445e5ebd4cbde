use thiserror::Error;

use crate::crypto::handshake::HandshakeState;

/// Ошибки CryptoBackend: всё, что поднимают примитивы (DH, KEM, RNG).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Unsupported key pair spec: {0}")]
    Unsupported(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
    #[error("Agreement computation failed: {0}")]
    Agreement(String),
    #[error("KEM encapsulation failed: {0}")]
    KemEncapsulation(String),
    #[error("KEM decapsulation failed: {0}")]
    KemDecapsulation(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Random generation failed: {0}")]
    Random(String),
}

/// Ошибки движка согласования ключей.
///
/// Ни одна из них не повторяется внутри движка: повторы, если нужны,
/// делает транспортный уровень.
#[derive(Error, Debug)]
pub enum AgreementError {
    /// Комбинация (keyType, agreementType, kdfType) запрещена политикой.
    #[error("Invalid agreement spec: {0}")]
    InvalidSpec(String),

    /// Пара ключей не того типа или не той спецификации.
    #[error("Invalid key pair: {0}")]
    InvalidKeyPair(String),

    /// Примитив backend'а вернул ошибку.
    #[error("Agreement failed: {0}")]
    AgreementFailed(#[from] BackendError),

    /// Подпись или confirmation tag не прошли проверку.
    /// Возможная активная атака, не повторять.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Шаг handshake вызван не по порядку или на завершённом движке.
    #[error("Protocol state error: expected {expected}, found {actual:?}")]
    ProtocolState {
        expected: &'static str,
        actual: HandshakeState,
    },

    /// Сообщение не декодируется или не соответствует спецификации.
    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<rmp_serde::encode::Error> for AgreementError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        AgreementError::Codec(format!("MessagePack pack error: {}", err))
    }
}

impl From<rmp_serde::decode::Error> for AgreementError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        AgreementError::Codec(format!("MessagePack unpack error: {}", err))
    }
}

impl From<rand::Error> for BackendError {
    fn from(err: rand::Error) -> Self {
        BackendError::Random(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgreementError>;
pub type BackendResult<T> = std::result::Result<T, BackendError>;
