// Ключевые пары в backend-независимом представлении.
// Байты интерпретирует только CryptoBackend.

use crate::crypto::spec::KeyPairSpec;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Кодировка публичного ключа (SEC1 для EC, 32 байта для X25519, ek для ML-KEM)
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({} bytes)", self.0.len())
    }
}

/// Приватный ключ; обнуляется при drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn expose_secret(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Пара ключей. Приватная часть может отсутствовать, если стороне нужен
/// только публичный ключ партнёра.
#[derive(Clone, Debug)]
pub struct KeyPair {
    spec: KeyPairSpec,
    public: PublicKey,
    private: Option<PrivateKey>,
}

impl KeyPair {
    pub fn new(spec: KeyPairSpec, public: PublicKey, private: PrivateKey) -> Self {
        Self {
            spec,
            public,
            private: Some(private),
        }
    }

    pub fn public_only(spec: KeyPairSpec, public: PublicKey) -> Self {
        Self {
            spec,
            public,
            private: None,
        }
    }

    pub fn spec(&self) -> &KeyPairSpec {
        &self.spec
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub fn private(&self) -> Option<&PrivateKey> {
        self.private.as_ref()
    }

    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    /// Копия без приватной части, например для передачи партнёру
    pub fn to_public(&self) -> KeyPair {
        KeyPair::public_only(self.spec.clone(), self.public.clone())
    }

    pub(crate) fn private_mut(&mut self) -> Option<&mut PrivateKey> {
        self.private.as_mut()
    }
}
