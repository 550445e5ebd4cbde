// Agreement Core
// Key-agreement handshake engine: DH/EC/XDH, Unified, MQV, signed and KEM agreements

#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

// Модули
pub mod config;
pub mod crypto;
pub mod error;
pub mod protocol;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-exports для удобства
pub use config::{AgreementPolicy, EngineConfig};
pub use crypto::factory::AgreementFactory;
pub use crypto::handshake::{
    AgreementEngine, AgreementKind, AlgorithmBinding, BackendCapability, Ed25519HelloSigner, HandshakeSigner,
    HandshakeState, Role, SharedSecret,
};
pub use crypto::keys::{KeyPair, PrivateKey, PublicKey};
pub use crypto::provider::CryptoBackend;
pub use crypto::spec::{AgreementSpec, AgreementType, KdfType, KeyPairSpec};
pub use crypto::suites::StandardSuite;
pub use error::{AgreementError, BackendError, Result};
pub use protocol::messages::{ClientConfirm, ClientHello, HandshakeMessage, ServerHello};
