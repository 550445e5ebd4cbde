//! Defines the CryptoBackend trait: the primitive operations the agreement
//! engine calls through.
//!
//! The engine never does curve or lattice math itself. Key material crosses
//! this boundary as opaque byte encodings keyed by [`KeyPairSpec`].

use crate::crypto::keys::{KeyPair, PrivateKey, PublicKey};
use crate::crypto::spec::{Derivation, KeyPairSpec};
use crate::error::{BackendError, BackendResult};
use zeroize::{Zeroize, Zeroizing};

/// Combination function for four-key (static + ephemeral) agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combination {
    /// DHU: `Z = Ze || Zs`
    Unified,
    /// MQV primitive (SP 800-56A)
    Mqv,
}

/// Inputs for a combined agreement, seen from the local party.
pub struct CombinedInputs<'a> {
    pub local_static: &'a KeyPair,
    pub local_ephemeral: &'a KeyPair,
    pub peer_static: &'a PublicKey,
    pub peer_ephemeral: &'a PublicKey,
}

/// Primitive operations for every key pair type a backend supports.
///
/// Implementations must be stateless with respect to handshakes: one backend
/// instance is shared by every engine a factory creates.
pub trait CryptoBackend: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether this backend can serve key pairs of the given spec.
    /// For the XDH family this means "at least one XDH curve".
    fn supports(&self, spec: &KeyPairSpec) -> bool;

    /// Resolves the concrete algorithm for a presented key pair spec.
    ///
    /// Called once per handshake for deferred (XDH family) bindings.
    fn resolve(&self, presented: &KeyPairSpec) -> BackendResult<KeyPairSpec> {
        if presented.is_resolved() && self.supports(presented) {
            Ok(presented.clone())
        } else {
            Err(BackendError::Unsupported(presented.to_string()))
        }
    }

    /// Generates a fresh key pair (used for ephemeral keys).
    fn generate_key_pair(&self, spec: &KeyPairSpec) -> BackendResult<KeyPair>;

    /// Checks that the pair's encodings are valid for `expected` and that the
    /// private part, when present, matches the public part.
    fn check_key_pair(&self, pair: &KeyPair, expected: &KeyPairSpec) -> BackendResult<()>;

    /// Checks a pair against its own spec.
    fn check_key_pair_self(&self, pair: &KeyPair) -> BackendResult<()> {
        self.check_key_pair(pair, pair.spec())
    }

    /// Plain two-key agreement.
    fn dh_agree(
        &self,
        spec: &KeyPairSpec,
        local: &PrivateKey,
        peer: &PublicKey,
    ) -> BackendResult<Zeroizing<Vec<u8>>>;

    /// Four-key agreement, computed in one call.
    fn dh_agree_combined(
        &self,
        spec: &KeyPairSpec,
        combination: Combination,
        inputs: CombinedInputs<'_>,
    ) -> BackendResult<Zeroizing<Vec<u8>>>;

    /// Encapsulates against the peer's public key.
    /// Returns `(ciphertext, secret)`; the secret is already derived with
    /// `derivation` unless its id is `None`.
    fn kem_generate(
        &self,
        spec: &KeyPairSpec,
        peer: &PublicKey,
        derivation: &Derivation,
    ) -> BackendResult<(Vec<u8>, Zeroizing<Vec<u8>>)>;

    /// Decapsulates `ciphertext` with the local private key.
    fn kem_extract(
        &self,
        spec: &KeyPairSpec,
        local: &PrivateKey,
        ciphertext: &[u8],
        derivation: &Derivation,
    ) -> BackendResult<Zeroizing<Vec<u8>>>;

    /// Cryptographically secure random bytes.
    fn random_bytes(&self, len: usize) -> BackendResult<Vec<u8>>;

    /// Zero-fills secret material. The engine routes every wipe through here.
    fn wipe(&self, bytes: &mut [u8]) {
        bytes.zeroize();
    }
}
