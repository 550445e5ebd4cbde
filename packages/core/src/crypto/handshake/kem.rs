// KEM: клиент инкапсулирует на публичный ключ сервера, сервер декапсулирует.
// KDF передаётся в примитив (DerivationId), отдельной деривации нет.

use super::{AgreementEngine, KeyUse};
use crate::crypto::keys::KeyPair;
use crate::crypto::spec::{Derivation, DerivationId};
use crate::error::Result;
use crate::protocol::messages::{ClientHello, KeyMaterial};
use crate::protocol::validation::validate_client_hello;
use tracing::trace;

impl AgreementEngine {
    fn kem_derivation(&self) -> Derivation {
        match self.spec.kdf_type().derivation_id() {
            DerivationId::None => Derivation::none(),
            id => Derivation {
                id,
                length: self.derived_length,
            },
        }
    }

    pub(super) fn kem_client_hello(&mut self, server_pair: &KeyPair) -> Result<ClientHello> {
        let resolved = self.admit(server_pair, KeyUse::Public)?;
        let nonce = self.fresh_nonce()?;

        let derivation = self.kem_derivation();
        let (ciphertext, secret) = self
            .backend
            .kem_generate(&resolved, server_pair.public(), &derivation)?;

        trace!(
            target: "agreement::engine",
            ciphertext_len = ciphertext.len(),
            derivation = %derivation.id,
            "Encapsulated to server key"
        );

        let hello = self.new_client_hello(KeyMaterial::Encapsulation(ciphertext), nonce)?;
        let secret = self.fused_secret(secret);
        self.store_secret(secret);
        Ok(hello)
    }

    pub(super) fn kem_accept(&mut self, server_pair: &KeyPair, hello: &ClientHello) -> Result<()> {
        validate_client_hello(hello, &self.spec, &self.config)?;
        let resolved = self.admit(server_pair, KeyUse::Private)?;

        let derivation = self.kem_derivation();
        let secret = self.backend.kem_extract(
            &resolved,
            self.private_of(server_pair)?,
            hello.payload.as_bytes(),
            &derivation,
        )?;

        let secret = self.fused_secret(secret);
        self.store_secret(secret);
        Ok(())
    }
}
