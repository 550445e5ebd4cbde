//! ANON и ENCAPSULATION: одно-проходные протоколы с анонимным инициатором.
//!
//! ```text
//! ANON:          Z = DH(eph_C, static_S)
//! ENCAPSULATION: K = HKDF(DH(eph_C, static_S) | KEM(static_S), nonce)
//!                payload = { eph_C.pub | ct, AEAD_K(secret) }
//! ```

use super::{AgreementEngine, KeyUse, Transcript};
use crate::crypto::keys::{KeyPair, PublicKey};
use crate::crypto::spec::{Derivation, KeyPairSpec};
use crate::crypto::wrap;
use crate::error::Result;
use crate::protocol::messages::{ClientHello, EncapsulatedSecret, KeyMaterial};
use crate::protocol::validation::validate_client_hello;
use crate::protocol::wire::{pack_encapsulated, unpack_encapsulated};
use tracing::trace;
use zeroize::Zeroizing;

impl AgreementEngine {
    pub(super) fn anonymous_client_hello(&mut self, server_pair: &KeyPair) -> Result<ClientHello> {
        let resolved = self.admit(server_pair, KeyUse::Public)?;
        let nonce = self.fresh_nonce()?;
        let ephemeral_public = self.generate_ephemeral(&resolved)?;

        let raw = self
            .backend
            .dh_agree(&resolved, self.ephemeral_private()?, server_pair.public())?;
        self.wipe_ephemeral();

        let hello = self.new_client_hello(KeyMaterial::PublicKey(ephemeral_public.as_bytes().to_vec()), nonce)?;
        let secret = self.derive_secret(raw, &Transcript::one_pass(&self.spec, &hello))?;
        self.store_secret(secret);
        Ok(hello)
    }

    pub(super) fn anonymous_accept(&mut self, server_pair: &KeyPair, hello: &ClientHello) -> Result<()> {
        validate_client_hello(hello, &self.spec, &self.config)?;
        let resolved = self.admit(server_pair, KeyUse::Private)?;

        let peer = PublicKey::from_bytes(hello.payload.as_bytes().to_vec());
        let raw = self.backend.dh_agree(&resolved, self.private_of(server_pair)?, &peer)?;

        let secret = self.derive_secret(raw, &Transcript::one_pass(&self.spec, hello))?;
        self.store_secret(secret);
        Ok(())
    }

    pub(super) fn encapsulation_client_hello(&mut self, server_pair: &KeyPair) -> Result<ClientHello> {
        let resolved = self.admit(server_pair, KeyUse::Public)?;
        let nonce = self.fresh_nonce()?;
        let secret = Zeroizing::new(self.backend.random_bytes(self.config.encapsulated_secret_length)?);

        let (key_material, shared) = match resolved {
            KeyPairSpec::MlKem(_) => self
                .backend
                .kem_generate(&resolved, server_pair.public(), &Derivation::none())?,
            _ => {
                let ephemeral_public = self.generate_ephemeral(&resolved)?;
                let shared = self
                    .backend
                    .dh_agree(&resolved, self.ephemeral_private()?, server_pair.public())?;
                self.wipe_ephemeral();
                (ephemeral_public.as_bytes().to_vec(), shared)
            }
        };

        let wrapping_key = wrap::wrapping_key(&shared, &nonce);
        self.wipe_bytes(shared);
        let wrapping_key = wrapping_key?;

        let aad = self.spec.to_string();
        let wrapped = wrap::seal(&wrapping_key, &nonce, &secret, aad.as_bytes());
        self.wipe_bytes(wrapping_key);
        let payload = pack_encapsulated(&EncapsulatedSecret {
            key_material,
            wrapped: wrapped?,
        })?;

        trace!(
            target: "agreement::engine",
            payload_len = payload.len(),
            secret_len = secret.len(),
            "Secret encapsulated"
        );

        let hello = self.new_client_hello(KeyMaterial::Encapsulation(payload), nonce)?;
        let secret = self.derive_secret(secret, &Transcript::one_pass(&self.spec, &hello))?;
        self.store_secret(secret);
        Ok(hello)
    }

    pub(super) fn encapsulation_accept(&mut self, server_pair: &KeyPair, hello: &ClientHello) -> Result<()> {
        validate_client_hello(hello, &self.spec, &self.config)?;
        let resolved = self.admit(server_pair, KeyUse::Private)?;
        let encapsulated = unpack_encapsulated(hello.payload.as_bytes())?;
        let private = self.private_of(server_pair)?;

        let shared = match resolved {
            KeyPairSpec::MlKem(_) => self.backend.kem_extract(
                &resolved,
                private,
                &encapsulated.key_material,
                &Derivation::none(),
            )?,
            _ => {
                let peer = PublicKey::from_bytes(encapsulated.key_material.clone());
                self.backend.dh_agree(&resolved, private, &peer)?
            }
        };

        let wrapping_key = wrap::wrapping_key(&shared, &hello.nonce);
        self.wipe_bytes(shared);
        let wrapping_key = wrapping_key?;

        let aad = self.spec.to_string();
        let secret = wrap::open(&wrapping_key, &hello.nonce, &encapsulated.wrapped, aad.as_bytes());
        self.wipe_bytes(wrapping_key);

        let secret = self.derive_secret(secret?, &Transcript::one_pass(&self.spec, hello))?;
        self.store_secret(secret);
        Ok(())
    }
}
