//! BASIC и SIGNED.
//!
//! BASIC согласует статические ключи; сессионным ключ делают nonce'ы обеих
//! сторон в otherInfo. SIGNED согласует эфемерные ключи, а сервер
//! подписывает транскрипт через `HandshakeSigner`.

use super::{AgreementEngine, HandshakeState, KeyUse, Transcript};
use crate::crypto::keys::{KeyPair, PublicKey};
use crate::crypto::spec::AgreementSpec;
use crate::error::{AgreementError, BackendError, Result};
use crate::protocol::messages::{ClientHello, KeyMaterial, ServerHello};
use crate::protocol::validation::{validate_client_hello, validate_server_hello};
use tracing::debug;

const SIGNED_TRANSCRIPT_LABEL: &[u8] = b"agreement-core signed hello";

/// Подписываемые данные SIGNED:
/// label || spec || nonces || статические ключи || эфемерные ключи
fn signed_transcript(
    spec: &AgreementSpec,
    client_hello: &ClientHello,
    server_nonce: &[u8],
    client_static: &PublicKey,
    server_static: &PublicKey,
    server_ephemeral: &[u8],
) -> Vec<u8> {
    let spec = spec.to_string();
    let mut transcript = Vec::new();
    transcript.extend_from_slice(SIGNED_TRANSCRIPT_LABEL);
    transcript.extend_from_slice(spec.as_bytes());
    transcript.extend_from_slice(&client_hello.nonce);
    transcript.extend_from_slice(server_nonce);
    transcript.extend_from_slice(client_static.as_bytes());
    transcript.extend_from_slice(server_static.as_bytes());
    transcript.extend_from_slice(client_hello.payload.as_bytes());
    transcript.extend_from_slice(server_ephemeral);
    transcript
}

impl AgreementEngine {
    pub(super) fn basic_client_hello(&mut self, client_pair: &KeyPair) -> Result<ClientHello> {
        self.admit(client_pair, KeyUse::Private)?;
        let nonce = self.fresh_nonce()?;

        let hello = self.new_client_hello(KeyMaterial::PublicKey(client_pair.public().as_bytes().to_vec()), nonce)?;
        self.sent_hello = Some(hello.clone());
        self.state = HandshakeState::ClientHelloBuilt;
        Ok(hello)
    }

    pub(super) fn basic_answer(
        &mut self,
        client_pair: &KeyPair,
        server_pair: &KeyPair,
        hello: &ClientHello,
    ) -> Result<ServerHello> {
        validate_client_hello(hello, &self.spec, &self.config)?;
        self.admit(client_pair, KeyUse::Public)?;
        let resolved = self.admit(server_pair, KeyUse::Private)?;

        if hello.payload.as_bytes() != client_pair.public().as_bytes() {
            return Err(AgreementError::InvalidKeyPair(
                "ClientHello key does not match the client's static key".to_string(),
            ));
        }

        let nonce = self.fresh_nonce()?;
        let raw = self
            .backend
            .dh_agree(&resolved, self.private_of(server_pair)?, client_pair.public())?;

        let secret = self.derive_secret(raw, &Transcript::two_pass(&self.spec, hello, &nonce))?;
        self.store_secret(secret);

        Ok(ServerHello {
            agreement: self.spec.clone(),
            public_key: server_pair.public().as_bytes().to_vec(),
            nonce,
            confirmation_tag: None,
            signature: None,
        })
    }

    pub(super) fn basic_accept(
        &mut self,
        client_pair: &KeyPair,
        server_pair: &KeyPair,
        hello: &ServerHello,
    ) -> Result<()> {
        validate_server_hello(hello, &self.spec, &self.config)?;
        let resolved = self.admit(client_pair, KeyUse::Private)?;
        self.admit(server_pair, KeyUse::Public)?;

        if self.own_client_hello()?.payload.as_bytes() != client_pair.public().as_bytes() {
            return Err(AgreementError::InvalidKeyPair(
                "Client key pair differs from the one sent in ClientHello".to_string(),
            ));
        }
        if hello.public_key != server_pair.public().as_bytes() {
            return Err(AgreementError::InvalidKeyPair(
                "ServerHello key does not match the server's static key".to_string(),
            ));
        }

        let raw = self
            .backend
            .dh_agree(&resolved, self.private_of(client_pair)?, server_pair.public())?;

        let secret = self.derive_secret(raw, &Transcript::two_pass(&self.spec, self.own_client_hello()?, &hello.nonce))?;
        self.store_secret(secret);
        Ok(())
    }

    pub(super) fn signed_client_hello(&mut self, client_pair: &KeyPair) -> Result<ClientHello> {
        let resolved = self.admit(client_pair, KeyUse::Public)?;
        self.signer()?;
        let nonce = self.fresh_nonce()?;
        let ephemeral_public = self.generate_ephemeral(&resolved)?;

        let hello = self.new_client_hello(KeyMaterial::PublicKey(ephemeral_public.as_bytes().to_vec()), nonce)?;
        self.sent_hello = Some(hello.clone());
        self.state = HandshakeState::ClientHelloBuilt;
        Ok(hello)
    }

    pub(super) fn signed_answer(
        &mut self,
        client_pair: &KeyPair,
        server_pair: &KeyPair,
        hello: &ClientHello,
    ) -> Result<ServerHello> {
        validate_client_hello(hello, &self.spec, &self.config)?;
        self.admit(client_pair, KeyUse::Public)?;
        let resolved = self.admit(server_pair, KeyUse::Public)?;
        self.signer()?;

        let nonce = self.fresh_nonce()?;
        let ephemeral_public = self.generate_ephemeral(&resolved)?;
        let peer = PublicKey::from_bytes(hello.payload.as_bytes().to_vec());
        let raw = self.backend.dh_agree(&resolved, self.ephemeral_private()?, &peer)?;
        self.wipe_ephemeral();

        let transcript = signed_transcript(
            &self.spec,
            hello,
            &nonce,
            client_pair.public(),
            server_pair.public(),
            ephemeral_public.as_bytes(),
        );
        let signature = match self.signer()?.sign(&transcript) {
            Ok(signature) => signature,
            Err(reason) => {
                self.wipe_bytes(raw);
                return Err(BackendError::Agreement(format!("Transcript signing failed: {}", reason)).into());
            }
        };

        debug!(
            target: "agreement::engine",
            signature_len = signature.len(),
            "ServerHello transcript signed"
        );

        let secret = self.derive_secret(raw, &Transcript::two_pass(&self.spec, hello, &nonce))?;
        self.store_secret(secret);

        Ok(ServerHello {
            agreement: self.spec.clone(),
            public_key: ephemeral_public.as_bytes().to_vec(),
            nonce,
            confirmation_tag: None,
            signature: Some(signature),
        })
    }

    pub(super) fn signed_accept(
        &mut self,
        client_pair: &KeyPair,
        server_pair: &KeyPair,
        hello: &ServerHello,
    ) -> Result<()> {
        validate_server_hello(hello, &self.spec, &self.config)?;
        self.admit(client_pair, KeyUse::Public)?;
        let resolved = self.admit(server_pair, KeyUse::Public)?;

        let signature = hello
            .signature
            .as_deref()
            .ok_or_else(|| AgreementError::AuthenticationFailed("ServerHello is not signed".to_string()))?;

        let transcript = signed_transcript(
            &self.spec,
            self.own_client_hello()?,
            &hello.nonce,
            client_pair.public(),
            server_pair.public(),
            &hello.public_key,
        );
        self.signer()?
            .verify(&transcript, signature)
            .map_err(|reason| AgreementError::AuthenticationFailed(format!("ServerHello signature rejected: {}", reason)))?;

        let peer = PublicKey::from_bytes(hello.public_key.clone());
        let raw = self.backend.dh_agree(&resolved, self.ephemeral_private()?, &peer)?;

        let secret = self.derive_secret(raw, &Transcript::two_pass(&self.spec, self.own_client_hello()?, &hello.nonce))?;
        self.store_secret(secret);
        Ok(())
    }
}
