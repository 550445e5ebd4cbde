//! UNIFIED (DHU) и MQV: обе стороны вносят статический и эфемерный ключ.
//!
//! Одна state machine для обоих вариантов; разница только в функции
//! комбинирования, которую выполняет backend (`dh_agree_combined`).
//!
//! ```text
//! Client                                   Server
//! create_client_hello   ── eph_C ──►       answer_client_hello
//!                       ◄── eph_S, tag_V   (AwaitingConfirmation)
//! accept_server_hello   ── tag_U ──►       accept_client_confirm
//! ```
//!
//! Без подтверждения сервер переходит в `SecretDerived` сразу после ответа.

use super::{AgreementEngine, HandshakeState, KeyUse, PendingConfirmation, Transcript};
use crate::crypto::confirm::{
    confirmation_key, confirmation_tag, verify_confirmation_tag, INITIATOR_LABEL, RESPONDER_LABEL,
};
use crate::crypto::keys::{KeyPair, PublicKey};
use crate::crypto::provider::{Combination, CombinedInputs};
use crate::error::{AgreementError, Result};
use crate::protocol::messages::{ClientConfirm, ClientHello, KeyMaterial, ServerHello};
use crate::protocol::validation::{validate_client_confirm, validate_client_hello, validate_server_hello};
use tracing::debug;

impl AgreementEngine {
    pub(super) fn combined_client_hello(&mut self, client_pair: &KeyPair) -> Result<ClientHello> {
        let resolved = self.admit(client_pair, KeyUse::Private)?;
        let nonce = self.fresh_nonce()?;
        let ephemeral_public = self.generate_ephemeral(&resolved)?;

        let hello = self.new_client_hello(KeyMaterial::PublicKey(ephemeral_public.as_bytes().to_vec()), nonce)?;
        self.sent_hello = Some(hello.clone());
        self.state = HandshakeState::ClientHelloBuilt;
        Ok(hello)
    }

    pub(super) fn combined_answer(
        &mut self,
        combination: Combination,
        client_pair: &KeyPair,
        server_pair: &KeyPair,
        hello: &ClientHello,
    ) -> Result<ServerHello> {
        validate_client_hello(hello, &self.spec, &self.config)?;
        self.admit(client_pair, KeyUse::Public)?;
        let resolved = self.admit(server_pair, KeyUse::Private)?;

        let nonce = self.fresh_nonce()?;
        let server_ephemeral = self.generate_ephemeral(&resolved)?;
        let client_ephemeral = PublicKey::from_bytes(hello.payload.as_bytes().to_vec());

        let raw = self.backend.dh_agree_combined(
            &resolved,
            combination,
            CombinedInputs {
                local_static: server_pair,
                local_ephemeral: self.ephemeral_pair()?,
                peer_static: client_pair.public(),
                peer_ephemeral: &client_ephemeral,
            },
        )?;
        self.wipe_ephemeral();

        if !self.spec.with_confirm() {
            let secret = self.derive_secret(raw, &Transcript::two_pass(&self.spec, hello, &nonce))?;
            self.store_secret(secret);
            return Ok(ServerHello {
                agreement: self.spec.clone(),
                public_key: server_ephemeral.as_bytes().to_vec(),
                nonce,
                confirmation_tag: None,
                signature: None,
            });
        }

        // MacKey строится из raw до того, как KDF его затрёт
        let mac_key = match confirmation_key(&raw, &hello.nonce, &nonce) {
            Ok(key) => key,
            Err(e) => {
                self.wipe_bytes(raw);
                return Err(e.into());
            }
        };
        let tag = confirmation_tag(
            &mac_key,
            RESPONDER_LABEL,
            server_ephemeral.as_bytes(),
            client_ephemeral.as_bytes(),
        );
        let tag = match tag {
            Ok(tag) => tag,
            Err(e) => {
                self.wipe_bytes(raw);
                self.wipe_bytes(mac_key);
                return Err(e.into());
            }
        };

        let secret = match self.derive_secret(raw, &Transcript::two_pass(&self.spec, hello, &nonce)) {
            Ok(secret) => secret,
            Err(e) => {
                self.wipe_bytes(mac_key);
                return Err(e);
            }
        };

        self.pending = Some(PendingConfirmation {
            mac_key,
            client_ephemeral: client_ephemeral.as_bytes().to_vec(),
            server_ephemeral: server_ephemeral.as_bytes().to_vec(),
            secret,
        });
        self.state = HandshakeState::AwaitingConfirmation;

        debug!(
            target: "agreement::engine",
            spec = %self.spec,
            "ServerHello sent, awaiting key confirmation"
        );

        Ok(ServerHello {
            agreement: self.spec.clone(),
            public_key: server_ephemeral.as_bytes().to_vec(),
            nonce,
            confirmation_tag: Some(tag),
            signature: None,
        })
    }

    pub(super) fn combined_accept(
        &mut self,
        combination: Combination,
        client_pair: &KeyPair,
        server_pair: &KeyPair,
        hello: &ServerHello,
    ) -> Result<Option<ClientConfirm>> {
        validate_server_hello(hello, &self.spec, &self.config)?;
        let resolved = self.admit(client_pair, KeyUse::Private)?;
        self.admit(server_pair, KeyUse::Public)?;

        if self.spec.with_confirm() && hello.confirmation_tag.is_none() {
            return Err(AgreementError::AuthenticationFailed(
                "ServerHello carries no confirmation tag".to_string(),
            ));
        }

        let server_ephemeral = PublicKey::from_bytes(hello.public_key.clone());
        let raw = self.backend.dh_agree_combined(
            &resolved,
            combination,
            CombinedInputs {
                local_static: client_pair,
                local_ephemeral: self.ephemeral_pair()?,
                peer_static: server_pair.public(),
                peer_ephemeral: &server_ephemeral,
            },
        )?;
        let client_ephemeral = self.ephemeral_pair()?.public().clone();
        self.wipe_ephemeral();

        let confirm = match hello.confirmation_tag.as_deref() {
            None => None,
            Some(tag) => {
                let mac_key = match confirmation_key(&raw, &self.own_client_hello()?.nonce, &hello.nonce) {
                    Ok(key) => key,
                    Err(e) => {
                        self.wipe_bytes(raw);
                        return Err(e.into());
                    }
                };
                let outcome = self.confirm_exchange(&mac_key, tag, &client_ephemeral, &server_ephemeral);
                self.wipe_bytes(mac_key);
                match outcome {
                    Ok(confirm) => Some(confirm),
                    Err(e) => {
                        self.wipe_bytes(raw);
                        return Err(e);
                    }
                }
            }
        };

        let secret = self.derive_secret(raw, &Transcript::two_pass(&self.spec, self.own_client_hello()?, &hello.nonce))?;
        self.store_secret(secret);
        Ok(confirm)
    }

    /// Проверка KC_1_V сервера и расчёт собственного KC_1_U
    fn confirm_exchange(
        &self,
        mac_key: &[u8],
        responder_tag: &[u8],
        client_ephemeral: &PublicKey,
        server_ephemeral: &PublicKey,
    ) -> Result<ClientConfirm> {
        let valid = verify_confirmation_tag(
            mac_key,
            RESPONDER_LABEL,
            server_ephemeral.as_bytes(),
            client_ephemeral.as_bytes(),
            responder_tag,
        )?;
        if !valid {
            return Err(AgreementError::AuthenticationFailed(
                "Server key confirmation tag mismatch".to_string(),
            ));
        }

        let tag = confirmation_tag(
            mac_key,
            INITIATOR_LABEL,
            client_ephemeral.as_bytes(),
            server_ephemeral.as_bytes(),
        )?;
        Ok(ClientConfirm { confirmation_tag: tag })
    }

    pub(super) fn combined_confirm(&mut self, confirm: &ClientConfirm) -> Result<()> {
        validate_client_confirm(confirm)?;

        let pending = self.pending.as_ref().ok_or(AgreementError::ProtocolState {
            expected: "AwaitingConfirmation",
            actual: self.state,
        })?;
        let valid = verify_confirmation_tag(
            &pending.mac_key,
            INITIATOR_LABEL,
            &pending.client_ephemeral,
            &pending.server_ephemeral,
            &confirm.confirmation_tag,
        )?;
        if !valid {
            return Err(AgreementError::AuthenticationFailed(
                "Client key confirmation tag mismatch".to_string(),
            ));
        }

        if let Some(PendingConfirmation { mut mac_key, secret, .. }) = self.pending.take() {
            self.backend.wipe(mac_key.as_mut_slice());
            self.store_secret(secret);
        }
        Ok(())
    }
}
