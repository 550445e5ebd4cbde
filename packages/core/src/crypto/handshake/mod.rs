//! Handshake-движок согласования ключей
//!
//! Один `AgreementEngine` на один handshake. Вариант протокола выбирается
//! через [`AgreementKind`], примитивы вызываются через `CryptoBackend`.
//!
//! ## Протоколы
//! - **ANON**: эфемерный ключ клиента × статический ключ сервера, один проход
//! - **ENCAPSULATION**: клиент генерирует секрет и отправляет его обёрнутым
//! - **BASIC**: статический × статический, nonce'ы делают ключ сессионным
//! - **SIGNED**: эфемерный × эфемерный, сервер подписывает транскрипт
//! - **UNIFIED / MQV**: статические + эфемерные ключи обеих сторон,
//!   опционально с взаимным подтверждением ключа
//! - **KEM**: инкапсуляция на публичный ключ сервера, KDF встроен в примитив
//!
//! ## Dataflow
//! ```text
//! Client                                      Server
//! ======                                      ======
//!
//! create_client_hello()  ── ClientHello ──►   accept_client_hello()      (ANON, KEM, ENCAPSULATION)
//!                                             answer_client_hello()      (BASIC, SIGNED, UNIFIED, MQV)
//! accept_server_hello()  ◄── ServerHello ──
//!                        ── ClientConfirm ──► accept_client_confirm()    (UNIFIED/MQV + confirmation)
//! ```
//!
//! Движок одноразовый: после `SecretDerived` или `Failed` любой шаг
//! возвращает `ProtocolState`. Любая ошибка шага затирает эфемерный
//! материал и переводит движок в `Failed`.

mod anonymous;
mod basic;
mod combined;
mod kem;
pub mod signer;

use crate::config::EngineConfig;
use crate::crypto::kdf;
use crate::crypto::keys::{KeyPair, PrivateKey, PublicKey};
use crate::crypto::provider::{Combination, CryptoBackend};
use crate::crypto::spec::{AgreementSpec, AgreementType, KdfType, KeyPairSpec};
use crate::error::{AgreementError, BackendError, Result};
use crate::protocol::messages::{ClientConfirm, ClientHello, KeyMaterial, ServerHello};
use crate::protocol::validation::validate_initiator_id;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::Zeroizing;

pub use signer::{Ed25519HelloSigner, HandshakeSigner};

/// Сторона handshake'а
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

/// Состояние движка
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    /// Ни один шаг ещё не выполнен
    Init,
    /// Клиент отправил ClientHello и ждёт ServerHello
    ClientHelloBuilt,
    /// Сервер отправил ServerHello с тегом и ждёт ClientConfirm
    AwaitingConfirmation,
    /// Секрет получен (терминальное)
    SecretDerived,
    /// Handshake прерван ошибкой (терминальное)
    Failed,
}

impl HandshakeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakeState::SecretDerived | HandshakeState::Failed)
    }
}

/// Вариант state machine, выбранный фабрикой
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgreementKind {
    Anonymous,
    Encapsulation,
    Basic,
    Signed,
    Combined(Combination),
    Kem,
}

impl AgreementKind {
    /// `None` для SM2: для него state machine нет
    pub fn for_agreement(agreement: AgreementType) -> Option<Self> {
        match agreement {
            AgreementType::Anon => Some(AgreementKind::Anonymous),
            AgreementType::Encapsulation => Some(AgreementKind::Encapsulation),
            AgreementType::Basic => Some(AgreementKind::Basic),
            AgreementType::Signed => Some(AgreementKind::Signed),
            AgreementType::Unified => Some(AgreementKind::Combined(Combination::Unified)),
            AgreementType::Mqv => Some(AgreementKind::Combined(Combination::Mqv)),
            AgreementType::Kem => Some(AgreementKind::Kem),
            AgreementType::Sm2 => None,
        }
    }

    /// Одна передача ClientHello без ответа сервера
    pub fn is_one_pass(self) -> bool {
        matches!(
            self,
            AgreementKind::Anonymous | AgreementKind::Encapsulation | AgreementKind::Kem
        )
    }
}

/// Какой класс примитивов backend'а нужен движку
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCapability {
    /// Конечное поле
    Dh,
    /// Эллиптические кривые (включая разрешённые XDH кривые)
    Ec,
    Kem,
    /// Семейство XDH: кривая определяется первой предъявленной парой
    Deferred,
}

impl BackendCapability {
    pub fn for_key_pair_spec(spec: &KeyPairSpec) -> Option<Self> {
        match spec {
            KeyPairSpec::Ec(_) | KeyPairSpec::Xdh(Some(_)) => Some(BackendCapability::Ec),
            KeyPairSpec::Xdh(None) => Some(BackendCapability::Deferred),
            KeyPairSpec::Dh { .. } => Some(BackendCapability::Dh),
            KeyPairSpec::MlKem(_) => Some(BackendCapability::Kem),
            KeyPairSpec::Rsa { .. } => None,
        }
    }
}

/// Привязка к конкретному алгоритму; для XDH устанавливается один раз
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmBinding {
    Unresolved,
    Resolved(KeyPairSpec),
}

/// Результат handshake'а.
///
/// Если задан KDF, наружу отдаются только derived-байты, а raw затёрт
/// сразу после деривации.
pub struct SharedSecret {
    kdf: KdfType,
    raw: Option<Zeroizing<Vec<u8>>>,
    derived: Option<Zeroizing<Vec<u8>>>,
}

impl SharedSecret {
    /// Derived-байты, если задан KDF, иначе raw
    pub fn as_bytes(&self) -> &[u8] {
        self.derived
            .as_ref()
            .or(self.raw.as_ref())
            .map(|bytes| bytes.as_slice())
            .unwrap_or(&[])
    }

    pub fn derived_bytes(&self) -> Option<&[u8]> {
        self.derived.as_ref().map(|bytes| bytes.as_slice())
    }

    /// `None`, если секрет прошёл через KDF
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        self.raw.as_ref().map(|bytes| bytes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn kdf_type(&self) -> KdfType {
        self.kdf
    }

    fn wipe_with(&mut self, backend: &dyn CryptoBackend) {
        for bytes in [self.raw.as_mut(), self.derived.as_mut()].into_iter().flatten() {
            backend.wipe(bytes.as_mut_slice());
        }
        self.raw = None;
        self.derived = None;
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("kdf", &self.kdf)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Состояние сервера между ServerHello и ClientConfirm
struct PendingConfirmation {
    mac_key: Zeroizing<Vec<u8>>,
    client_ephemeral: Vec<u8>,
    server_ephemeral: Vec<u8>,
    secret: SharedSecret,
}

/// Входы KDF otherInfo
struct Transcript<'a> {
    spec: &'a AgreementSpec,
    client_nonce: &'a [u8],
    server_nonce: &'a [u8],
    initiator_id: Option<&'a [u8]>,
}

impl<'a> Transcript<'a> {
    fn one_pass(spec: &'a AgreementSpec, hello: &'a ClientHello) -> Self {
        Self {
            spec,
            client_nonce: &hello.nonce,
            server_nonce: &[],
            initiator_id: hello.initiator_id.as_deref(),
        }
    }

    fn two_pass(spec: &'a AgreementSpec, client_hello: &'a ClientHello, server_nonce: &'a [u8]) -> Self {
        Self {
            spec,
            client_nonce: &client_hello.nonce,
            server_nonce,
            initiator_id: client_hello.initiator_id.as_deref(),
        }
    }

    /// spec || clientNonce || serverNonce || initiatorId
    fn other_info(&self) -> Vec<u8> {
        let spec = self.spec.to_string();
        let mut info = Vec::with_capacity(
            spec.len()
                + self.client_nonce.len()
                + self.server_nonce.len()
                + self.initiator_id.map_or(0, <[u8]>::len),
        );
        info.extend_from_slice(spec.as_bytes());
        info.extend_from_slice(self.client_nonce);
        info.extend_from_slice(self.server_nonce);
        if let Some(id) = self.initiator_id {
            info.extend_from_slice(id);
        }
        info
    }
}

/// Нужна ли приватная часть предъявленной пары
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyUse {
    Public,
    Private,
}

/// Движок одного handshake'а. Создаётся через `AgreementFactory::create`.
pub struct AgreementEngine {
    spec: AgreementSpec,
    kind: AgreementKind,
    capability: BackendCapability,
    binding: AlgorithmBinding,
    algorithm: Arc<str>,
    backend: Arc<dyn CryptoBackend>,
    config: Arc<EngineConfig>,
    signer: Option<Box<dyn HandshakeSigner>>,
    derived_length: usize,
    initiator_id: Option<Vec<u8>>,
    role: Option<Role>,
    state: HandshakeState,
    ephemeral: Option<KeyPair>,
    sent_hello: Option<ClientHello>,
    pending: Option<PendingConfirmation>,
    secret: Option<SharedSecret>,
}

impl AgreementEngine {
    pub(crate) fn new(
        spec: AgreementSpec,
        kind: AgreementKind,
        capability: BackendCapability,
        algorithm: Arc<str>,
        backend: Arc<dyn CryptoBackend>,
        config: Arc<EngineConfig>,
    ) -> Self {
        let binding = match capability {
            BackendCapability::Deferred => AlgorithmBinding::Unresolved,
            _ => AlgorithmBinding::Resolved(spec.key_pair_spec().clone()),
        };

        let derived_length = config.derived_key_length;
        Self {
            spec,
            kind,
            capability,
            binding,
            algorithm,
            backend,
            config,
            signer: None,
            derived_length,
            initiator_id: None,
            role: None,
            state: HandshakeState::Init,
            ephemeral: None,
            sent_hello: None,
            pending: None,
            secret: None,
        }
    }

    /// Подписант транскрипта для SIGNED (обеим сторонам)
    pub fn with_signer(mut self, signer: Box<dyn HandshakeSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Длина выводимого ключа для этого handshake'а (по умолчанию из `EngineConfig`).
    /// Ноль оставляет значение конфигурации.
    pub fn with_derived_length(mut self, len: usize) -> Self {
        if len > 0 {
            self.derived_length = len;
        }
        self
    }

    pub fn derived_length(&self) -> usize {
        self.derived_length
    }

    /// Идентификатор инициатора, попадает в ClientHello и в KDF otherInfo
    pub fn with_initiator_id(mut self, id: impl Into<Vec<u8>>) -> Self {
        self.initiator_id = Some(id.into());
        self
    }

    pub fn spec(&self) -> &AgreementSpec {
        &self.spec
    }

    pub fn kind(&self) -> AgreementKind {
        self.kind
    }

    pub fn capability(&self) -> BackendCapability {
        self.capability
    }

    pub fn binding(&self) -> &AlgorithmBinding {
        &self.binding
    }

    /// Имя алгоритма из кэша фабрики
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Держит ли движок эфемерный ключ или незавершённое подтверждение
    pub fn holds_ephemeral_material(&self) -> bool {
        self.ephemeral.is_some() || self.pending.is_some()
    }

    /// Секрет доступен только в `SecretDerived`
    pub fn secret(&self) -> Result<&SharedSecret> {
        match (&self.secret, self.state) {
            (Some(secret), HandshakeState::SecretDerived) => Ok(secret),
            _ => Err(AgreementError::ProtocolState {
                expected: "SecretDerived",
                actual: self.state,
            }),
        }
    }

    /// Забрать секрет; движок после этого больше ничего не держит
    pub fn into_secret(mut self) -> Result<SharedSecret> {
        if self.state != HandshakeState::SecretDerived {
            return Err(AgreementError::ProtocolState {
                expected: "SecretDerived",
                actual: self.state,
            });
        }
        self.secret.take().ok_or(AgreementError::ProtocolState {
            expected: "SecretDerived",
            actual: self.state,
        })
    }

    // ========================================================================
    // Шаги handshake'а
    // ========================================================================

    /// Первый шаг клиента.
    ///
    /// Для ANON, ENCAPSULATION и KEM `pair` это статическая пара сервера
    /// (достаточно публичной части), и секрет клиента готов сразу.
    /// Для BASIC, SIGNED, UNIFIED и MQV `pair` это собственная пара клиента.
    pub fn create_client_hello(&mut self, pair: &KeyPair) -> Result<ClientHello> {
        self.enter(Role::Client, HandshakeState::Init, "Init")?;

        debug!(
            target: "agreement::engine",
            spec = %self.spec,
            kind = ?self.kind,
            "Building ClientHello"
        );

        let result = match self.kind {
            AgreementKind::Anonymous => self.anonymous_client_hello(pair),
            AgreementKind::Encapsulation => self.encapsulation_client_hello(pair),
            AgreementKind::Kem => self.kem_client_hello(pair),
            AgreementKind::Basic => self.basic_client_hello(pair),
            AgreementKind::Signed => self.signed_client_hello(pair),
            AgreementKind::Combined(_) => self.combined_client_hello(pair),
        };
        self.conclude(result)
    }

    /// Сервер принимает ClientHello одно-проходного протокола (ANON,
    /// ENCAPSULATION, KEM). Ответа нет, секрет готов сразу.
    pub fn accept_client_hello(&mut self, server_pair: &KeyPair, hello: &ClientHello) -> Result<()> {
        self.enter(Role::Server, HandshakeState::Init, "Init")?;

        debug!(
            target: "agreement::engine",
            spec = %self.spec,
            payload_len = hello.payload.as_bytes().len(),
            "Accepting ClientHello"
        );

        let result = match self.kind {
            AgreementKind::Anonymous => self.anonymous_accept(server_pair, hello),
            AgreementKind::Encapsulation => self.encapsulation_accept(server_pair, hello),
            AgreementKind::Kem => self.kem_accept(server_pair, hello),
            _ => Err(self.wrong_kind("one-pass agreement (ANON, KEM, ENCAPSULATION)")),
        };
        self.conclude(result)
    }

    /// То же, что [`Self::accept_client_hello`]
    pub fn process_client_hello(&mut self, server_pair: &KeyPair, hello: &ClientHello) -> Result<()> {
        self.accept_client_hello(server_pair, hello)
    }

    /// Сервер отвечает на ClientHello двух-проходного протокола
    pub fn answer_client_hello(
        &mut self,
        client_pair: &KeyPair,
        server_pair: &KeyPair,
        hello: &ClientHello,
    ) -> Result<ServerHello> {
        self.enter(Role::Server, HandshakeState::Init, "Init")?;

        debug!(
            target: "agreement::engine",
            spec = %self.spec,
            "Answering ClientHello"
        );

        let result = match self.kind {
            AgreementKind::Basic => self.basic_answer(client_pair, server_pair, hello),
            AgreementKind::Signed => self.signed_answer(client_pair, server_pair, hello),
            AgreementKind::Combined(combination) => {
                self.combined_answer(combination, client_pair, server_pair, hello)
            }
            _ => Err(self.wrong_kind("two-pass agreement (BASIC, SIGNED, UNIFIED, MQV)")),
        };
        self.conclude(result)
    }

    /// Клиент принимает ServerHello. Для UNIFIED/MQV с подтверждением
    /// возвращает ClientConfirm, который нужно отправить серверу.
    pub fn accept_server_hello(
        &mut self,
        client_pair: &KeyPair,
        server_pair: &KeyPair,
        hello: &ServerHello,
    ) -> Result<Option<ClientConfirm>> {
        self.enter(Role::Client, HandshakeState::ClientHelloBuilt, "ClientHelloBuilt")?;

        debug!(
            target: "agreement::engine",
            spec = %self.spec,
            signed = hello.signature.is_some(),
            confirmed = hello.confirmation_tag.is_some(),
            "Accepting ServerHello"
        );

        let result = match self.kind {
            AgreementKind::Basic => self.basic_accept(client_pair, server_pair, hello).map(|_| None),
            AgreementKind::Signed => self.signed_accept(client_pair, server_pair, hello).map(|_| None),
            AgreementKind::Combined(combination) => {
                self.combined_accept(combination, client_pair, server_pair, hello)
            }
            _ => Err(self.wrong_kind("two-pass agreement (BASIC, SIGNED, UNIFIED, MQV)")),
        };
        self.conclude(result)
    }

    /// Сервер проверяет тег KC_1_U клиента
    pub fn accept_client_confirm(&mut self, confirm: &ClientConfirm) -> Result<()> {
        self.enter(Role::Server, HandshakeState::AwaitingConfirmation, "AwaitingConfirmation")?;
        let result = self.combined_confirm(confirm);
        self.conclude(result)
    }

    // ========================================================================
    // Общие помощники
    // ========================================================================

    /// Проверка порядка шагов. Ошибка на незавершённом движке прерывает
    /// handshake; на завершённом секрет остаётся нетронутым.
    fn enter(&mut self, role: Role, required: HandshakeState, expected: &'static str) -> Result<()> {
        let role_matches = self.role.map_or(true, |current| current == role);
        if self.state == required && role_matches {
            self.role = Some(role);
            return Ok(());
        }

        let error = AgreementError::ProtocolState {
            expected,
            actual: self.state,
        };
        if !self.state.is_terminal() {
            self.abort(&error);
        }
        Err(error)
    }

    fn wrong_kind(&self, expected: &'static str) -> AgreementError {
        AgreementError::ProtocolState {
            expected,
            actual: self.state,
        }
    }

    fn conclude<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            self.abort(error);
        }
        result
    }

    fn abort(&mut self, error: &AgreementError) {
        warn!(
            target: "agreement::engine",
            spec = %self.spec,
            state = ?self.state,
            error = %error,
            "Handshake aborted"
        );
        self.wipe_all();
        self.state = HandshakeState::Failed;
    }

    /// Проверяет предъявленную пару и при необходимости привязывает
    /// движок к её кривой. Возвращает разрешённую спецификацию.
    fn admit(&mut self, pair: &KeyPair, usage: KeyUse) -> Result<KeyPairSpec> {
        if !self.spec.key_pair_spec().admits(pair.spec()) {
            return Err(AgreementError::InvalidKeyPair(format!(
                "{} key pair presented to {} agreement",
                pair.spec(),
                self.spec
            )));
        }

        let resolved = match &self.binding {
            AlgorithmBinding::Resolved(bound) => {
                if bound != pair.spec() {
                    return Err(AgreementError::InvalidKeyPair(format!(
                        "{} key pair presented, handshake is bound to {}",
                        pair.spec(),
                        bound
                    )));
                }
                bound.clone()
            }
            AlgorithmBinding::Unresolved => {
                let resolved = self
                    .backend
                    .resolve(pair.spec())
                    .map_err(|e| AgreementError::InvalidKeyPair(e.to_string()))?;
                debug!(
                    target: "agreement::engine",
                    family = %self.spec.key_pair_spec(),
                    resolved = %resolved,
                    "Algorithm bound from presented key pair"
                );
                self.binding = AlgorithmBinding::Resolved(resolved.clone());
                resolved
            }
        };

        self.backend
            .check_key_pair(pair, &resolved)
            .map_err(|e| AgreementError::InvalidKeyPair(e.to_string()))?;

        if usage == KeyUse::Private && !pair.has_private() {
            return Err(AgreementError::InvalidKeyPair(format!(
                "{} key pair has no private part",
                pair.spec()
            )));
        }

        Ok(resolved)
    }

    fn fresh_nonce(&self) -> Result<Vec<u8>> {
        Ok(self.backend.random_bytes(self.config.nonce_length)?)
    }

    /// Новая эфемерная пара; хранится в движке до явного затирания
    fn generate_ephemeral(&mut self, spec: &KeyPairSpec) -> Result<PublicKey> {
        let pair = self.backend.generate_key_pair(spec)?;
        let public = pair.public().clone();
        self.ephemeral = Some(pair);
        Ok(public)
    }

    fn ephemeral_pair(&self) -> Result<&KeyPair> {
        self.ephemeral
            .as_ref()
            .ok_or_else(|| BackendError::KeyGeneration("No ephemeral key pair held".to_string()).into())
    }

    fn ephemeral_private(&self) -> Result<&PrivateKey> {
        self.ephemeral_pair()?
            .private()
            .ok_or_else(|| BackendError::KeyGeneration("Ephemeral key pair has no private part".to_string()).into())
    }

    /// Приватная часть уже принятой (`KeyUse::Private`) пары
    fn private_of<'p>(&self, pair: &'p KeyPair) -> Result<&'p PrivateKey> {
        pair.private().ok_or_else(|| {
            AgreementError::InvalidKeyPair(format!("{} key pair has no private part", pair.spec()))
        })
    }

    fn wipe_ephemeral(&mut self) {
        if let Some(mut pair) = self.ephemeral.take() {
            if let Some(private) = pair.private_mut() {
                self.backend.wipe(private.bytes_mut());
            }
        }
    }

    fn wipe_all(&mut self) {
        self.wipe_ephemeral();
        if let Some(mut pending) = self.pending.take() {
            self.backend.wipe(pending.mac_key.as_mut_slice());
            pending.secret.wipe_with(self.backend.as_ref());
        }
        if let Some(mut secret) = self.secret.take() {
            secret.wipe_with(self.backend.as_ref());
        }
    }

    fn wipe_bytes(&self, mut bytes: Zeroizing<Vec<u8>>) {
        self.backend.wipe(bytes.as_mut_slice());
    }

    /// Деривация для не-KEM путей. Raw затирается сразу после KDF.
    fn derive_secret(&self, mut raw: Zeroizing<Vec<u8>>, transcript: &Transcript<'_>) -> Result<SharedSecret> {
        let kdf_type = self.spec.kdf_type();
        if kdf_type == KdfType::None {
            return Ok(SharedSecret {
                kdf: kdf_type,
                raw: Some(raw),
                derived: None,
            });
        }

        let derived = kdf::derive(
            kdf_type.derivation_id(),
            &raw,
            &transcript.other_info(),
            self.derived_length,
        );
        self.backend.wipe(raw.as_mut_slice());

        Ok(SharedSecret {
            kdf: kdf_type,
            raw: None,
            derived: Some(derived?),
        })
    }

    /// Секрет KEM-пути, деривация уже выполнена примитивом
    fn fused_secret(&self, secret: Zeroizing<Vec<u8>>) -> SharedSecret {
        let kdf_type = self.spec.kdf_type();
        if kdf_type == KdfType::None {
            SharedSecret {
                kdf: kdf_type,
                raw: Some(secret),
                derived: None,
            }
        } else {
            SharedSecret {
                kdf: kdf_type,
                raw: None,
                derived: Some(secret),
            }
        }
    }

    fn store_secret(&mut self, secret: SharedSecret) {
        debug!(
            target: "agreement::engine",
            spec = %self.spec,
            role = ?self.role,
            len = secret.len(),
            "Shared secret established"
        );
        self.wipe_ephemeral();
        self.secret = Some(secret);
        self.state = HandshakeState::SecretDerived;
    }

    fn own_client_hello(&self) -> Result<&ClientHello> {
        self.sent_hello.as_ref().ok_or(AgreementError::ProtocolState {
            expected: "ClientHelloBuilt",
            actual: self.state,
        })
    }

    fn new_client_hello(&self, payload: KeyMaterial, nonce: Vec<u8>) -> Result<ClientHello> {
        if let Some(id) = &self.initiator_id {
            validate_initiator_id(id)?;
        }
        Ok(ClientHello {
            agreement: self.spec.clone(),
            payload,
            nonce,
            initiator_id: self.initiator_id.clone(),
        })
    }

    fn signer(&self) -> Result<&dyn HandshakeSigner> {
        self.signer.as_deref().ok_or(AgreementError::ProtocolState {
            expected: "engine with a HandshakeSigner",
            actual: self.state,
        })
    }
}

impl Drop for AgreementEngine {
    fn drop(&mut self) {
        self.wipe_all();
    }
}

impl fmt::Debug for AgreementEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgreementEngine")
            .field("spec", &self.spec)
            .field("kind", &self.kind)
            .field("binding", &self.binding)
            .field("backend", &self.backend.name())
            .field("role", &self.role)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_every_agreement() {
        assert_eq!(AgreementKind::for_agreement(AgreementType::Sm2), None);
        assert_eq!(
            AgreementKind::for_agreement(AgreementType::Mqv),
            Some(AgreementKind::Combined(Combination::Mqv))
        );
        for agreement in [AgreementType::Anon, AgreementType::Kem, AgreementType::Encapsulation] {
            assert!(AgreementKind::for_agreement(agreement).unwrap().is_one_pass());
        }
        assert!(!AgreementKind::Basic.is_one_pass());
    }

    #[test]
    fn test_capability_mapping() {
        assert_eq!(
            BackendCapability::for_key_pair_spec(&KeyPairSpec::xdh()),
            Some(BackendCapability::Deferred)
        );
        assert_eq!(
            BackendCapability::for_key_pair_spec(&KeyPairSpec::x25519()),
            Some(BackendCapability::Ec)
        );
        assert_eq!(
            BackendCapability::for_key_pair_spec(&KeyPairSpec::dh(2048)),
            Some(BackendCapability::Dh)
        );
        assert_eq!(BackendCapability::for_key_pair_spec(&KeyPairSpec::rsa(2048)), None);
    }

    #[test]
    fn test_other_info_layout() {
        let spec = AgreementSpec::new(KeyPairSpec::ec_p256(), AgreementType::Basic, KdfType::Sha256Kdf);
        let transcript = Transcript {
            spec: &spec,
            client_nonce: b"cn",
            server_nonce: b"sn",
            initiator_id: Some(b"id"),
        };
        assert_eq!(transcript.other_info(), b"EC-P256/BASIC/SHA256KDFcnsnid".to_vec());
    }

    #[test]
    fn test_shared_secret_exposes_derived_only() {
        let secret = SharedSecret {
            kdf: KdfType::Sha256Kdf,
            raw: None,
            derived: Some(Zeroizing::new(vec![7u8; 32])),
        };
        assert_eq!(secret.as_bytes(), &[7u8; 32]);
        assert!(secret.raw_bytes().is_none());
        assert!(!format!("{:?}", secret).contains('7'));
    }
}
