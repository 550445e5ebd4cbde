// Типы handshake-сообщений: ClientHello / ServerHello / ClientConfirm.
// Кодек в wire.rs.

use crate::crypto::spec::AgreementSpec;
use crate::error::{AgreementError, Result};
use serde::{Deserialize, Serialize};

/// Ключевой материал ClientHello: ровно один из вариантов,
/// выбирается типом согласования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyMaterial {
    /// Кодировка публичного ключа: эфемерного (ANON, SIGNED, UNIFIED, MQV)
    /// или статического ключа инициатора (BASIC)
    PublicKey(#[serde(with = "serde_bytes")] Vec<u8>),
    /// Шифртекст KEM или обёрнутый секрет (KEM, ENCAPSULATION)
    Encapsulation(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl KeyMaterial {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            KeyMaterial::PublicKey(bytes) | KeyMaterial::Encapsulation(bytes) => bytes,
        }
    }

    pub fn is_encapsulation(&self) -> bool {
        matches!(self, KeyMaterial::Encapsulation(_))
    }
}

/// Первое сообщение инициатора
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientHello {
    /// Спецификация, по которой работает инициатор
    pub agreement: AgreementSpec,
    pub payload: KeyMaterial,
    /// Случайный nonce инициатора (вход KDF otherInfo)
    #[serde(with = "serde_bytes")]
    pub nonce: Vec<u8>,
    /// Необязательный идентификатор инициатора
    #[serde(with = "serde_bytes")]
    pub initiator_id: Option<Vec<u8>>,
}

/// Ответ сервера (BASIC, SIGNED, UNIFIED, MQV)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerHello {
    pub agreement: AgreementSpec,
    /// Эфемерный публичный ключ сервера (статический для BASIC)
    #[serde(with = "serde_bytes")]
    pub public_key: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub nonce: Vec<u8>,
    /// Тег KC_1_V, если запрошено подтверждение
    #[serde(with = "serde_bytes")]
    pub confirmation_tag: Option<Vec<u8>>,
    /// Подпись транскрипта (SIGNED)
    #[serde(with = "serde_bytes")]
    pub signature: Option<Vec<u8>>,
}

/// Подтверждение клиента (UNIFIED/MQV с подтверждением)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfirm {
    #[serde(with = "serde_bytes")]
    pub confirmation_tag: Vec<u8>,
}

/// Содержимое `KeyMaterial::Encapsulation` для ENCAPSULATION:
/// эфемерный ключ или KEM-шифртекст плюс AEAD-обёрнутый секрет
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncapsulatedSecret {
    #[serde(with = "serde_bytes")]
    pub key_material: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub wrapped: Vec<u8>,
}

/// Конверт для передачи по сети; имя варианта служит дискриминатором типа
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeMessage {
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    ClientConfirm(ClientConfirm),
}

impl HandshakeMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            HandshakeMessage::ClientHello(_) => "ClientHello",
            HandshakeMessage::ServerHello(_) => "ServerHello",
            HandshakeMessage::ClientConfirm(_) => "ClientConfirm",
        }
    }

    pub fn into_client_hello(self) -> Result<ClientHello> {
        match self {
            HandshakeMessage::ClientHello(hello) => Ok(hello),
            other => Err(AgreementError::Codec(format!(
                "Expected ClientHello, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_server_hello(self) -> Result<ServerHello> {
        match self {
            HandshakeMessage::ServerHello(hello) => Ok(hello),
            other => Err(AgreementError::Codec(format!(
                "Expected ServerHello, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_client_confirm(self) -> Result<ClientConfirm> {
        match self {
            HandshakeMessage::ClientConfirm(confirm) => Ok(confirm),
            other => Err(AgreementError::Codec(format!(
                "Expected ClientConfirm, got {}",
                other.kind()
            ))),
        }
    }
}

impl From<ClientHello> for HandshakeMessage {
    fn from(hello: ClientHello) -> Self {
        HandshakeMessage::ClientHello(hello)
    }
}

impl From<ServerHello> for HandshakeMessage {
    fn from(hello: ServerHello) -> Self {
        HandshakeMessage::ServerHello(hello)
    }
}

impl From<ClientConfirm> for HandshakeMessage {
    fn from(confirm: ClientConfirm) -> Self {
        HandshakeMessage::ClientConfirm(confirm)
    }
}
