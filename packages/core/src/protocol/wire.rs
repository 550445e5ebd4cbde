// Wire format (MessagePack сериализация)
// Используется для передачи handshake-сообщений по транспорту вызывающего кода.
//
// Декодер строгий: вход принимается только если повторное кодирование
// даёт те же байты. Поэтому encode(decode(x)) == x для любого принятого x.

use crate::protocol::messages::{EncapsulatedSecret, HandshakeMessage};
use crate::error::{AgreementError, Result};
use rmp_serde::{Deserializer, Serializer};
use serde::{Deserialize, Serialize};

/// Упаковать handshake-сообщение
pub fn pack_message(message: &HandshakeMessage) -> Result<Vec<u8>> {
    pack_raw(message)
}

/// Распаковать handshake-сообщение с проверкой размера и каноничности
pub fn unpack_message(data: &[u8], max_size: usize) -> Result<HandshakeMessage> {
    if data.len() > max_size {
        return Err(AgreementError::Codec(format!(
            "Message of {} bytes exceeds limit of {} bytes",
            data.len(),
            max_size
        )));
    }
    unpack_canonical(data)
}

/// Упаковать содержимое ENCAPSULATION
pub fn pack_encapsulated(secret: &EncapsulatedSecret) -> Result<Vec<u8>> {
    pack_raw(secret)
}

pub fn unpack_encapsulated(data: &[u8]) -> Result<EncapsulatedSecret> {
    unpack_canonical(data)
}

/// Упаковать произвольные данные в MessagePack
pub fn pack_raw<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    data.serialize(&mut Serializer::new(&mut buffer))?;
    Ok(buffer)
}

/// Распаковать MessagePack в произвольный тип
pub fn unpack_raw<'a, T: Deserialize<'a>>(data: &'a [u8]) -> Result<T> {
    let mut deserializer = Deserializer::new(data);
    Ok(T::deserialize(&mut deserializer)?)
}

fn unpack_canonical<T>(data: &[u8]) -> Result<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let value: T = unpack_raw(data)?;
    // Хвостовые байты, неминимальные целые и т.п. дают другое кодирование
    if pack_raw(&value)? != data {
        return Err(AgreementError::Codec(
            "Non-canonical encoding".to_string(),
        ));
    }
    Ok(value)
}

impl HandshakeMessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        pack_message(self)
    }

    pub fn decode(data: &[u8], max_size: usize) -> Result<Self> {
        unpack_message(data, max_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::spec::{AgreementSpec, AgreementType, KdfType, KeyPairSpec};
    use crate::protocol::messages::{ClientConfirm, ClientHello, KeyMaterial, ServerHello};

    const LIMIT: usize = 64 * 1024;

    fn sample_client_hello() -> ClientHello {
        ClientHello {
            agreement: AgreementSpec::new(KeyPairSpec::ec_p256(), AgreementType::Anon, KdfType::Sha256Kdf),
            payload: KeyMaterial::PublicKey(vec![4u8; 65]),
            nonce: vec![1u8; 32],
            initiator_id: Some(b"alice".to_vec()),
        }
    }

    #[test]
    fn test_pack_unpack_client_hello() {
        let msg = HandshakeMessage::from(sample_client_hello());
        let packed = msg.encode().unwrap();
        assert!(!packed.is_empty());

        let unpacked = HandshakeMessage::decode(&packed, LIMIT).unwrap();
        assert_eq!(unpacked, msg);
        assert_eq!(unpacked.encode().unwrap(), packed);
    }

    #[test]
    fn test_discriminator_selects_variant() {
        let server = HandshakeMessage::from(ServerHello {
            agreement: AgreementSpec::new(KeyPairSpec::x25519(), AgreementType::Unified, KdfType::Sha256Kdf)
                .with_confirmation(),
            public_key: vec![9u8; 32],
            nonce: vec![2u8; 32],
            confirmation_tag: Some(vec![3u8; 32]),
            signature: None,
        });
        let packed = server.encode().unwrap();
        let decoded = HandshakeMessage::decode(&packed, LIMIT).unwrap();
        assert_eq!(decoded.kind(), "ServerHello");
        assert!(decoded.clone().into_client_hello().is_err());
        assert_eq!(decoded.into_server_hello().unwrap().confirmation_tag, Some(vec![3u8; 32]));

        let confirm = HandshakeMessage::from(ClientConfirm {
            confirmation_tag: vec![5u8; 32],
        });
        let decoded = HandshakeMessage::decode(&confirm.encode().unwrap(), LIMIT).unwrap();
        assert_eq!(decoded, confirm);
    }

    #[test]
    fn test_payload_variant_survives_encoding() {
        let mut hello = sample_client_hello();
        hello.payload = KeyMaterial::Encapsulation(vec![0xAB; 1088]);
        let packed = HandshakeMessage::from(hello).encode().unwrap();
        let decoded = HandshakeMessage::decode(&packed, LIMIT)
            .unwrap()
            .into_client_hello()
            .unwrap();
        assert!(decoded.payload.is_encapsulation());
        assert_eq!(decoded.payload.as_bytes().len(), 1088);
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut packed = HandshakeMessage::from(sample_client_hello()).encode().unwrap();
        packed.push(0xC0);
        assert!(matches!(
            HandshakeMessage::decode(&packed, LIMIT),
            Err(AgreementError::Codec(_))
        ));
    }

    #[test]
    fn test_oversized_and_garbage_input() {
        let packed = HandshakeMessage::from(sample_client_hello()).encode().unwrap();
        assert!(HandshakeMessage::decode(&packed, 16).is_err());
        assert!(HandshakeMessage::decode(&[0xFF, 0x00, 0x13], LIMIT).is_err());
        assert!(HandshakeMessage::decode(&[], LIMIT).is_err());
    }

    #[test]
    fn test_encapsulated_secret_roundtrip() {
        let secret = EncapsulatedSecret {
            key_material: vec![1u8; 32],
            wrapped: vec![2u8; 48],
        };
        let packed = pack_encapsulated(&secret).unwrap();
        assert_eq!(unpack_encapsulated(&packed).unwrap(), secret);
    }
}
