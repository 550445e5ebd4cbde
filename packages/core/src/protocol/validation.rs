// Валидация спецификаций и входящих handshake-сообщений

use crate::config::{AgreementPolicy, EngineConfig};
use crate::crypto::spec::{AgreementSpec, AgreementType, KeyPairType};
use crate::error::{AgreementError, Result};
use crate::protocol::messages::{ClientConfirm, ClientHello, ServerHello};

fn invalid(reason: impl Into<String>) -> AgreementError {
    AgreementError::InvalidSpec(reason.into())
}

/// Жёсткие правила: решения уровня алгоритмов, политика их не ослабляет
pub fn validate_protocol_rules(spec: &AgreementSpec) -> Result<()> {
    let key_type = spec.key_pair_spec().key_type();
    let agreement = spec.agreement_type();

    if agreement == AgreementType::Sm2 {
        return Err(invalid("SM2 agreement is not supported"));
    }

    if key_type == KeyPairType::Rsa {
        return Err(invalid("No agreement is defined for RSA key pairs"));
    }

    match (key_type, agreement) {
        (KeyPairType::Ec | KeyPairType::Dh | KeyPairType::Xdh, AgreementType::Kem) => {
            return Err(invalid(format!(
                "KEM agreement requires an encapsulation-capable key type, got {}",
                key_type
            )));
        }
        (KeyPairType::Xdh, AgreementType::Mqv) => {
            return Err(invalid("MQV is not defined for XDH curves"));
        }
        (
            KeyPairType::MlKem,
            AgreementType::Anon
            | AgreementType::Basic
            | AgreementType::Signed
            | AgreementType::Unified
            | AgreementType::Mqv,
        ) => {
            return Err(invalid(format!(
                "{} agreement requires a Diffie-Hellman capable key type",
                agreement
            )));
        }
        _ => {}
    }

    if spec.with_confirm() && !matches!(agreement, AgreementType::Unified | AgreementType::Mqv) {
        return Err(invalid(format!(
            "Key confirmation is only defined for UNIFIED and MQV, not {}",
            agreement
        )));
    }

    Ok(())
}

/// Полная проверка спецификации: жёсткие правила, затем политика
pub fn validate_spec(spec: &AgreementSpec, policy: &AgreementPolicy) -> Result<()> {
    validate_protocol_rules(spec)?;
    policy.permits(spec).map_err(AgreementError::InvalidSpec)
}

fn validate_agreement_field(received: &AgreementSpec, local: &AgreementSpec) -> Result<()> {
    if received != local {
        return Err(AgreementError::Codec(format!(
            "Peer uses {}, expected {}",
            received, local
        )));
    }
    Ok(())
}

fn validate_nonce(nonce: &[u8], config: &EngineConfig) -> Result<()> {
    if nonce.len() != config.nonce_length {
        return Err(AgreementError::Codec(format!(
            "Nonce must be {} bytes, got {}",
            config.nonce_length,
            nonce.len()
        )));
    }
    Ok(())
}

pub fn validate_initiator_id(id: &[u8]) -> Result<()> {
    if id.is_empty() || id.len() > u8::MAX as usize {
        return Err(AgreementError::Codec(
            "Initiator id must be 1..=255 bytes".to_string(),
        ));
    }
    Ok(())
}

/// Валидация ClientHello на стороне сервера
pub fn validate_client_hello(hello: &ClientHello, spec: &AgreementSpec, config: &EngineConfig) -> Result<()> {
    validate_agreement_field(&hello.agreement, spec)?;
    validate_nonce(&hello.nonce, config)?;

    let expects_encapsulation = matches!(
        spec.agreement_type(),
        AgreementType::Kem | AgreementType::Encapsulation
    );
    if hello.payload.is_encapsulation() != expects_encapsulation {
        return Err(AgreementError::Codec(format!(
            "ClientHello payload does not match {} agreement",
            spec.agreement_type()
        )));
    }

    if hello.payload.as_bytes().is_empty() {
        return Err(AgreementError::Codec(
            "ClientHello payload cannot be empty".to_string(),
        ));
    }

    if let Some(id) = &hello.initiator_id {
        validate_initiator_id(id)?;
    }

    Ok(())
}

/// Валидация ServerHello на стороне клиента
pub fn validate_server_hello(hello: &ServerHello, spec: &AgreementSpec, config: &EngineConfig) -> Result<()> {
    validate_agreement_field(&hello.agreement, spec)?;
    validate_nonce(&hello.nonce, config)?;

    if hello.public_key.is_empty() {
        return Err(AgreementError::Codec(
            "ServerHello public key cannot be empty".to_string(),
        ));
    }

    if hello.confirmation_tag.is_some() && !spec.with_confirm() {
        return Err(AgreementError::Codec(
            "Unexpected confirmation tag in ServerHello".to_string(),
        ));
    }

    if hello.signature.is_some() && spec.agreement_type() != AgreementType::Signed {
        return Err(AgreementError::Codec(
            "Unexpected signature in ServerHello".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_client_confirm(confirm: &ClientConfirm) -> Result<()> {
    if confirm.confirmation_tag.is_empty() {
        return Err(AgreementError::Codec(
            "Confirmation tag cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::spec::{KdfType, KeyPairSpec, MlKemParams};
    use crate::protocol::messages::KeyMaterial;

    fn spec(kps: KeyPairSpec, agreement: AgreementType) -> AgreementSpec {
        AgreementSpec::new(kps, agreement, KdfType::Sha256Kdf)
    }

    #[test]
    fn test_hard_rules() {
        for kps in [KeyPairSpec::ec_p256(), KeyPairSpec::x25519(), KeyPairSpec::dh(2048)] {
            assert!(validate_protocol_rules(&spec(kps.clone(), AgreementType::Sm2)).is_err());
            assert!(validate_protocol_rules(&spec(kps.clone(), AgreementType::Kem)).is_err());
            assert!(validate_protocol_rules(&spec(kps, AgreementType::Anon)).is_ok());
        }
        for agreement in AgreementType::ALL {
            assert!(validate_protocol_rules(&spec(KeyPairSpec::rsa(2048), agreement)).is_err());
        }
        assert!(validate_protocol_rules(&spec(KeyPairSpec::xdh(), AgreementType::Mqv)).is_err());
        assert!(validate_protocol_rules(&spec(KeyPairSpec::ec_p256(), AgreementType::Mqv)).is_ok());
    }

    #[test]
    fn test_ml_kem_allows_only_encapsulating_agreements() {
        let kps = KeyPairSpec::ml_kem(MlKemParams::MlKem768);
        assert!(validate_protocol_rules(&spec(kps.clone(), AgreementType::Kem)).is_ok());
        assert!(validate_protocol_rules(&spec(kps.clone(), AgreementType::Encapsulation)).is_ok());
        assert!(validate_protocol_rules(&spec(kps.clone(), AgreementType::Unified)).is_err());
        assert!(validate_protocol_rules(&spec(kps, AgreementType::Anon)).is_err());
    }

    #[test]
    fn test_confirmation_only_for_combined_agreements() {
        let basic = spec(KeyPairSpec::ec_p256(), AgreementType::Basic).with_confirmation();
        assert!(validate_protocol_rules(&basic).is_err());
        let mqv = spec(KeyPairSpec::ec_p256(), AgreementType::Mqv).with_confirmation();
        assert!(validate_protocol_rules(&mqv).is_ok());
    }

    #[test]
    fn test_validate_client_hello() {
        let config = EngineConfig::default();
        let local = spec(KeyPairSpec::ec_p256(), AgreementType::Anon);
        let hello = ClientHello {
            agreement: local.clone(),
            payload: KeyMaterial::PublicKey(vec![4u8; 65]),
            nonce: vec![0u8; config.nonce_length],
            initiator_id: None,
        };
        assert!(validate_client_hello(&hello, &local, &config).is_ok());

        let mut wrong_payload = hello.clone();
        wrong_payload.payload = KeyMaterial::Encapsulation(vec![1u8; 10]);
        assert!(validate_client_hello(&wrong_payload, &local, &config).is_err());

        let mut short_nonce = hello.clone();
        short_nonce.nonce = vec![0u8; 8];
        assert!(validate_client_hello(&short_nonce, &local, &config).is_err());

        let other = spec(KeyPairSpec::ec_p256(), AgreementType::Basic);
        assert!(validate_client_hello(&hello, &other, &config).is_err());
    }

    #[test]
    fn test_validate_server_hello_rejects_unexpected_fields() {
        let config = EngineConfig::default();
        let local = spec(KeyPairSpec::ec_p256(), AgreementType::Unified);
        let hello = ServerHello {
            agreement: local.clone(),
            public_key: vec![4u8; 65],
            nonce: vec![0u8; config.nonce_length],
            confirmation_tag: Some(vec![0u8; 32]),
            signature: None,
        };
        assert!(validate_server_hello(&hello, &local, &config).is_err());

        let confirmed = local.clone().with_confirmation();
        let mut hello = hello;
        hello.agreement = confirmed.clone();
        assert!(validate_server_hello(&hello, &confirmed, &config).is_ok());

        hello.signature = Some(vec![1u8; 64]);
        assert!(validate_server_hello(&hello, &confirmed, &config).is_err());
    }
}
