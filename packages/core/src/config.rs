//! Конфигурация движка согласования.
//!
//! В отличие от глобального синглтона конфигурация передаётся явно:
//! в `AgreementFactory::new` и в конструктор backend'а. Никакого
//! процессного изменяемого состояния.

use crate::crypto::spec::{AgreementSpec, AgreementType, KdfType, KeyPairType};

/// Настраиваемая политика поверх жёстких правил валидации.
///
/// Сюда попадают исключения, которые являются ограничениями конкретного
/// провайдера, а не требованиями протокола.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementPolicy {
    /// Запрещённые пары (тип ключа, тип согласования)
    pub excluded_agreements: Vec<(KeyPairType, AgreementType)>,

    /// Запрещённые пары (тип ключа, KDF)
    pub excluded_kdfs: Vec<(KeyPairType, KdfType)>,

    /// Требовать KDF при взаимном подтверждении ключа
    pub require_kdf_for_confirmation: bool,
}

impl Default for AgreementPolicy {
    fn default() -> Self {
        Self {
            excluded_agreements: Vec::new(),
            excluded_kdfs: Vec::new(),
            require_kdf_for_confirmation: true,
        }
    }
}

impl AgreementPolicy {
    pub fn exclude_agreement(mut self, key_type: KeyPairType, agreement: AgreementType) -> Self {
        self.excluded_agreements.push((key_type, agreement));
        self
    }

    pub fn exclude_kdf(mut self, key_type: KeyPairType, kdf: KdfType) -> Self {
        self.excluded_kdfs.push((key_type, kdf));
        self
    }

    /// Проверка исключений политики; `Err` содержит причину отказа
    pub fn permits(&self, spec: &AgreementSpec) -> Result<(), String> {
        let key_type = spec.key_pair_spec().key_type();

        if self
            .excluded_agreements
            .contains(&(key_type, spec.agreement_type()))
        {
            return Err(format!(
                "{} agreement for {} keys is disabled by policy",
                spec.agreement_type(),
                key_type
            ));
        }

        if self.excluded_kdfs.contains(&(key_type, spec.kdf_type())) {
            return Err(format!(
                "{} for {} keys is disabled by policy",
                spec.kdf_type(),
                key_type
            ));
        }

        if spec.with_confirm() && self.require_kdf_for_confirmation && spec.kdf_type() == KdfType::None {
            return Err("Key confirmation requires a KDF".to_string());
        }

        Ok(())
    }
}

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Длина derived-секрета (в байтах) для не-KEM путей и KEM с KDF
    pub derived_key_length: usize,

    /// Длина nonce в ClientHello/ServerHello (в байтах, минимум 16)
    pub nonce_length: usize,

    /// Длина случайного секрета в ENCAPSULATION (в байтах)
    pub encapsulated_secret_length: usize,

    /// Максимальный размер закодированного handshake-сообщения (DoS защита)
    pub max_message_size: usize,

    /// Политика допустимых комбинаций
    pub policy: AgreementPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            derived_key_length: 32,
            nonce_length: 32,
            encapsulated_secret_length: 32,
            // ML-KEM-1024 ciphertext (1568) + запас на заголовки
            max_message_size: 64 * 1024,
            policy: AgreementPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Минимальная длина nonce: из него берётся 12-байтовый AEAD nonce
    pub const MIN_NONCE_LENGTH: usize = 16;

    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Переопределяем значения из env, если они заданы
        if let Ok(val) = std::env::var("AGREEMENT_DERIVED_KEY_LENGTH") {
            if let Ok(parsed) = val.parse() {
                config.derived_key_length = parsed;
            }
        }

        if let Ok(val) = std::env::var("AGREEMENT_NONCE_LENGTH") {
            if let Ok(parsed) = val.parse() {
                config.nonce_length = parsed;
            }
        }

        if let Ok(val) = std::env::var("AGREEMENT_ENCAPSULATED_SECRET_LENGTH") {
            if let Ok(parsed) = val.parse() {
                config.encapsulated_secret_length = parsed;
            }
        }

        if let Ok(val) = std::env::var("AGREEMENT_MAX_MESSAGE_SIZE") {
            if let Ok(parsed) = val.parse() {
                config.max_message_size = parsed;
            }
        }

        if let Ok(val) = std::env::var("AGREEMENT_REQUIRE_KDF_FOR_CONFIRMATION") {
            if let Ok(parsed) = val.parse() {
                config.policy.require_kdf_for_confirmation = parsed;
            }
        }

        config.sanitized()
    }

    /// Поправить значения, при которых движок не может работать
    pub fn sanitized(mut self) -> Self {
        if self.nonce_length < Self::MIN_NONCE_LENGTH {
            self.nonce_length = Self::MIN_NONCE_LENGTH;
        }
        if self.derived_key_length == 0 {
            self.derived_key_length = 32;
        }
        if self.encapsulated_secret_length == 0 {
            self.encapsulated_secret_length = 32;
        }
        self
    }

    pub fn with_policy(mut self, policy: AgreementPolicy) -> Self {
        self.policy = policy;
        self
    }
}
