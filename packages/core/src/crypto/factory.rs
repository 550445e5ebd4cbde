//! AgreementFactory: проверка спецификации и выбор варианта движка.
//!
//! Фабрика не держит состояния handshake'ов. Единственное изменяемое
//! поле: кэш имён алгоритмов, заполняемый идемпотентно: повторная
//! вставка того же значения безвредна.

use crate::config::EngineConfig;
use crate::crypto::handshake::{AgreementEngine, AgreementKind, BackendCapability};
use crate::crypto::provider::CryptoBackend;
use crate::crypto::spec::{AgreementSpec, AgreementType, KdfType, KeyPairSpec};
use crate::error::{AgreementError, Result};
use crate::protocol::validation::validate_spec;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

pub struct AgreementFactory {
    backend: Arc<dyn CryptoBackend>,
    config: Arc<EngineConfig>,
    names: RwLock<HashMap<AgreementSpec, Arc<str>>>,
}

impl AgreementFactory {
    pub fn new(backend: Arc<dyn CryptoBackend>, config: EngineConfig) -> Self {
        let config = config.sanitized();
        info!(
            target: "agreement::factory",
            backend = backend.name(),
            derived_key_length = config.derived_key_length,
            nonce_length = config.nonce_length,
            "Agreement factory created"
        );
        Self {
            backend,
            config: Arc::new(config),
            names: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn CryptoBackend> {
        &self.backend
    }

    /// Проверяет спецификацию и создаёт движок.
    ///
    /// Правила валидации применяются до любого обращения к backend'у;
    /// затем backend подтверждает, что обслуживает этот тип ключей.
    pub fn create(&self, spec: &AgreementSpec) -> Result<AgreementEngine> {
        validate_spec(spec, &self.config.policy)?;

        let kind = AgreementKind::for_agreement(spec.agreement_type()).ok_or_else(|| {
            AgreementError::InvalidSpec(format!("No state machine for {}", spec.agreement_type()))
        })?;
        let capability = BackendCapability::for_key_pair_spec(spec.key_pair_spec()).ok_or_else(|| {
            AgreementError::InvalidSpec(format!("No agreement for {} keys", spec.key_pair_spec()))
        })?;

        if !self.backend.supports(spec.key_pair_spec()) {
            return Err(AgreementError::InvalidSpec(format!(
                "Backend '{}' does not support {}",
                self.backend.name(),
                spec.key_pair_spec()
            )));
        }

        let algorithm = self.algorithm_name(spec);

        debug!(
            target: "agreement::factory",
            spec = %spec,
            kind = ?kind,
            capability = ?capability,
            "Agreement engine created"
        );

        Ok(AgreementEngine::new(
            spec.clone(),
            kind,
            capability,
            algorithm,
            Arc::clone(&self.backend),
            Arc::clone(&self.config),
        ))
    }

    /// Все допустимые спецификации для данного типа ключей
    /// (без подтверждения; UNIFIED/MQV с подтверждением строятся через `with_confirmation`).
    pub fn supported_specs(&self, key_pair_spec: &KeyPairSpec) -> Vec<AgreementSpec> {
        if !self.backend.supports(key_pair_spec) {
            return Vec::new();
        }

        let mut specs = Vec::new();
        for agreement in AgreementType::ALL {
            for kdf in KdfType::ALL {
                let spec = AgreementSpec::new(key_pair_spec.clone(), agreement, kdf);
                if validate_spec(&spec, &self.config.policy).is_ok() {
                    specs.push(spec);
                }
            }
        }
        specs
    }

    fn algorithm_name(&self, spec: &AgreementSpec) -> Arc<str> {
        if let Ok(names) = self.names.read() {
            if let Some(name) = names.get(spec) {
                return Arc::clone(name);
            }
        }

        let name: Arc<str> = Arc::from(format!("{}@{}", spec, self.backend.name()));
        // Отравленный lock не мешает работе: имя просто не кэшируется
        if let Ok(mut names) = self.names.write() {
            names.entry(spec.clone()).or_insert_with(|| Arc::clone(&name));
        }
        name
    }

    /// Количество закэшированных имён
    pub fn cached_names(&self) -> usize {
        self.names.read().map(|names| names.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for AgreementFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgreementFactory")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::spec::MlKemParams;
    use crate::crypto::suites::StandardSuite;

    fn factory() -> AgreementFactory {
        AgreementFactory::new(Arc::new(StandardSuite::new()), EngineConfig::default())
    }

    #[test]
    fn test_create_selects_kind() {
        let factory = factory();
        let spec = AgreementSpec::new(KeyPairSpec::ec_p256(), AgreementType::Mqv, KdfType::Sha256Kdf);
        let engine = factory.create(&spec).unwrap();
        assert_eq!(engine.kind(), AgreementKind::Combined(crate::crypto::provider::Combination::Mqv));
        assert_eq!(engine.capability(), BackendCapability::Ec);
        assert_eq!(engine.algorithm(), "EC-P256/MQV/SHA256KDF@standard");
    }

    #[test]
    fn test_unsupported_key_type_is_invalid_spec() {
        let spec = AgreementSpec::new(KeyPairSpec::dh(2048), AgreementType::Anon, KdfType::Sha256Kdf);
        assert!(matches!(factory().create(&spec), Err(AgreementError::InvalidSpec(_))));
    }

    #[test]
    fn test_name_cache_is_idempotent() {
        let factory = factory();
        let spec = AgreementSpec::new(KeyPairSpec::x25519(), AgreementType::Anon, KdfType::None);
        factory.create(&spec).unwrap();
        factory.create(&spec).unwrap();
        assert_eq!(factory.cached_names(), 1);
    }

    #[test]
    fn test_supported_specs_for_ml_kem() {
        let specs = factory().supported_specs(&KeyPairSpec::ml_kem(MlKemParams::MlKem768));
        assert!(!specs.is_empty());
        assert!(specs.iter().all(|spec| matches!(
            spec.agreement_type(),
            AgreementType::Kem | AgreementType::Encapsulation
        )));
        assert_eq!(specs.len(), 2 * KdfType::ALL.len());
    }

    #[test]
    fn test_supported_specs_for_xdh_excludes_mqv_and_kem() {
        let specs = factory().supported_specs(&KeyPairSpec::xdh());
        assert!(specs.iter().all(|spec| !matches!(
            spec.agreement_type(),
            AgreementType::Mqv | AgreementType::Kem | AgreementType::Sm2
        )));
        assert_eq!(specs.len(), 5 * KdfType::ALL.len());
    }
}
