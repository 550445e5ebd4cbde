//! Инструменты для тестов: backend со счётчиками и игрушечный DH.
//!
//! `InstrumentedBackend` оборачивает `StandardSuite`, считает обращения и
//! затирания, умеет имитировать отказ примитивов. Конечное поле DH
//! стандартный набор не реализует, поэтому здесь есть игрушечная группа
//! по модулю 2^61 − 1: её размер годится только для проверки state machine.

use crate::crypto::keys::{KeyPair, PrivateKey, PublicKey};
use crate::crypto::provider::{Combination, CombinedInputs, CryptoBackend};
use crate::crypto::spec::{Derivation, KeyPairSpec};
use crate::crypto::suites::classic::unified;
use crate::crypto::suites::StandardSuite;
use crate::error::{BackendError, BackendResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use zeroize::{Zeroize, Zeroizing};

/// Размер игрушечной группы в битах
pub const TOY_DH_BITS: u16 = 61;

const TOY_P: u64 = (1 << 61) - 1;
const TOY_G: u64 = 3;

/// Спецификация, которую обслуживает игрушечный DH
pub fn toy_dh() -> KeyPairSpec {
    KeyPairSpec::dh(TOY_DH_BITS)
}

// ============================================================================
// Toy finite-field DH
// ============================================================================

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1u64;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    result
}

fn toy_decode(bytes: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

fn toy_public(public: &PublicKey) -> BackendResult<u64> {
    match toy_decode(public.as_bytes()) {
        // 0, 1 и p − 1 дают вырожденный секрет
        Some(y) if (2..=TOY_P - 2).contains(&y) => Ok(y),
        _ => Err(BackendError::InvalidPublicKey("Toy DH public value out of range".to_string())),
    }
}

fn toy_private(private: &PrivateKey) -> BackendResult<u64> {
    match toy_decode(private.expose_secret()) {
        Some(x) if (2..=TOY_P - 2).contains(&x) => Ok(x),
        _ => Err(BackendError::InvalidPrivateKey("Toy DH private value out of range".to_string())),
    }
}

fn toy_generate(spec: &KeyPairSpec, random: &[u8]) -> BackendResult<KeyPair> {
    let seed = toy_decode(random)
        .ok_or_else(|| BackendError::KeyGeneration("Toy DH needs 8 random bytes".to_string()))?;
    let x = 2 + seed % (TOY_P - 3);
    let y = pow_mod(TOY_G, x, TOY_P);
    Ok(KeyPair::new(
        spec.clone(),
        PublicKey::from_bytes(y.to_be_bytes().to_vec()),
        PrivateKey::from_bytes(x.to_be_bytes().to_vec()),
    ))
}

fn toy_check(pair: &KeyPair) -> BackendResult<()> {
    let y = toy_public(pair.public())?;
    if let Some(private) = pair.private() {
        if pow_mod(TOY_G, toy_private(private)?, TOY_P) != y {
            return Err(BackendError::InvalidPrivateKey(
                "Toy DH private value does not match public value".to_string(),
            ));
        }
    }
    Ok(())
}

fn toy_agree(local: &PrivateKey, peer: &PublicKey) -> BackendResult<Zeroizing<Vec<u8>>> {
    let z = pow_mod(toy_public(peer)?, toy_private(local)?, TOY_P);
    if z <= 1 {
        return Err(BackendError::Agreement("Toy DH produced a degenerate secret".to_string()));
    }
    Ok(Zeroizing::new(z.to_be_bytes().to_vec()))
}

/// Младшие 32 бита плюс 2^32
fn toy_associate(value: u64) -> u64 {
    (value & 0xFFFF_FFFF) | (1 << 32)
}

fn toy_mqv(inputs: &CombinedInputs<'_>) -> BackendResult<Zeroizing<Vec<u8>>> {
    let d = toy_private(inputs.local_static.private().ok_or_else(|| {
        BackendError::InvalidPrivateKey("MQV needs the local static private key".to_string())
    })?)?;
    let e = toy_private(inputs.local_ephemeral.private().ok_or_else(|| {
        BackendError::InvalidPrivateKey("MQV needs the local ephemeral private key".to_string())
    })?)?;
    let local_ephemeral = toy_public(inputs.local_ephemeral.public())?;
    let peer_static = toy_public(inputs.peer_static)?;
    let peer_ephemeral = toy_public(inputs.peer_ephemeral)?;

    let order = TOY_P - 1;
    let implicit = (e as u128 + mul_mod(toy_associate(local_ephemeral), d, order) as u128) % order as u128;
    let base = mul_mod(
        peer_ephemeral,
        pow_mod(peer_static, toy_associate(peer_ephemeral), TOY_P),
        TOY_P,
    );
    let z = pow_mod(base, implicit as u64, TOY_P);
    if z <= 1 {
        return Err(BackendError::Agreement("Toy MQV produced a degenerate secret".to_string()));
    }
    Ok(Zeroizing::new(z.to_be_bytes().to_vec()))
}

// ============================================================================
// InstrumentedBackend
// ============================================================================

/// Backend со счётчиками вызовов и затираний
#[derive(Debug, Default)]
pub struct InstrumentedBackend {
    inner: StandardSuite,
    calls: AtomicUsize,
    wipes: AtomicUsize,
    wiped_bytes: AtomicUsize,
    fail_agreements: AtomicBool,
    fail_random: AtomicBool,
}

impl InstrumentedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Обращения к backend'у, кроме `name` и `wipe`
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn wipes(&self) -> usize {
        self.wipes.load(Ordering::SeqCst)
    }

    pub fn wiped_bytes(&self) -> usize {
        self.wiped_bytes.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
        self.wipes.store(0, Ordering::SeqCst);
        self.wiped_bytes.store(0, Ordering::SeqCst);
    }

    /// DH, combined и KEM примитивы начинают возвращать ошибку
    pub fn fail_agreements(&self, fail: bool) {
        self.fail_agreements.store(fail, Ordering::SeqCst);
    }

    pub fn fail_random(&self, fail: bool) {
        self.fail_random.store(fail, Ordering::SeqCst);
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check_agreement(&self) -> BackendResult<()> {
        if self.fail_agreements.load(Ordering::SeqCst) {
            return Err(BackendError::Agreement("Injected agreement failure".to_string()));
        }
        Ok(())
    }

    fn is_toy(spec: &KeyPairSpec) -> bool {
        *spec == toy_dh()
    }
}

impl CryptoBackend for InstrumentedBackend {
    fn name(&self) -> &'static str {
        "instrumented"
    }

    fn supports(&self, spec: &KeyPairSpec) -> bool {
        self.record();
        Self::is_toy(spec) || self.inner.supports(spec)
    }

    fn resolve(&self, presented: &KeyPairSpec) -> BackendResult<KeyPairSpec> {
        self.record();
        self.inner.resolve(presented)
    }

    fn generate_key_pair(&self, spec: &KeyPairSpec) -> BackendResult<KeyPair> {
        self.record();
        if Self::is_toy(spec) {
            let mut random = self.random_bytes(8)?;
            let pair = toy_generate(spec, &random);
            random.zeroize();
            return pair;
        }
        self.inner.generate_key_pair(spec)
    }

    fn check_key_pair(&self, pair: &KeyPair, expected: &KeyPairSpec) -> BackendResult<()> {
        self.record();
        if Self::is_toy(expected) {
            if pair.spec() != expected {
                return Err(BackendError::Unsupported(format!(
                    "Key pair is {}, expected {}",
                    pair.spec(),
                    expected
                )));
            }
            return toy_check(pair);
        }
        self.inner.check_key_pair(pair, expected)
    }

    fn dh_agree(
        &self,
        spec: &KeyPairSpec,
        local: &PrivateKey,
        peer: &PublicKey,
    ) -> BackendResult<Zeroizing<Vec<u8>>> {
        self.record();
        self.check_agreement()?;
        if Self::is_toy(spec) {
            return toy_agree(local, peer);
        }
        self.inner.dh_agree(spec, local, peer)
    }

    fn dh_agree_combined(
        &self,
        spec: &KeyPairSpec,
        combination: Combination,
        inputs: CombinedInputs<'_>,
    ) -> BackendResult<Zeroizing<Vec<u8>>> {
        self.record();
        self.check_agreement()?;
        if Self::is_toy(spec) {
            return match combination {
                Combination::Unified => unified(inputs, toy_agree),
                Combination::Mqv => toy_mqv(&inputs),
            };
        }
        self.inner.dh_agree_combined(spec, combination, inputs)
    }

    fn kem_generate(
        &self,
        spec: &KeyPairSpec,
        peer: &PublicKey,
        derivation: &Derivation,
    ) -> BackendResult<(Vec<u8>, Zeroizing<Vec<u8>>)> {
        self.record();
        self.check_agreement()?;
        self.inner.kem_generate(spec, peer, derivation)
    }

    fn kem_extract(
        &self,
        spec: &KeyPairSpec,
        local: &PrivateKey,
        ciphertext: &[u8],
        derivation: &Derivation,
    ) -> BackendResult<Zeroizing<Vec<u8>>> {
        self.record();
        self.check_agreement()?;
        self.inner.kem_extract(spec, local, ciphertext, derivation)
    }

    fn random_bytes(&self, len: usize) -> BackendResult<Vec<u8>> {
        self.record();
        if self.fail_random.load(Ordering::SeqCst) {
            return Err(BackendError::Random("Injected RNG failure".to_string()));
        }
        self.inner.random_bytes(len)
    }

    fn wipe(&self, bytes: &mut [u8]) {
        self.wipes.fetch_add(1, Ordering::SeqCst);
        self.wiped_bytes.fetch_add(bytes.len(), Ordering::SeqCst);
        bytes.zeroize();
    }
}

/// Логи в тестах: `RUST_LOG=agreement=debug cargo test`
#[cfg(feature = "test-support")]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_test_writer())
        .with(filter)
        .try_init();
}
