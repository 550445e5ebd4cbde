//! Классические примитивы стандартного набора: P-256 и X25519.
//!
//! Кодировки:
//! - P-256: приватный ключ 32 байта (big-endian скаляр), публичный SEC1 uncompressed (65 байт)
//! - X25519: 32 + 32 байта (RFC 7748)

use crate::crypto::keys::{KeyPair, PrivateKey, PublicKey};
use crate::crypto::provider::{Combination, CombinedInputs};
use crate::crypto::spec::KeyPairSpec;
use crate::error::{BackendError, BackendResult};
use p256::elliptic_curve::group::Curve as _;
use p256::elliptic_curve::point::AffineCoordinates;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::elliptic_curve::{Group, PrimeField};
use p256::{FieldBytes, Scalar, SecretKey};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

const X25519_KEY_LEN: usize = 32;

// ============================================================================
// P-256
// ============================================================================

fn p256_secret(private: &PrivateKey) -> BackendResult<SecretKey> {
    SecretKey::from_slice(private.expose_secret())
        .map_err(|_| BackendError::InvalidPrivateKey("Malformed P-256 private key".to_string()))
}

fn p256_public(public: &PublicKey) -> BackendResult<p256::PublicKey> {
    p256::PublicKey::from_sec1_bytes(public.as_bytes())
        .map_err(|_| BackendError::InvalidPublicKey("Point is not on P-256".to_string()))
}

fn p256_encode(public: &p256::PublicKey) -> PublicKey {
    PublicKey::from_bytes(public.to_encoded_point(false).as_bytes().to_vec())
}

pub(super) fn p256_generate(spec: &KeyPairSpec) -> BackendResult<KeyPair> {
    let secret = SecretKey::random(&mut OsRng);
    let public = p256_encode(&secret.public_key());
    let private = PrivateKey::from_bytes(secret.to_bytes().to_vec());
    Ok(KeyPair::new(spec.clone(), public, private))
}

pub(super) fn p256_check(pair: &KeyPair) -> BackendResult<()> {
    let public = p256_public(pair.public())?;
    if let Some(private) = pair.private() {
        let secret = p256_secret(private)?;
        if secret.public_key() != public {
            return Err(BackendError::InvalidPrivateKey(
                "P-256 private key does not match public key".to_string(),
            ));
        }
    }
    Ok(())
}

pub(super) fn p256_agree(local: &PrivateKey, peer: &PublicKey) -> BackendResult<Zeroizing<Vec<u8>>> {
    let secret = p256_secret(local)?;
    let peer = p256_public(peer)?;
    let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
}

/// Associate value (SP 800-56A 5.7.2.3): младшие 128 бит x-координаты плюс 2^128
fn associate_value(point: &p256::PublicKey) -> BackendResult<Scalar> {
    let x = point.as_affine().x();
    let mut repr = FieldBytes::default();
    repr[15] = 1;
    repr[16..].copy_from_slice(&x[16..]);
    Option::<Scalar>::from(Scalar::from_repr(repr))
        .ok_or_else(|| BackendError::Agreement("Associate value out of range".to_string()))
}

/// ECC MQV: P = s·(E_peer + avf(E_peer)·S_peer), s = e + avf(E_local)·d
fn p256_mqv(inputs: &CombinedInputs<'_>) -> BackendResult<Zeroizing<Vec<u8>>> {
    let static_private = inputs.local_static.private().ok_or_else(|| {
        BackendError::InvalidPrivateKey("MQV needs the local static private key".to_string())
    })?;
    let ephemeral_private = inputs.local_ephemeral.private().ok_or_else(|| {
        BackendError::InvalidPrivateKey("MQV needs the local ephemeral private key".to_string())
    })?;

    let d = p256_secret(static_private)?;
    let e = p256_secret(ephemeral_private)?;
    let local_ephemeral = e.public_key();
    let peer_static = p256_public(inputs.peer_static)?;
    let peer_ephemeral = p256_public(inputs.peer_ephemeral)?;

    let mut implicit = *e.to_nonzero_scalar() + associate_value(&local_ephemeral)? * *d.to_nonzero_scalar();
    let peer_point = peer_ephemeral.to_projective()
        + peer_static.to_projective() * associate_value(&peer_ephemeral)?;
    let shared = peer_point * implicit;
    implicit.zeroize();

    if bool::from(shared.is_identity()) {
        return Err(BackendError::Agreement("MQV produced the point at infinity".to_string()));
    }

    Ok(Zeroizing::new(shared.to_affine().x().to_vec()))
}

pub(super) fn p256_combined(combination: Combination, inputs: CombinedInputs<'_>) -> BackendResult<Zeroizing<Vec<u8>>> {
    match combination {
        Combination::Unified => unified(inputs, p256_agree),
        Combination::Mqv => p256_mqv(&inputs),
    }
}

// ============================================================================
// X25519
// ============================================================================

fn x25519_secret(private: &PrivateKey) -> BackendResult<StaticSecret> {
    let bytes: [u8; X25519_KEY_LEN] = private
        .expose_secret()
        .try_into()
        .map_err(|_| BackendError::InvalidPrivateKey("Invalid X25519 private key length".to_string()))?;
    Ok(StaticSecret::from(bytes))
}

fn x25519_public(public: &PublicKey) -> BackendResult<X25519PublicKey> {
    let bytes: [u8; X25519_KEY_LEN] = public
        .as_bytes()
        .try_into()
        .map_err(|_| BackendError::InvalidPublicKey("Invalid X25519 public key length".to_string()))?;
    Ok(X25519PublicKey::from(bytes))
}

pub(super) fn x25519_generate(spec: &KeyPairSpec) -> BackendResult<KeyPair> {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = X25519PublicKey::from(&secret);
    Ok(KeyPair::new(
        spec.clone(),
        PublicKey::from_bytes(public.to_bytes().to_vec()),
        PrivateKey::from_bytes(secret.to_bytes().to_vec()),
    ))
}

pub(super) fn x25519_check(pair: &KeyPair) -> BackendResult<()> {
    let public = x25519_public(pair.public())?;
    if let Some(private) = pair.private() {
        let secret = x25519_secret(private)?;
        if X25519PublicKey::from(&secret) != public {
            return Err(BackendError::InvalidPrivateKey(
                "X25519 private key does not match public key".to_string(),
            ));
        }
    }
    Ok(())
}

pub(super) fn x25519_agree(local: &PrivateKey, peer: &PublicKey) -> BackendResult<Zeroizing<Vec<u8>>> {
    let secret = x25519_secret(local)?;
    let peer = x25519_public(peer)?;
    let shared = secret.diffie_hellman(&peer);
    // Точки малого порядка дают нулевой секрет
    if !shared.was_contributory() {
        return Err(BackendError::InvalidPublicKey(
            "X25519 public key has small order".to_string(),
        ));
    }
    Ok(Zeroizing::new(shared.as_bytes().to_vec()))
}

pub(super) fn x25519_combined(combination: Combination, inputs: CombinedInputs<'_>) -> BackendResult<Zeroizing<Vec<u8>>> {
    match combination {
        Combination::Unified => unified(inputs, x25519_agree),
        Combination::Mqv => Err(BackendError::Unsupported("MQV over X25519".to_string())),
    }
}

// ============================================================================
// Unified (DHU)
// ============================================================================

/// Z = Ze || Zs (SP 800-56A dhHybrid1 / Full Unified)
pub(crate) fn unified<F>(inputs: CombinedInputs<'_>, agree: F) -> BackendResult<Zeroizing<Vec<u8>>>
where
    F: Fn(&PrivateKey, &PublicKey) -> BackendResult<Zeroizing<Vec<u8>>>,
{
    let ephemeral_private = inputs.local_ephemeral.private().ok_or_else(|| {
        BackendError::InvalidPrivateKey("Unified needs the local ephemeral private key".to_string())
    })?;
    let static_private = inputs.local_static.private().ok_or_else(|| {
        BackendError::InvalidPrivateKey("Unified needs the local static private key".to_string())
    })?;

    let ze = agree(ephemeral_private, inputs.peer_ephemeral)?;
    let zs = agree(static_private, inputs.peer_static)?;

    let mut z = Zeroizing::new(Vec::with_capacity(ze.len() + zs.len()));
    z.extend_from_slice(&ze);
    z.extend_from_slice(&zs);
    Ok(z)
}
