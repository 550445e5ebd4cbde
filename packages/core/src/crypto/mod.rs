//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Application                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    AgreementFactory                         │
//! │  - Проверяет AgreementSpec до обращения к backend'у         │
//! │  - Выбирает вариант движка и возможность backend'а          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    AgreementEngine                          │
//! │  ANON / BASIC / SIGNED / UNIFIED / MQV / KEM / ENCAPSULATION│
//! │  Init → ClientHelloBuilt → [AwaitingConfirmation] → Derived │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                CryptoBackend (Crypto-Agility)               │
//! │  - DH / ECDH / XDH, Unified, MQV                            │
//! │  - KEM (ML-KEM) с встроенной деривацией                     │
//! │  - RNG, затирание памяти                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Модули
//!
//! ### Core Traits
//! - [`provider`]: CryptoBackend trait
//! - [`handshake`]: движок согласования и его состояния
//!
//! ### Implementations
//! - [`suites`]: StandardSuite (P-256, X25519, ML-KEM)
//! - [`factory`]: AgreementFactory
//!
//! ### Utilities
//! - [`spec`], [`keys`]: спецификации и ключевой материал
//! - [`kdf`], [`confirm`], [`wrap`]: KDF2/KDF3, key confirmation, упаковка секрета

// ============================================================================
// Core Traits
// ============================================================================

/// CryptoBackend trait для crypto-agility
pub mod provider;

/// Движок согласования ключей
pub mod handshake;

// ============================================================================
// Implementations
// ============================================================================

/// Криптографические наборы
pub mod suites;

/// Фабрика движков
pub mod factory;

// ============================================================================
// Utilities
// ============================================================================

pub mod spec;

pub mod keys;

pub mod kdf;

pub mod confirm;

pub mod wrap;

// ============================================================================
// Re-exports для удобства
// ============================================================================

pub use factory::AgreementFactory;
pub use handshake::{AgreementEngine, HandshakeState, Role, SharedSecret};
pub use provider::CryptoBackend;
