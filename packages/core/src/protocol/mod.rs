//! Handshake-сообщения, их wire-кодек и валидация входящих данных

pub mod messages;
pub mod validation;
pub mod wire;

pub use messages::{ClientConfirm, ClientHello, EncapsulatedSecret, HandshakeMessage, KeyMaterial, ServerHello};
pub use wire::{pack_message, unpack_message};
