//! BrewLink Handshake - version handshake over a line-oriented link
//!
//! This crate drives the exchange that identifies a controller:
//! - Transport trait and the tokio-serial implementation
//! - The bounded-retry version handshake returning a parsed descriptor

pub mod handshake;
pub mod transport;

pub use handshake::{
    request_version, request_version_with, HandshakeConfig, HandshakeError, HandshakeReport,
    DEFAULT_BACKOFF, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, VERSION_MARKER, VERSION_REQUEST,
};
pub use transport::{SerialTransport, Transport, TransportError, DEFAULT_BAUD};
