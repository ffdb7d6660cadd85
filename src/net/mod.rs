//! Network helpers for the admin listener.
//!
//! TLS is optional; when `admin.tls` is set the listener is served through
//! `axum-server` with rustls instead of a plain `TcpListener`.

pub mod tls;

pub use tls::{load_tls_config, TlsError};
