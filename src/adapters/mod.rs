//! Infrastructure adapters. Implement outbound ports.
//!
//! SQLite, Câmara web service, password encoding, CSV, terminal UI. Map errors to DomainError.

pub mod camara;
pub mod crypto;
pub mod export;
pub mod persistence;
pub mod ui;
