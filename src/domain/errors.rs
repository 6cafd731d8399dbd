//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Repository error: {0}")]
    Repo(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Another account already uses this e-mail (case-insensitive).
    #[error("E-mail already registered: {0}")]
    EmailTaken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Role transition refused. Carries the guard messages joined by ','.
    #[error("{0}")]
    InvalidRoleTransition(String),

    #[error("Câmara feed error: {0}")]
    Feed(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),
}
