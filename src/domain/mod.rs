//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod alias;
pub mod entities;
pub mod errors;
pub mod secrets;

pub use entities::{
    Activity, ActivityKind, Bill, Media, NO_NAME, NewUser, Role, TIMESTAMP_FORMAT, User,
    UserMatch, UserStatus,
};
pub use errors::DomainError;
