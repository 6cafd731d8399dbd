//! Application use cases. Orchestrate domain logic via ports.

pub mod bill_service;
pub mod user_service;

pub use bill_service::{BillService, ImportStats};
pub use user_service::{SiteSettings, UserService};
