//! Report exports (CSV).

pub mod csv_export;

pub use csv_export::{bills_to_csv, user_matches_to_csv};
