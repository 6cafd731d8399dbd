//! Câmara dos Deputados adapter: XML mapping and HTTP client.

pub mod client;
pub mod xml;

pub use client::CamaraClient;
pub use xml::{bill_from_xml, bills_from_xml};
