//! plenario: user accounts and Câmara dos Deputados bills with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
