//! Static lookup tables

pub mod countries;

pub use countries::normalize_country;
