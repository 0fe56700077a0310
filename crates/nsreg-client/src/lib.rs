//! nsreg client - HTTP access to a namespaced registry service.
//!
//! Wraps the five endpoints a registry instance exposes: project listing,
//! path listing, and get/set/delete of the JSON value stored at a key.

pub mod client;
pub mod error;
pub mod registry;
pub mod types;

pub use client::RegistryClient;
pub use error::*;
pub use registry::Registry;
pub use types::*;
