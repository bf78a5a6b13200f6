//! # snomed-service
//!
//! Registry bootstrap and integration harness for the terminology core:
//! reads a [`config::RegistryConfig`], loads every configured system, and
//! hands back a populated `snomed_provider::ProviderRegistry`. Not a
//! network-facing server — the transport layer this core is consumed
//! through is out of scope, same as the FHIR/HTTP framing it was
//! distilled away from.

#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;

pub use bootstrap::build_registry;
pub use config::RegistryConfig;
