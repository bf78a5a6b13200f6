//! # snomed-provider
//!
//! The terminology provider contract: the operation set every code system
//! backend (SNOMED, a relational vocabulary, a pure-grammar system)
//! implements identically, plus the pieces shared across backends — the
//! filter lifecycle state machine, the factory registry that resolves a
//! `(system, version)` request to a concrete provider, the request
//! parameter model, and the per-request operation context.

#![warn(missing_docs)]

pub mod contract;
pub mod context;
pub mod filter;
pub mod handle;
pub mod params;
pub mod registry;
pub mod snomed;

pub use contract::{CodeSystemProvider, ConceptProperty, ConceptStatus, FilterPage};
pub use context::OperationContext;
pub use filter::{unsupported_filter, FilterDescriptor, FilterExecutionContext, FilterState, DEFAULT_PAGE_SIZE};
pub use handle::{ConceptHandle, LocateResult, SnomedHandle, SqlRowHandle, StringHandle};
pub use params::{ExpansionFlags, Pagination, RequestParams, VersionRule, VersionRuleMode};
pub use registry::{ProviderFactory, ProviderRegistry};
