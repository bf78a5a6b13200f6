#![warn(missing_docs)]
//! Relational-backed terminology providers: LOINC, RxNorm/NCI Thesaurus,
//! CPT, NDC, OMOP, and the ConceptMap store, plus the `SqlFragment`
//! query-building plumbing they all share.

pub mod conceptmap;
pub mod cpt;
pub mod loinc;
pub mod ndc;
pub mod omop;
pub mod rxnorm;
pub mod schema;

pub use conceptmap::{ConceptMapRecord, ConceptMapStore, IndexedSummary, Projection, SearchParam};
pub use cpt::CptProvider;
pub use loinc::LoincProvider;
pub use ndc::NdcProvider;
pub use omop::{OmopProvider, OmopTranslation};
pub use rxnorm::{RxNormProvider, RxVocabulary};
pub use schema::{open_request_connection, sql_err, SqlFragment};
