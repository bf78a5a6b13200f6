#![warn(missing_docs)]
//! Small in-memory and grammar-only code system providers: URI, MIME,
//! IETF language (BCP-47), US states/territories, and the remote
//! HGVS validator.

pub mod hgvs;
pub mod ietf_language;
pub mod mime;
pub mod uri;
pub mod us_states;

pub use hgvs::HgvsProvider;
pub use ietf_language::{parse as parse_language_tag, IetfLanguageProvider, LanguageTag};
pub use mime::MimeProvider;
pub use uri::UriProvider;
pub use us_states::UsStatesProvider;
