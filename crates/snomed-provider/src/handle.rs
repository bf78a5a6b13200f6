//! Concept handles: a tagged enum rather than a trait-object
//! hierarchy, so the contract never needs dynamic dispatch or downcasting
//! to tell which backend a resolved concept came from.

use snomed_types::SctId;

/// A concept resolved by a SNOMED-backed provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnomedHandle {
    /// The concept id.
    pub code: SctId,
}

/// A concept resolved by a relational-backed provider (LOINC, RxNorm,
/// CPT, NDC, OMOP), carrying the pre-materialised row fields those
/// schemas expose directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlRowHandle {
    /// The code as stored in the provider's schema.
    pub code: String,
    /// The preferred display text, if the row carries one.
    pub display: Option<String>,
    /// The domain/class grouping column, if the provider's schema has one.
    pub domain: Option<String>,
    /// True if the row's `active`/status column marks it current.
    pub active: bool,
}

/// A concept resolved by a grammar-only provider (URI, MIME, IETF
/// language) that has no backing row or hierarchy at all — just the
/// string the caller supplied, already validated against the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringHandle {
    /// The validated code text.
    pub code: String,
}

/// A concept handle from any backend, opaque to the caller beyond what
/// [`crate::contract::CodeSystemProvider`] exposes about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConceptHandle {
    /// Resolved against a [`snomed_loader::SnomedStore`].
    Snomed(SnomedHandle),
    /// Resolved against a relational provider's schema.
    SqlRow(SqlRowHandle),
    /// Resolved against a pure-grammar provider.
    StringLiteral(StringHandle),
}

impl ConceptHandle {
    /// The code string this handle resolves to, regardless of backend.
    pub fn code(&self) -> String {
        match self {
            ConceptHandle::Snomed(h) => h.code.to_string(),
            ConceptHandle::SqlRow(h) => h.code.clone(),
            ConceptHandle::StringLiteral(h) => h.code.clone(),
        }
    }
}

/// The result of [`crate::contract::CodeSystemProvider::locate`]: either a
/// resolved handle, or a human-readable reason the code didn't resolve.
/// `locate` never throws — an unknown code is this `Err` arm, not a
/// panic or a `Result::Err` at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateResult {
    /// The resolved handle, or `None` if the code is unknown.
    pub context: Option<ConceptHandle>,
    /// A message explaining the outcome (empty on success).
    pub message: String,
}

impl LocateResult {
    /// Builds a successful locate result.
    pub fn found(context: ConceptHandle) -> Self {
        Self {
            context: Some(context),
            message: String::new(),
        }
    }

    /// Builds a not-found locate result with an explanatory message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            context: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_reads_through_every_handle_kind() {
        assert_eq!(ConceptHandle::Snomed(SnomedHandle { code: 73211009 }).code(), "73211009");
        assert_eq!(
            ConceptHandle::SqlRow(SqlRowHandle {
                code: "4548-4".into(),
                display: None,
                domain: None,
                active: true,
            })
            .code(),
            "4548-4"
        );
    }

    #[test]
    fn not_found_carries_no_context() {
        let result = LocateResult::not_found("no such code");
        assert!(result.context.is_none());
        assert_eq!(result.message, "no such code");
    }
}
