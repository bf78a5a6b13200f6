//! Expression Constraint Language (ECL) lexer, parser, validator, and
//! evaluator, decoupled from any particular terminology store through the
//! [`EclQueryable`] trait.

pub mod ast;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod queryable;
pub mod validator;

pub use evaluator::{evaluate, EvalError};
pub use parser::{parse, ParseError};
pub use queryable::{ConcreteRelationshipInfo, DescriptionInfo, EclQueryable, RelationshipInfo, SctId};
pub use validator::{validate, ValidationIssue};

use std::collections::BTreeSet;

/// Parses and evaluates `src` against `store` in one step. Returns the
/// matching concept ids; does not run [`validate`] first, matching the
/// behaviour of `filterIsA`/`filterIn`-style callers that want a result
/// even for a semantically dubious expression.
pub fn evaluate_str<Q: EclQueryable + ?Sized>(
    src: &str,
    store: &Q,
) -> Result<BTreeSet<SctId>, EclError> {
    let ast = parse(src)?;
    Ok(evaluate(&ast, store)?)
}

/// The union of everything that can go wrong turning ECL source text into
/// a result set.
#[derive(Debug, thiserror::Error)]
pub enum EclError {
    /// Lexing or parsing failed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The AST parsed but couldn't be evaluated.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeStore {
        children: HashMap<SctId, Vec<SctId>>,
        concepts: std::collections::HashSet<SctId>,
    }

    impl EclQueryable for FakeStore {
        fn get_children(&self, concept_id: SctId) -> Vec<SctId> {
            self.children.get(&concept_id).cloned().unwrap_or_default()
        }
        fn get_parents(&self, _concept_id: SctId) -> Vec<SctId> {
            Vec::new()
        }
        fn has_concept(&self, concept_id: SctId) -> bool {
            self.concepts.contains(&concept_id)
        }
        fn all_concept_ids(&self) -> Box<dyn Iterator<Item = SctId> + '_> {
            Box::new(self.concepts.iter().copied())
        }
        fn get_refset_members(&self, _refset_id: SctId) -> Vec<SctId> {
            Vec::new()
        }
        fn is_concept_active(&self, _concept_id: SctId) -> bool {
            true
        }
    }

    #[test]
    fn evaluate_str_parses_then_evaluates() {
        let mut store = FakeStore::default();
        store.children.insert(404684003, vec![73211009]);
        store.concepts.insert(404684003);
        store.concepts.insert(73211009);
        let result = evaluate_str("< 404684003", &store).unwrap();
        assert_eq!(result, BTreeSet::from([73211009]));
    }

    #[test]
    fn evaluate_str_propagates_parse_errors() {
        let store = FakeStore::default();
        assert!(matches!(evaluate_str(": bad", &store), Err(EclError::Parse(_))));
    }
}
