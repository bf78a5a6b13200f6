//! Semantic validation of a parsed expression constraint against a
//! terminology store: concept existence and attribute-type plausibility.
//! Syntax is already guaranteed valid by the time an [`crate::ast`] tree
//! exists; this pass catches the things only the data can answer.

use crate::ast::*;
use crate::queryable::{EclQueryable, SctId};

/// The root concept of the concept model attribute hierarchy. Attribute
/// names in a refinement are expected to descend from this.
pub const CONCEPT_MODEL_ATTRIBUTE: SctId = 410662002;

/// A single semantic problem found in an otherwise syntactically valid
/// expression constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A referenced concept doesn't exist in the store at all.
    UnknownConcept {
        /// The missing concept id.
        id: SctId,
    },
    /// A referenced concept exists but isn't active.
    InactiveConcept {
        /// The inactive concept id.
        id: SctId,
    },
    /// An attribute name isn't a descendant of the concept model attribute
    /// hierarchy, so it can't be a valid relationship type.
    AttributeNotAConceptModelAttribute {
        /// The offending attribute type id.
        id: SctId,
    },
    /// An attribute is used to refine a focus concept outside any of the
    /// domains its MRCM Attribute Domain records bind it to.
    AttributeNotValidForDomain {
        /// The attribute (relationship type) concept.
        attribute: SctId,
        /// The focus concept the attribute refined.
        focus: SctId,
    },
}

/// Walks `constraint` and collects every [`ValidationIssue`] it can find.
/// An empty result means the constraint is semantically sound against
/// `store` as far as this pass can tell.
pub fn validate<Q: EclQueryable + ?Sized>(
    constraint: &ExpressionConstraint,
    store: &Q,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_sub_expression(&constraint.0, store, &mut issues);
    issues
}

fn check_concept_reference<Q: EclQueryable + ?Sized>(
    reference: &ConceptReference,
    store: &Q,
    issues: &mut Vec<ValidationIssue>,
) {
    if !store.has_concept(reference.id) {
        issues.push(ValidationIssue::UnknownConcept { id: reference.id });
    } else if !store.is_concept_active(reference.id) {
        issues.push(ValidationIssue::InactiveConcept { id: reference.id });
    }
}

fn check_sub_expression<Q: EclQueryable + ?Sized>(
    sec: &SubExpressionConstraint,
    store: &Q,
    issues: &mut Vec<ValidationIssue>,
) {
    match sec {
        SubExpressionConstraint::Simple(simple) => check_focus(&simple.focus, store, issues),
        SubExpressionConstraint::Refined(refined) => {
            check_sub_expression(&refined.focus, store, issues);
            let focus_id = single_concept_id(&refined.focus);
            check_refinement(&refined.refinement, store, issues, focus_id);
        }
        SubExpressionConstraint::Compound(compound) => {
            for term in &compound.terms {
                check_sub_expression(term, store, issues);
            }
        }
        SubExpressionConstraint::Dotted(dotted) => {
            check_sub_expression(&dotted.focus, store, issues);
            check_concept_reference(&dotted.attribute, store, issues);
        }
    }
}

fn check_focus<Q: EclQueryable + ?Sized>(
    focus: &ExpressionFocus,
    store: &Q,
    issues: &mut Vec<ValidationIssue>,
) {
    match focus {
        ExpressionFocus::Concept(reference) => check_concept_reference(reference, store, issues),
        ExpressionFocus::MemberOf(reference) => check_concept_reference(reference, store, issues),
        ExpressionFocus::Wildcard => {}
        ExpressionFocus::Nested(inner) => check_sub_expression(inner, store, issues),
    }
}

fn check_refinement<Q: EclQueryable + ?Sized>(
    refinement: &Refinement,
    store: &Q,
    issues: &mut Vec<ValidationIssue>,
    focus: Option<SctId>,
) {
    match refinement {
        Refinement::Set(set) => check_attribute_set(set, store, issues, focus),
        Refinement::And(a, b) | Refinement::Or(a, b) => {
            check_refinement(a, store, issues, focus);
            check_refinement(b, store, issues, focus);
        }
    }
}

fn check_attribute_set<Q: EclQueryable + ?Sized>(
    set: &AttributeSet,
    store: &Q,
    issues: &mut Vec<ValidationIssue>,
    focus: Option<SctId>,
) {
    match set {
        AttributeSet::Ungrouped(attrs) => {
            for attr in attrs {
                check_attribute(attr, store, issues, focus);
            }
        }
        AttributeSet::Grouped(groups) => {
            for group in groups {
                for attr in &group.attributes {
                    check_attribute(attr, store, issues, focus);
                }
            }
        }
    }
}

fn check_attribute<Q: EclQueryable + ?Sized>(
    attr: &Attribute,
    store: &Q,
    issues: &mut Vec<ValidationIssue>,
    focus: Option<SctId>,
) {
    check_sub_expression(&attr.name, store, issues);
    if let SubExpressionConstraint::Simple(simple) = &attr.name {
        if let ExpressionFocus::Concept(reference) = &simple.focus {
            if store.has_concept(reference.id) && !is_concept_model_attribute(reference.id, store) {
                issues.push(ValidationIssue::AttributeNotAConceptModelAttribute { id: reference.id });
            }
            if let Some(focus_id) = focus {
                check_attribute_domain(reference.id, focus_id, store, issues);
            }
        }
    }
    match &attr.comparison {
        AttributeComparison::Expression {
            value: ExpressionComparison::Constraint(value),
            ..
        } => check_sub_expression(value, store, issues),
        AttributeComparison::Expression {
            value: ExpressionComparison::Wildcard,
            ..
        } => {}
        AttributeComparison::Numeric(_) => {}
    }
}

/// The concept id of `sec` when it's a bare concept reference, so domain
/// checking has a concrete focus to test; `None` for wildcards, member-of,
/// nested, and compound focuses, which don't name a single concept.
fn single_concept_id(sec: &SubExpressionConstraint) -> Option<SctId> {
    match sec {
        SubExpressionConstraint::Simple(simple) => match &simple.focus {
            ExpressionFocus::Concept(reference) => Some(reference.id),
            _ => None,
        },
        _ => None,
    }
}

/// Flags `attribute_id` when `focus_id` (or one of its ancestors) isn't
/// among the domains an active MRCM Attribute Domain record binds the
/// attribute to. A no-op when the store has no domain data for the
/// attribute at all.
fn check_attribute_domain<Q: EclQueryable + ?Sized>(
    attribute_id: SctId,
    focus_id: SctId,
    store: &Q,
    issues: &mut Vec<ValidationIssue>,
) {
    let domains = store.attribute_domains(attribute_id);
    if domains.is_empty() {
        return;
    }
    let ancestry = ancestors_including_self(focus_id, store);
    if !domains.iter().any(|d| ancestry.contains(d)) {
        issues.push(ValidationIssue::AttributeNotValidForDomain {
            attribute: attribute_id,
            focus: focus_id,
        });
    }
}

/// `id` plus every `IS_A` ancestor reachable from it, bounded to avoid
/// looping on cyclic test fixtures.
fn ancestors_including_self<Q: EclQueryable + ?Sized>(id: SctId, store: &Q) -> std::collections::HashSet<SctId> {
    let mut seen = std::collections::HashSet::new();
    seen.insert(id);
    let mut frontier = store.get_parents(id);
    let mut depth = 0;
    while !frontier.is_empty() && depth < 64 {
        let mut next = Vec::new();
        for parent in frontier {
            if seen.insert(parent) {
                next.extend(store.get_parents(parent));
            }
        }
        frontier = next;
        depth += 1;
    }
    seen
}

/// True if `id` is reachable from [`CONCEPT_MODEL_ATTRIBUTE`] by walking
/// `IS_A` parents, bounded to avoid looping on cyclic test fixtures.
fn is_concept_model_attribute<Q: EclQueryable + ?Sized>(id: SctId, store: &Q) -> bool {
    if id == CONCEPT_MODEL_ATTRIBUTE {
        return true;
    }
    let mut frontier = store.get_parents(id);
    let mut seen = std::collections::HashSet::new();
    let mut depth = 0;
    while !frontier.is_empty() && depth < 64 {
        let mut next = Vec::new();
        for parent in frontier {
            if parent == CONCEPT_MODEL_ATTRIBUTE {
                return true;
            }
            if seen.insert(parent) {
                next.extend(store.get_parents(parent));
            }
        }
        frontier = next;
        depth += 1;
    }
    false
}
