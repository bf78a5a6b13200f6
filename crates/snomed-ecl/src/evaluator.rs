//! Reduces a parsed expression constraint to the set of matching concept
//! ids against an [`EclQueryable`] store.
//!
//! `<` (descendant-of) and `<!` (child-of) are distinct [`crate::ast`]
//! nodes but evaluate identically here — both walk the full transitive
//! closure of children, excluding the focus concept itself. Likewise
//! `>` (ancestor-of) and `>!` (parent-of) both walk the full transitive
//! closure of parents. The AST keeps the operators separate because a
//! store backed by a real child/parent distinction (rather than a
//! same-shaped adjacency walk) may want to tell them apart later; nothing
//! in this evaluator currently does.

use crate::ast::*;
use crate::queryable::{EclQueryable, SctId};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised while evaluating an otherwise-valid AST.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The constraint used a feature this evaluator doesn't implement yet,
    /// rather than a silent empty result.
    #[error("unsupported ECL feature: {0}")]
    FeatureUnsupported(String),
}

/// Evaluates `constraint` against `store`, returning the matching concept
/// ids in ascending order.
pub fn evaluate<Q: EclQueryable + ?Sized>(
    constraint: &ExpressionConstraint,
    store: &Q,
) -> Result<BTreeSet<SctId>, EvalError> {
    eval_sub_expression(&constraint.0, store)
}

fn eval_sub_expression<Q: EclQueryable + ?Sized>(
    sec: &SubExpressionConstraint,
    store: &Q,
) -> Result<BTreeSet<SctId>, EvalError> {
    match sec {
        SubExpressionConstraint::Simple(simple) => eval_simple(simple, store),
        SubExpressionConstraint::Refined(refined) => {
            let candidates = eval_sub_expression(&refined.focus, store)?;
            Ok(candidates
                .into_iter()
                .filter(|&id| matches_refinement(id, &refined.refinement, store))
                .collect())
        }
        SubExpressionConstraint::Compound(compound) => eval_compound(compound, store),
        SubExpressionConstraint::Dotted(dotted) => {
            let sources = eval_sub_expression(&dotted.focus, store)?;
            let mut result = BTreeSet::new();
            for source in sources {
                for rel in store.get_attributes(source) {
                    if rel.type_id == dotted.attribute.id {
                        result.insert(rel.destination_id);
                    }
                }
            }
            Ok(result)
        }
    }
}

fn eval_compound<Q: EclQueryable + ?Sized>(
    compound: &CompoundExpressionConstraint,
    store: &Q,
) -> Result<BTreeSet<SctId>, EvalError> {
    let mut terms = compound.terms.iter();
    let first = terms
        .next()
        .ok_or_else(|| EvalError::FeatureUnsupported("empty compound constraint".into()))?;
    let mut acc = eval_sub_expression(first, store)?;
    for term in terms {
        let next = eval_sub_expression(term, store)?;
        acc = match compound.operator {
            CompoundOperator::And => acc.intersection(&next).copied().collect(),
            CompoundOperator::Or => acc.union(&next).copied().collect(),
            CompoundOperator::Minus => acc.difference(&next).copied().collect(),
        };
    }
    Ok(acc)
}

fn eval_simple<Q: EclQueryable + ?Sized>(
    simple: &SimpleExpressionConstraint,
    store: &Q,
) -> Result<BTreeSet<SctId>, EvalError> {
    match &simple.focus {
        ExpressionFocus::Wildcard => Ok(store.all_concept_ids().collect()),
        ExpressionFocus::MemberOf(reference) => Ok(store.get_refset_members(reference.id).into_iter().collect()),
        ExpressionFocus::Nested(inner) => {
            let inner_result = eval_sub_expression(inner, store)?;
            apply_hierarchy_operator(inner_result, simple.operator, store)
        }
        ExpressionFocus::Concept(reference) => {
            let base = BTreeSet::from([reference.id]);
            apply_hierarchy_operator(base, simple.operator, store)
        }
    }
}

fn apply_hierarchy_operator<Q: EclQueryable + ?Sized>(
    focus: BTreeSet<SctId>,
    operator: Option<HierarchyOperator>,
    store: &Q,
) -> Result<BTreeSet<SctId>, EvalError> {
    let Some(operator) = operator else {
        return Ok(focus);
    };
    let mut result = BTreeSet::new();
    for id in focus {
        match operator {
            HierarchyOperator::DescendantOf | HierarchyOperator::ChildOf => {
                result.extend(transitive_closure(id, store, Direction::Down, false));
            }
            HierarchyOperator::DescendantOrSelfOf => {
                result.extend(transitive_closure(id, store, Direction::Down, true));
            }
            HierarchyOperator::AncestorOf | HierarchyOperator::ParentOf => {
                result.extend(transitive_closure(id, store, Direction::Up, false));
            }
            HierarchyOperator::AncestorOrSelfOf => {
                result.extend(transitive_closure(id, store, Direction::Up, true));
            }
        }
    }
    Ok(result)
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

fn transitive_closure<Q: EclQueryable + ?Sized>(
    start: SctId,
    store: &Q,
    direction: Direction,
    include_self: bool,
) -> BTreeSet<SctId> {
    let mut visited = BTreeSet::new();
    let mut frontier = vec![start];
    if include_self {
        visited.insert(start);
    }
    while let Some(next_id) = frontier.pop() {
        let neighbours = match direction {
            Direction::Up => store.get_parents(next_id),
            Direction::Down => store.get_children(next_id),
        };
        for n in neighbours {
            if visited.insert(n) {
                frontier.push(n);
            }
        }
    }
    visited
}

fn matches_refinement<Q: EclQueryable + ?Sized>(concept_id: SctId, refinement: &Refinement, store: &Q) -> bool {
    match refinement {
        Refinement::Set(set) => matches_attribute_set(concept_id, set, store),
        Refinement::And(a, b) => matches_refinement(concept_id, a, store) && matches_refinement(concept_id, b, store),
        Refinement::Or(a, b) => matches_refinement(concept_id, a, store) || matches_refinement(concept_id, b, store),
    }
}

fn matches_attribute_set<Q: EclQueryable + ?Sized>(concept_id: SctId, set: &AttributeSet, store: &Q) -> bool {
    match set {
        AttributeSet::Ungrouped(attrs) => attrs
            .iter()
            .all(|attr| relationships_for(concept_id, attr, store).next().is_some()),
        AttributeSet::Grouped(groups) => groups.iter().all(|group| {
            let matching_groups = count_matching_groups(concept_id, group, store);
            match &group.cardinality {
                Some(card) => card.allows(matching_groups),
                None => matching_groups >= 1,
            }
        }),
    }
}

/// Counts how many of `concept_id`'s relationship groups satisfy every
/// attribute in `group`.
fn count_matching_groups<Q: EclQueryable + ?Sized>(concept_id: SctId, group: &AttributeGroup, store: &Q) -> u32 {
    let all_groups: BTreeSet<u16> = store
        .get_attributes(concept_id)
        .into_iter()
        .map(|r| r.group)
        .filter(|&g| g != 0)
        .collect();
    all_groups
        .into_iter()
        .filter(|&role_group| {
            group
                .attributes
                .iter()
                .all(|attr| relationships_for(concept_id, attr, store).any(|r| r.group == role_group))
        })
        .count() as u32
}

/// Relationships of `concept_id` (outbound, or inbound when `attr` is
/// reversed) whose type and value satisfy `attr`.
fn relationships_for<'a, Q: EclQueryable + ?Sized>(
    concept_id: SctId,
    attr: &Attribute,
    store: &'a Q,
) -> Box<dyn Iterator<Item = crate::queryable::RelationshipInfo> + 'a> {
    let candidates = if attr.reversed {
        store.get_inbound_relationships(concept_id)
    } else {
        store.get_attributes(concept_id)
    };

    let type_ids: BTreeSet<SctId> = match &attr.name {
        SubExpressionConstraint::Simple(simple) if simple.operator.is_none() => match &simple.focus {
            ExpressionFocus::Concept(reference) => BTreeSet::from([reference.id]),
            ExpressionFocus::Wildcard => BTreeSet::new(),
            _ => BTreeSet::new(),
        },
        _ => BTreeSet::new(),
    };
    let wildcard_type = matches!(
        &attr.name,
        SubExpressionConstraint::Simple(s) if s.operator.is_none() && matches!(s.focus, ExpressionFocus::Wildcard)
    );

    let value_ids: Option<BTreeSet<SctId>> = match &attr.comparison {
        AttributeComparison::Expression {
            value: ExpressionComparison::Constraint(value_constraint),
            negated,
        } => eval_sub_expression(value_constraint, store).ok().map(|set| {
            if *negated {
                store
                    .all_concept_ids()
                    .filter(|id| !set.contains(id))
                    .collect::<BTreeSet<_>>()
            } else {
                set
            }
        }),
        AttributeComparison::Expression {
            value: ExpressionComparison::Wildcard,
            ..
        } => None,
        AttributeComparison::Numeric(_) => Some(BTreeSet::new()),
    };

    Box::new(candidates.into_iter().filter(move |rel| {
        (wildcard_type || type_ids.contains(&rel.type_id))
            && value_ids.as_ref().is_none_or(|ids| ids.contains(&rel.destination_id))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::queryable::DescriptionInfo;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeStore {
        parents: HashMap<SctId, Vec<SctId>>,
        children: HashMap<SctId, Vec<SctId>>,
        attributes: HashMap<SctId, Vec<crate::queryable::RelationshipInfo>>,
        refsets: HashMap<SctId, Vec<SctId>>,
        concepts: std::collections::HashSet<SctId>,
    }

    impl EclQueryable for FakeStore {
        fn get_children(&self, concept_id: SctId) -> Vec<SctId> {
            self.children.get(&concept_id).cloned().unwrap_or_default()
        }
        fn get_parents(&self, concept_id: SctId) -> Vec<SctId> {
            self.parents.get(&concept_id).cloned().unwrap_or_default()
        }
        fn has_concept(&self, concept_id: SctId) -> bool {
            self.concepts.contains(&concept_id)
        }
        fn all_concept_ids(&self) -> Box<dyn Iterator<Item = SctId> + '_> {
            Box::new(self.concepts.iter().copied())
        }
        fn get_refset_members(&self, refset_id: SctId) -> Vec<SctId> {
            self.refsets.get(&refset_id).cloned().unwrap_or_default()
        }
        fn is_concept_active(&self, _concept_id: SctId) -> bool {
            true
        }
        fn get_attributes(&self, concept_id: SctId) -> Vec<crate::queryable::RelationshipInfo> {
            self.attributes.get(&concept_id).cloned().unwrap_or_default()
        }
        fn get_descriptions(&self, _concept_id: SctId) -> Vec<DescriptionInfo> {
            Vec::new()
        }
    }

    fn chain_store() -> FakeStore {
        // 138875005 (root) <- 404684003 (clinical finding) <- 73211009 (diabetes) <- 44054006 (type 2 diabetes)
        let mut parents = HashMap::new();
        let mut children = HashMap::new();
        parents.insert(404684003, vec![138875005]);
        parents.insert(73211009, vec![404684003]);
        parents.insert(44054006, vec![73211009]);
        children.insert(138875005, vec![404684003]);
        children.insert(404684003, vec![73211009]);
        children.insert(73211009, vec![44054006]);
        let concepts = [138875005u64, 404684003, 73211009, 44054006].into_iter().collect();
        FakeStore {
            parents,
            children,
            concepts,
            ..Default::default()
        }
    }

    #[test]
    fn bare_concept_matches_only_itself() {
        let ast = parse("73211009").unwrap();
        let result = evaluate(&ast, &chain_store()).unwrap();
        assert_eq!(result, BTreeSet::from([73211009]));
    }

    #[test]
    fn descendant_of_excludes_self() {
        let ast = parse("< 404684003").unwrap();
        let result = evaluate(&ast, &chain_store()).unwrap();
        assert_eq!(result, BTreeSet::from([73211009, 44054006]));
    }

    #[test]
    fn descendant_or_self_of_includes_self() {
        let ast = parse("<< 404684003").unwrap();
        let result = evaluate(&ast, &chain_store()).unwrap();
        assert_eq!(result, BTreeSet::from([404684003, 73211009, 44054006]));
    }

    #[test]
    fn child_of_matches_descendant_of() {
        let a = evaluate(&parse("< 404684003").unwrap(), &chain_store()).unwrap();
        let b = evaluate(&parse("<! 404684003").unwrap(), &chain_store()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wildcard_matches_every_concept() {
        let ast = parse("*").unwrap();
        let result = evaluate(&ast, &chain_store()).unwrap();
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn compound_and_intersects() {
        let ast = parse("< 404684003 AND < 73211009").unwrap();
        let result = evaluate(&ast, &chain_store()).unwrap();
        assert_eq!(result, BTreeSet::from([44054006]));
    }

    #[test]
    fn compound_minus_subtracts() {
        let ast = parse("< 404684003 MINUS < 73211009").unwrap();
        let result = evaluate(&ast, &chain_store()).unwrap();
        assert_eq!(result, BTreeSet::from([73211009]));
    }

    #[test]
    fn refinement_filters_by_attribute() {
        let mut store = chain_store();
        store.attributes.insert(
            44054006,
            vec![crate::queryable::RelationshipInfo {
                type_id: 363698007,
                destination_id: 113257007,
                group: 1,
            }],
        );
        let ast = parse("< 73211009 : 363698007 = 113257007").unwrap();
        let result = evaluate(&ast, &store).unwrap();
        assert_eq!(result, BTreeSet::from([44054006]));
    }

    #[test]
    fn member_of_returns_refset_members() {
        let mut store = chain_store();
        store.refsets.insert(900000000000509007, vec![73211009]);
        let ast = parse("^ 900000000000509007").unwrap();
        let result = evaluate(&ast, &store).unwrap();
        assert_eq!(result, BTreeSet::from([73211009]));
    }
}
