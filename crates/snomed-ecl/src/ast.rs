//! ECL abstract syntax tree.
//!
//! Node names mirror the ECL v2.1 grammar's own production names so the
//! parser and this module read the same way the grammar document does.

use crate::queryable::SctId;

/// The top-level parsed query: one expression constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionConstraint(pub SubExpressionConstraint);

/// A sub-expression constraint: a simple constraint, optionally wrapped in
/// a compound (AND/OR/MINUS) or dotted (`.`) combination.
#[derive(Debug, Clone, PartialEq)]
pub enum SubExpressionConstraint {
    /// A single constraint with no combinator.
    Simple(Box<SimpleExpressionConstraint>),
    /// A refined constraint: `<focus> : <refinement>`.
    Refined(RefinedExpressionConstraint),
    /// A compound constraint: `A AND B`, `A OR B`, `A MINUS B`.
    Compound(CompoundExpressionConstraint),
    /// A dotted constraint: `<focus> . <attributeName>`, meaning "the set
    /// of values of attributeName across every concept matched by focus".
    Dotted(DottedExpressionConstraint),
}

/// `<focus-concept> . <attribute>` — projects through an attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct DottedExpressionConstraint {
    /// The constraint selecting the source concepts.
    pub focus: Box<SubExpressionConstraint>,
    /// The attribute type concept projected through.
    pub attribute: ConceptReference,
}

/// The boolean combinator used by a [`CompoundExpressionConstraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOperator {
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `MINUS`
    Minus,
}

/// `A <op> B [<op> C ...]` — a left-associative chain of constraints
/// joined by a single operator kind (ECL doesn't mix `AND`/`OR` at the
/// same nesting level without parentheses).
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundExpressionConstraint {
    /// The combinator shared by every term in `terms`.
    pub operator: CompoundOperator,
    /// The constraints being combined, left to right.
    pub terms: Vec<SubExpressionConstraint>,
}

/// A single, unrefined expression constraint: a focus (concept reference,
/// wildcard, or member-of) optionally preceded by a hierarchy operator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleExpressionConstraint {
    /// The hierarchy operator applied to `focus`, if any.
    pub operator: Option<HierarchyOperator>,
    /// The focus: a concept, wildcard, or refset membership test.
    pub focus: ExpressionFocus,
}

/// The hierarchy-traversal operators. `<` (descendant-of) and `<!`
/// (child-of) are kept as distinct variants even though the evaluator
/// currently routes both through the same non-self descendant test — see
/// [`crate::evaluator`]'s module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyOperator {
    /// `<` descendant-of.
    DescendantOf,
    /// `<<` descendant-or-self-of.
    DescendantOrSelfOf,
    /// `<!` child-of.
    ChildOf,
    /// `>` ancestor-of.
    AncestorOf,
    /// `>>` ancestor-or-self-of.
    AncestorOrSelfOf,
    /// `>!` parent-of.
    ParentOf,
}

/// What a [`SimpleExpressionConstraint`] is actually matching.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionFocus {
    /// A concrete concept reference, e.g. `73211009 |Diabetes mellitus|`.
    Concept(ConceptReference),
    /// `*`, every concept.
    Wildcard,
    /// `^refsetId`, membership in a reference set.
    MemberOf(ConceptReference),
    /// A parenthesised nested constraint.
    Nested(Box<SubExpressionConstraint>),
}

/// A concept id with an optional human-readable term (ignored for
/// matching, carried for diagnostics/round-tripping).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptReference {
    /// The concept id.
    pub id: SctId,
    /// The `|...|` term, if present.
    pub term: Option<String>,
}

/// `<focus> : <refinement>` — a focus constraint narrowed by an attribute
/// refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedExpressionConstraint {
    /// The unrefined focus constraint.
    pub focus: Box<SubExpressionConstraint>,
    /// The refinement narrowing it.
    pub refinement: Refinement,
}

/// An attribute refinement: one or more attribute sets/groups combined
/// with `AND`/`OR`, mirroring [`CompoundExpressionConstraint`]'s shape at
/// the refinement level.
#[derive(Debug, Clone, PartialEq)]
pub enum Refinement {
    /// A single attribute set (possibly grouped).
    Set(AttributeSet),
    /// Two refinements conjoined.
    And(Box<Refinement>, Box<Refinement>),
    /// Two refinements disjoined.
    Or(Box<Refinement>, Box<Refinement>),
}

/// A group of attributes inside `{...}`, with an optional cardinality on
/// how many such groups must match.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeGroup {
    /// How many matching groups are required (default: exactly one).
    pub cardinality: Option<Cardinality>,
    /// The attributes the group must contain.
    pub attributes: Vec<Attribute>,
}

/// An ungrouped or grouped set of attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeSet {
    /// Attributes with no `{...}` grouping.
    Ungrouped(Vec<Attribute>),
    /// One or more `{...}` attribute groups.
    Grouped(Vec<AttributeGroup>),
}

/// A single `name <comparison> value` attribute constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Optional per-attribute cardinality (`[0..1] attr = value`).
    pub cardinality: Option<Cardinality>,
    /// True if the attribute constraint is reversed (`R attr = value`):
    /// match concepts that are the *value* of a relationship whose source
    /// matches the focus, rather than the source of one.
    pub reversed: bool,
    /// The attribute (relationship type) constraint.
    pub name: SubExpressionConstraint,
    /// How the value must compare.
    pub comparison: AttributeComparison,
}

/// The right-hand side of an [`Attribute`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeComparison {
    /// `= <expression-constraint>` or `!= <expression-constraint>`.
    Expression {
        /// True for `!=`.
        negated: bool,
        /// The value constraint.
        value: ExpressionComparison,
    },
    /// `= #10`, `!= #10`, or a range/operator comparison against a
    /// concrete numeric value.
    Numeric(NumericComparison),
}

/// The value side of an expression-valued attribute comparison: either a
/// nested constraint or a wildcard.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionComparison {
    /// A nested sub-expression constraint.
    Constraint(Box<SubExpressionConstraint>),
    /// `*`, any value.
    Wildcard,
}

/// A concrete numeric comparison (`= #10`, `> #5`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct NumericComparison {
    /// The comparison operator.
    pub operator: NumericOperator,
    /// The literal value, as written (kept as a string so integers and
    /// decimals both round-trip exactly).
    pub value: String,
}

/// Comparison operators usable against a concrete numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOperator {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

/// `{min..max}` cardinality, reusing [`snomed_types::mrcm::Cardinality`]'s
/// parsed shape rather than redefining it — ECL's own cardinality syntax
/// is the same `min..max`/`min..*` grammar MRCM attribute cardinalities
/// use.
pub type Cardinality = snomed_types::Cardinality;
