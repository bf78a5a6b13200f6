//! Post-coordinated expression parsing, canonicalisation, normal-form
//! expansion, and expression subsumption (component D).
//!
//! The grammar handled here is the compositional-grammar subset actually
//! needed by the terminology operations: `focus (+ focus)* [: refinement]`
//! where a refinement is a comma-separated attribute list, optionally
//! grouped with `{...}`. It deliberately mirrors the token shapes
//! `snomed-ecl`'s lexer uses (digit runs, `|term|`) rather than inventing
//! a second syntax for the same underlying ids.

use std::collections::HashSet;

use snomed_types::{
    Attribute, AttributeGroup, AttributeValue, Expression, ExpressionDefinitionStatus, ExpressionFocusConcept, SctId,
};
use thiserror::Error;

use crate::SnomedStore;

/// Errors raised while parsing or validating a post-coordinated
/// expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// A character outside the expression grammar was encountered.
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Byte offset of the character.
        offset: usize,
    },
    /// A `|...|` term was never closed.
    #[error("unterminated term starting at offset {offset}")]
    UnterminatedTerm {
        /// Byte offset where the term began.
        offset: usize,
    },
    /// A token appeared where the grammar didn't expect it.
    #[error("unexpected token at offset {offset}: expected {expected}")]
    UnexpectedToken {
        /// Byte offset of the offending token.
        offset: usize,
        /// What the grammar allowed at this point.
        expected: &'static str,
    },
    /// A digit run didn't parse as a valid SCTID.
    #[error("invalid concept id {text:?} at offset {offset}")]
    InvalidConceptId {
        /// The raw digit run.
        text: String,
        /// Byte offset it started at.
        offset: usize,
    },
    /// The expression had no focus concepts at all.
    #[error("expression has no focus concepts")]
    EmptyExpression,
    /// A concept referenced by the expression doesn't exist in the store.
    #[error("unknown concept {0}")]
    UnknownConcept(SctId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    DigitRun(String),
    Term(String),
    /// `#` concrete-value literal, digits carried as written (sign and
    /// decimal point included).
    Decimal(String),
    /// `"..."` concrete string literal.
    QuotedString(String),
    Plus,
    Colon,
    Comma,
    Eq,
    /// `===`, the leading equivalence marker.
    EqEqEq,
    /// `<<<`, the leading subtype marker.
    LtLtLt,
    LBrace,
    RBrace,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Spanned {
    token: Token,
    offset: usize,
}

fn lex(src: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut out = Vec::new();
    while i < chars.len() {
        let start = i;
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let (token, advance) = match c {
            '+' => (Token::Plus, 1),
            ':' => (Token::Colon, 1),
            ',' => (Token::Comma, 1),
            '=' => {
                if chars.get(i + 1) == Some(&'=') && chars.get(i + 2) == Some(&'=') {
                    (Token::EqEqEq, 3)
                } else {
                    (Token::Eq, 1)
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'<') && chars.get(i + 2) == Some(&'<') {
                    (Token::LtLtLt, 3)
                } else {
                    return Err(ExpressionError::UnexpectedChar { ch: c, offset: start });
                }
            }
            '{' => (Token::LBrace, 1),
            '}' => (Token::RBrace, 1),
            '#' => {
                let mut j = i + 1;
                let mut s = String::new();
                if matches!(chars.get(j), Some('+') | Some('-')) {
                    s.push(chars[j]);
                    j += 1;
                }
                let mut saw_digit = false;
                while let Some(&ch) = chars.get(j) {
                    if ch.is_ascii_digit() || ch == '.' {
                        saw_digit |= ch.is_ascii_digit();
                        s.push(ch);
                        j += 1;
                    } else {
                        break;
                    }
                }
                if !saw_digit {
                    return Err(ExpressionError::UnexpectedChar { ch: '#', offset: start });
                }
                (Token::Decimal(s), j - i)
            }
            '"' => {
                let mut j = i + 1;
                let mut s = String::new();
                loop {
                    match chars.get(j) {
                        Some('"') => break,
                        Some(&ch) => {
                            s.push(ch);
                            j += 1;
                        }
                        None => return Err(ExpressionError::UnterminatedTerm { offset: start }),
                    }
                }
                (Token::QuotedString(s), j + 1 - i)
            }
            '|' => {
                let mut j = i + 1;
                let mut s = String::new();
                loop {
                    match chars.get(j) {
                        Some('|') => break,
                        Some(&ch) => {
                            s.push(ch);
                            j += 1;
                        }
                        None => return Err(ExpressionError::UnterminatedTerm { offset: start }),
                    }
                }
                (Token::Term(s), j + 1 - i)
            }
            d if d.is_ascii_digit() => {
                let mut j = i;
                let mut s = String::new();
                while let Some(&ch) = chars.get(j) {
                    if ch.is_ascii_digit() {
                        s.push(ch);
                        j += 1;
                    } else {
                        break;
                    }
                }
                (Token::DigitRun(s), j - i)
            }
            other => return Err(ExpressionError::UnexpectedChar { ch: other, offset: start }),
        };
        out.push(Spanned { token, offset: start });
        i += advance;
    }
    out.push(Spanned {
        token: Token::Eof,
        offset: chars.len(),
    });
    Ok(out)
}

/// Parses and validates post-coordinated expressions against a loaded
/// store. Stateless: construction carries no data, it just groups the
/// related operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionParser;

impl ExpressionParser {
    /// Parses `text` into an [`Expression`]. Does not check that the
    /// referenced concepts exist; call [`ExpressionParser::validate`] for
    /// that.
    pub fn parse(text: &str) -> Result<Expression, ExpressionError> {
        let tokens = lex(text)?;
        let mut p = Cursor { tokens, pos: 0 };
        let expr = p.parse_expression()?;
        p.expect(Token::Eof, "end of expression")?;
        if expr.focus_concepts.is_empty() {
            return Err(ExpressionError::EmptyExpression);
        }
        Ok(expr)
    }

    /// Checks that every concept id referenced anywhere in `expr` exists
    /// in `store`.
    pub fn validate(expr: &Expression, store: &SnomedStore) -> Result<(), ExpressionError> {
        for focus in &expr.focus_concepts {
            check_concept(focus.id, store)?;
        }
        for attr in expr.ungrouped_attributes.iter().chain(expr.groups.iter().flat_map(|g| g.attributes.iter())) {
            check_attribute(attr, store)?;
        }
        Ok(())
    }

    /// Produces the canonical form: focus concepts and attributes sorted
    /// into a deterministic order, so two expressions that differ only in
    /// writing order compare equal.
    pub fn canonicalize(expr: &Expression) -> Expression {
        let mut focus_concepts = expr.focus_concepts.clone();
        focus_concepts.sort_by_key(|c| c.id);
        focus_concepts.dedup_by_key(|c| c.id);

        let mut ungrouped_attributes = expr.ungrouped_attributes.clone();
        ungrouped_attributes.sort_by(attribute_order);

        let mut groups: Vec<AttributeGroup> = expr
            .groups
            .iter()
            .map(|g| {
                let mut attrs = g.attributes.clone();
                attrs.sort_by(attribute_order);
                AttributeGroup { attributes: attrs }
            })
            .collect();
        groups.sort_by(|a, b| format!("{a:?}").cmp(&format!("{b:?}")));

        Expression {
            focus_concepts,
            ungrouped_attributes,
            groups,
            definition_status: expr.definition_status,
        }
    }

    /// Expands `expr` into normal form: each focus concept's own
    /// (non-`IS_A`) defining relationships are merged in as additional
    /// ungrouped attributes, and focus concepts are replaced by their
    /// proximal primitive parents when the focus itself is fully defined
    /// (has no primitive ancestor of its own already in the focus set).
    /// The result is canonicalised.
    pub fn normal_form(expr: &Expression, store: &SnomedStore) -> Expression {
        const IS_A: SctId = 116680003;

        let mut focus_concepts = Vec::new();
        let mut inherited_attributes = Vec::new();

        for focus in &expr.focus_concepts {
            if store.has_concept(focus.id) && !store.get_parents(focus.id).is_empty() {
                for parent in store.get_parents(focus.id) {
                    focus_concepts.push(ExpressionFocusConcept::new(parent));
                }
            } else {
                focus_concepts.push(focus.clone());
            }

            if let Some(rels) = store.get_outgoing_relationships(focus.id) {
                for rel in rels.iter().filter(|r| r.active && r.type_id != IS_A) {
                    inherited_attributes.push(Attribute {
                        name: ExpressionFocusConcept::new(rel.type_id),
                        value: AttributeValue::Concept(ExpressionFocusConcept::new(rel.destination_id)),
                    });
                }
            }
        }

        if focus_concepts.is_empty() {
            focus_concepts = expr.focus_concepts.clone();
        }

        let mut ungrouped_attributes = expr.ungrouped_attributes.clone();
        ungrouped_attributes.extend(inherited_attributes);

        Self::canonicalize(&Expression {
            focus_concepts,
            ungrouped_attributes,
            groups: expr.groups.clone(),
            definition_status: expr.definition_status,
        })
    }

    /// True if `sub` is subsumed by `sup`: every focus concept of `sup`
    /// has at least one of `sub`'s focus concepts as itself or a
    /// descendant, and every attribute of `sup` is matched by an
    /// attribute of `sub` with the same type whose value is itself or a
    /// descendant of `sup`'s value.
    pub fn is_subsumed_by(sub: &Expression, sup: &Expression, store: &SnomedStore) -> bool {
        let sub_ancestry = |id: SctId| -> HashSet<SctId> {
            let mut seen = HashSet::new();
            let mut frontier = vec![id];
            seen.insert(id);
            while let Some(next) = frontier.pop() {
                for parent in store.get_parents(next) {
                    if seen.insert(parent) {
                        frontier.push(parent);
                    }
                }
            }
            seen
        };

        for sup_focus in &sup.focus_concepts {
            let covered = sub
                .focus_concepts
                .iter()
                .any(|sub_focus| sub_ancestry(sub_focus.id).contains(&sup_focus.id));
            if !covered {
                return false;
            }
        }

        let sub_attrs: Vec<&Attribute> = sub
            .ungrouped_attributes
            .iter()
            .chain(sub.groups.iter().flat_map(|g| g.attributes.iter()))
            .collect();
        let sup_attrs = sup.ungrouped_attributes.iter().chain(sup.groups.iter().flat_map(|g| g.attributes.iter()));

        for sup_attr in sup_attrs {
            let AttributeValue::Concept(sup_value) = &sup_attr.value else {
                continue;
            };
            let matched = sub_attrs.iter().any(|sub_attr| {
                if sub_attr.name.id != sup_attr.name.id {
                    return false;
                }
                match &sub_attr.value {
                    AttributeValue::Concept(sub_value) => sub_ancestry(sub_value.id).contains(&sup_value.id),
                    _ => false,
                }
            });
            if !matched {
                return false;
            }
        }

        true
    }
}

fn attribute_order(a: &Attribute, b: &Attribute) -> std::cmp::Ordering {
    a.name.id.cmp(&b.name.id).then_with(|| format!("{:?}", a.value).cmp(&format!("{:?}", b.value)))
}

fn check_concept(id: SctId, store: &SnomedStore) -> Result<(), ExpressionError> {
    if store.has_concept(id) {
        Ok(())
    } else {
        Err(ExpressionError::UnknownConcept(id))
    }
}

fn check_attribute(attr: &Attribute, store: &SnomedStore) -> Result<(), ExpressionError> {
    check_concept(attr.name.id, store)?;
    match &attr.value {
        AttributeValue::Concept(c) => check_concept(c.id, store),
        AttributeValue::Nested(expr) => ExpressionParser::validate(expr, store),
        AttributeValue::Concrete(_) => Ok(()),
    }
}

struct Cursor {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Cursor {
    fn peek(&self) -> &Spanned {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Spanned {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<Spanned, ExpressionError> {
        if self.peek().token == token {
            Ok(self.advance())
        } else {
            Err(ExpressionError::UnexpectedToken {
                offset: self.peek().offset,
                expected,
            })
        }
    }

    fn parse_expression(&mut self) -> Result<Expression, ExpressionError> {
        let definition_status = match self.peek().token {
            Token::EqEqEq => {
                self.advance();
                ExpressionDefinitionStatus::EquivalentTo
            }
            Token::LtLtLt => {
                self.advance();
                ExpressionDefinitionStatus::SubtypeOf
            }
            _ => ExpressionDefinitionStatus::SubtypeOf,
        };

        let mut focus_concepts = vec![self.parse_focus_concept()?];
        while self.peek().token == Token::Plus {
            self.advance();
            focus_concepts.push(self.parse_focus_concept()?);
        }

        let mut ungrouped_attributes = Vec::new();
        let mut groups = Vec::new();
        if self.peek().token == Token::Colon {
            self.advance();
            self.parse_refinement(&mut ungrouped_attributes, &mut groups)?;
        }

        Ok(Expression {
            focus_concepts,
            ungrouped_attributes,
            groups,
            definition_status,
        })
    }

    fn parse_focus_concept(&mut self) -> Result<ExpressionFocusConcept, ExpressionError> {
        let tok = self.advance();
        let id = match tok.token {
            Token::DigitRun(d) => d.parse::<u64>().map_err(|_| ExpressionError::InvalidConceptId {
                text: d.clone(),
                offset: tok.offset,
            })?,
            _ => {
                return Err(ExpressionError::UnexpectedToken {
                    offset: tok.offset,
                    expected: "a concept id",
                })
            }
        };
        let term = if let Token::Term(text) = self.peek().token.clone() {
            self.advance();
            Some(text)
        } else {
            None
        };
        Ok(match term {
            Some(t) => ExpressionFocusConcept::with_term(id, t),
            None => ExpressionFocusConcept::new(id),
        })
    }

    fn parse_refinement(
        &mut self,
        ungrouped: &mut Vec<Attribute>,
        groups: &mut Vec<AttributeGroup>,
    ) -> Result<(), ExpressionError> {
        loop {
            if self.peek().token == Token::LBrace {
                self.advance();
                let mut attrs = vec![self.parse_attribute()?];
                while self.peek().token == Token::Comma {
                    self.advance();
                    attrs.push(self.parse_attribute()?);
                }
                self.expect(Token::RBrace, "`}` closing an attribute group")?;
                groups.push(AttributeGroup { attributes: attrs });
            } else {
                ungrouped.push(self.parse_attribute()?);
            }
            if self.peek().token == Token::Comma {
                self.advance();
                continue;
            }
            break;
        }
        Ok(())
    }

    fn parse_attribute(&mut self) -> Result<Attribute, ExpressionError> {
        let name = self.parse_focus_concept()?;
        self.expect(Token::Eq, "`=` between an attribute name and its value")?;
        let value = self.parse_attribute_value()?;
        Ok(Attribute { name, value })
    }

    fn parse_attribute_value(&mut self) -> Result<AttributeValue, ExpressionError> {
        match self.peek().token.clone() {
            Token::Decimal(s) => {
                self.advance();
                Ok(AttributeValue::Concrete(s))
            }
            Token::QuotedString(s) => {
                self.advance();
                Ok(AttributeValue::Concrete(s))
            }
            _ => Ok(AttributeValue::Concept(self.parse_focus_concept()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_focus_concept() {
        let expr = ExpressionParser::parse("73211009 |Diabetes mellitus|").unwrap();
        assert_eq!(expr.focus_concepts.len(), 1);
        assert_eq!(expr.focus_concepts[0].id, 73211009);
        assert!(expr.is_unrefined());
    }

    #[test]
    fn parses_multiple_focus_concepts() {
        let expr = ExpressionParser::parse("195967001 + 703074007").unwrap();
        assert!(expr.has_multiple_focus_concepts());
    }

    #[test]
    fn parses_a_refined_expression() {
        let expr = ExpressionParser::parse("71388002 : 260686004 = 129304002, 405813007 = 24028007").unwrap();
        assert_eq!(expr.ungrouped_attributes.len(), 2);
    }

    #[test]
    fn parses_a_grouped_attribute_set() {
        let expr = ExpressionParser::parse("71388002 : { 260686004 = 129304002 }").unwrap();
        assert_eq!(expr.groups.len(), 1);
        assert_eq!(expr.groups[0].attributes.len(), 1);
    }

    #[test]
    fn leading_equivalence_marker_sets_definition_status() {
        let expr = ExpressionParser::parse("=== 73211009").unwrap();
        assert_eq!(expr.definition_status, ExpressionDefinitionStatus::EquivalentTo);
    }

    #[test]
    fn leading_subtype_marker_and_no_marker_agree() {
        let marked = ExpressionParser::parse("<<< 73211009").unwrap();
        let bare = ExpressionParser::parse("73211009").unwrap();
        assert_eq!(marked.definition_status, ExpressionDefinitionStatus::SubtypeOf);
        assert_eq!(bare.definition_status, ExpressionDefinitionStatus::SubtypeOf);
    }

    #[test]
    fn concrete_decimal_and_string_attribute_values_parse() {
        let expr = ExpressionParser::parse("373873005 : 411116001 = #500, 105590001 = \"once daily\"").unwrap();
        assert_eq!(expr.ungrouped_attributes.len(), 2);
        assert_eq!(expr.ungrouped_attributes[0].value, AttributeValue::Concrete("500".to_string()));
        assert_eq!(expr.ungrouped_attributes[1].value, AttributeValue::Concrete("once daily".to_string()));
    }

    #[test]
    fn unterminated_quoted_string_value_is_rejected() {
        let err = ExpressionParser::parse("373873005 : 411116001 = \"unterminated").unwrap_err();
        assert!(matches!(err, ExpressionError::UnterminatedTerm { .. }));
    }

    #[test]
    fn canonicalize_sorts_focus_concepts() {
        let expr = ExpressionParser::parse("703074007 + 195967001").unwrap();
        let canon = ExpressionParser::canonicalize(&expr);
        assert_eq!(canon.focus_concepts[0].id, 195967001);
        assert_eq!(canon.focus_concepts[1].id, 703074007);
    }

    #[test]
    fn empty_expression_is_rejected() {
        assert!(matches!(ExpressionParser::parse(""), Err(ExpressionError::UnexpectedToken { .. })));
    }

    #[test]
    fn subsumption_holds_for_identical_expressions() {
        let store = SnomedStore::new();
        let expr = ExpressionParser::parse("73211009").unwrap();
        assert!(ExpressionParser::is_subsumed_by(&expr, &expr, &store));
    }

    #[test]
    fn disease_with_grouped_site_and_morphology_canonicalises_and_normalises() {
        use snomed_types::{CharacteristicType, DefinitionStatus, ModifierType, Rf2Concept, Rf2Relationship};

        let text = "64572001 |Disease| : { 363698007 |Finding site| = 39607008 |Lung structure|, \
                     116676008 |Associated morphology| = 23583003 |Inflammation| }";
        let expr = ExpressionParser::parse(text).unwrap();
        assert_eq!(expr.focus_concepts[0].id, 64572001);
        assert_eq!(expr.groups.len(), 1);
        assert_eq!(expr.groups[0].attributes.len(), 2);

        let shuffled = Expression {
            groups: vec![AttributeGroup {
                attributes: vec![expr.groups[0].attributes[1].clone(), expr.groups[0].attributes[0].clone()],
            }],
            ..expr.clone()
        };
        let canon = ExpressionParser::canonicalize(&shuffled);
        assert_eq!(canon.groups[0].attributes[0].name.id, 116676008);
        assert_eq!(canon.groups[0].attributes[1].name.id, 363698007);
        assert_eq!(canon, ExpressionParser::canonicalize(&expr), "canonical form is independent of writing order");

        let mut store = SnomedStore::new();
        store.insert_concepts([
            Rf2Concept { id: 64572001, effective_time: 20240101, active: true, module_id: 900000000000207008, definition_status_id: DefinitionStatus::PRIMITIVE_ID },
            Rf2Concept { id: 404684003, effective_time: 20240101, active: true, module_id: 900000000000207008, definition_status_id: DefinitionStatus::PRIMITIVE_ID },
        ]);
        store.insert_relationships([Rf2Relationship {
            id: 1,
            effective_time: 20240101,
            active: true,
            module_id: 900000000000207008,
            source_id: 64572001,
            destination_id: 404684003,
            relationship_group: 0,
            type_id: 116680003,
            characteristic_type_id: CharacteristicType::INFERRED_ID,
            modifier_id: ModifierType::EXISTENTIAL_ID,
        }]);

        let normalised = ExpressionParser::normal_form(&expr, &store);
        assert_eq!(normalised.focus_concepts[0].id, 404684003, "normal form introduces 64572001's parent");
    }
}
