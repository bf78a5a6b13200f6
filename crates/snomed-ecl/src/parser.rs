//! Recursive-descent parser from [`crate::lexer::Token`] streams to
//! [`crate::ast`] nodes.
//!
//! The grammar is a simplified form of the ECL v2.1 grammar, structured
//! (like the grammar itself) as a chain of productions from loosest to
//! tightest binding: expression constraint → dotted → refined → simple →
//! focus. Refinements mirror the same shape one level down: refinement →
//! attribute set → attribute group → attribute.

use crate::ast::*;
use crate::lexer::{lex, LexError, Spanned, Token};
use thiserror::Error;

/// Errors raised while parsing a token stream into an AST.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The lexer rejected the input before parsing began.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// A token appeared where the grammar didn't expect it.
    #[error("unexpected token {found:?} at offset {offset}, expected {expected}")]
    Unexpected {
        /// What was actually found.
        found: Token,
        /// Byte offset of the offending token.
        offset: usize,
        /// A description of what the grammar allowed at this point.
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
    /// Trailing tokens remained after a complete expression constraint was
    /// parsed.
    #[error("unexpected trailing input at offset {offset}")]
    TrailingInput {
        /// Byte offset of the first unconsumed token.
        offset: usize,
    },
}

/// Parses a full ECL expression constraint from source text.
pub fn parse(src: &str) -> Result<ExpressionConstraint, ParseError> {
    let tokens = lex(src)?;
    let mut p = Parser { tokens, pos: 0 };
    let result = p.parse_expression_constraint()?;
    p.expect(Token::Eof, "end of input")?;
    Ok(ExpressionConstraint(result))
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
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

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<Spanned, ParseError> {
        if self.peek().token == token {
            Ok(self.advance())
        } else {
            let found = self.peek().clone();
            Err(ParseError::Unexpected {
                found: found.token,
                offset: found.offset,
                expected,
            })
        }
    }

    fn parse_expression_constraint(&mut self) -> Result<SubExpressionConstraint, ParseError> {
        let left = self.parse_dotted_expression_constraint()?;
        let operator = match self.peek().token {
            Token::And => CompoundOperator::And,
            Token::Or => CompoundOperator::Or,
            Token::Minus => CompoundOperator::Minus,
            _ => return Ok(left),
        };
        let mut terms = vec![left];
        while self.peek().token == token_for(operator) {
            self.advance();
            terms.push(self.parse_dotted_expression_constraint()?);
        }
        Ok(SubExpressionConstraint::Compound(CompoundExpressionConstraint {
            operator,
            terms,
        }))
    }

    fn parse_dotted_expression_constraint(&mut self) -> Result<SubExpressionConstraint, ParseError> {
        let mut focus = self.parse_refined_or_simple()?;
        while self.peek().token == Token::Dot {
            self.advance();
            let attribute = self.parse_concept_reference()?;
            focus = SubExpressionConstraint::Dotted(DottedExpressionConstraint {
                focus: Box::new(focus),
                attribute,
            });
        }
        Ok(focus)
    }

    fn parse_refined_or_simple(&mut self) -> Result<SubExpressionConstraint, ParseError> {
        let simple = self.parse_simple_expression_constraint()?;
        if self.peek().token == Token::Colon {
            self.advance();
            let refinement = self.parse_refinement()?;
            Ok(SubExpressionConstraint::Refined(RefinedExpressionConstraint {
                focus: Box::new(SubExpressionConstraint::Simple(Box::new(simple))),
                refinement,
            }))
        } else {
            Ok(SubExpressionConstraint::Simple(Box::new(simple)))
        }
    }

    fn parse_simple_expression_constraint(&mut self) -> Result<SimpleExpressionConstraint, ParseError> {
        let operator = match self.peek().token {
            Token::Lt => {
                self.advance();
                Some(HierarchyOperator::DescendantOf)
            }
            Token::LtLt => {
                self.advance();
                Some(HierarchyOperator::DescendantOrSelfOf)
            }
            Token::LtBang => {
                self.advance();
                Some(HierarchyOperator::ChildOf)
            }
            Token::Gt => {
                self.advance();
                Some(HierarchyOperator::AncestorOf)
            }
            Token::GtGt => {
                self.advance();
                Some(HierarchyOperator::AncestorOrSelfOf)
            }
            Token::GtBang => {
                self.advance();
                Some(HierarchyOperator::ParentOf)
            }
            _ => None,
        };
        let focus = self.parse_expression_focus()?;
        Ok(SimpleExpressionConstraint { operator, focus })
    }

    fn parse_expression_focus(&mut self) -> Result<ExpressionFocus, ParseError> {
        match self.peek().token.clone() {
            Token::Star => {
                self.advance();
                Ok(ExpressionFocus::Wildcard)
            }
            Token::Caret => {
                self.advance();
                let reference = self.parse_concept_reference()?;
                Ok(ExpressionFocus::MemberOf(reference))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expression_constraint()?;
                self.expect(Token::RParen, "closing `)`")?;
                Ok(ExpressionFocus::Nested(Box::new(inner)))
            }
            Token::DigitRun(_) => {
                let reference = self.parse_concept_reference()?;
                Ok(ExpressionFocus::Concept(reference))
            }
            other => {
                let offset = self.peek().offset;
                Err(ParseError::Unexpected {
                    found: other,
                    offset,
                    expected: "`*`, `^`, `(`, or a concept id",
                })
            }
        }
    }

    fn parse_concept_reference(&mut self) -> Result<ConceptReference, ParseError> {
        let tok = self.advance();
        let id = match tok.token {
            Token::DigitRun(digits) => digits.parse::<u64>().map_err(|_| ParseError::InvalidConceptId {
                text: digits.clone(),
                offset: tok.offset,
            })?,
            other => {
                return Err(ParseError::Unexpected {
                    found: other,
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
        Ok(ConceptReference { id, term })
    }

    fn parse_refinement(&mut self) -> Result<Refinement, ParseError> {
        let mut left = Refinement::Set(self.parse_attribute_set()?);
        loop {
            match self.peek().token {
                Token::And => {
                    self.advance();
                    let right = Refinement::Set(self.parse_attribute_set()?);
                    left = Refinement::And(Box::new(left), Box::new(right));
                }
                Token::Or => {
                    self.advance();
                    let right = Refinement::Set(self.parse_attribute_set()?);
                    left = Refinement::Or(Box::new(left), Box::new(right));
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_attribute_set(&mut self) -> Result<AttributeSet, ParseError> {
        if self.peek().token == Token::LBracket || self.peek().token == Token::LBrace {
            let mut groups = vec![self.parse_attribute_group()?];
            while self.peek().token == Token::Comma {
                self.advance();
                groups.push(self.parse_attribute_group()?);
            }
            Ok(AttributeSet::Grouped(groups))
        } else {
            let mut attrs = vec![self.parse_attribute()?];
            while self.peek().token == Token::Comma {
                self.advance();
                attrs.push(self.parse_attribute()?);
            }
            Ok(AttributeSet::Ungrouped(attrs))
        }
    }

    fn parse_attribute_group(&mut self) -> Result<AttributeGroup, ParseError> {
        let cardinality = self.maybe_parse_cardinality()?;
        self.expect(Token::LBrace, "`{` opening an attribute group")?;
        let mut attributes = vec![self.parse_attribute()?];
        while self.peek().token == Token::Comma {
            self.advance();
            attributes.push(self.parse_attribute()?);
        }
        self.expect(Token::RBrace, "`}` closing an attribute group")?;
        Ok(AttributeGroup { cardinality, attributes })
    }

    fn maybe_parse_cardinality(&mut self) -> Result<Option<Cardinality>, ParseError> {
        if self.peek().token != Token::LBracket {
            return Ok(None);
        }
        self.advance();
        let min_tok = self.advance();
        let min = match min_tok.token {
            Token::DigitRun(d) => d,
            other => {
                return Err(ParseError::Unexpected {
                    found: other,
                    offset: min_tok.offset,
                    expected: "a cardinality lower bound",
                })
            }
        };
        self.expect(Token::DotDot, "`..` in a cardinality range")?;
        let max_tok = self.advance();
        let max = match max_tok.token {
            Token::DigitRun(d) => d,
            Token::Star => "*".to_string(),
            other => {
                return Err(ParseError::Unexpected {
                    found: other,
                    offset: max_tok.offset,
                    expected: "a cardinality upper bound or `*`",
                })
            }
        };
        self.expect(Token::RBracket, "`]` closing a cardinality range")?;
        let spec = format!("{min}..{max}");
        Cardinality::parse(&spec).map(Some).map_err(|_| ParseError::Unexpected {
            found: Token::RBracket,
            offset: self.peek().offset,
            expected: "a valid cardinality range",
        })
    }

    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let cardinality = self.maybe_parse_cardinality()?;
        let reversed = if self.peek().token == Token::Reverse {
            self.advance();
            true
        } else {
            false
        };
        let name = self.parse_dotted_expression_constraint()?;
        let comparison = self.parse_attribute_comparison()?;
        Ok(Attribute {
            cardinality,
            reversed,
            name,
            comparison,
        })
    }

    fn parse_attribute_comparison(&mut self) -> Result<AttributeComparison, ParseError> {
        let (operator, negated) = self.parse_comparison_operator()?;
        if self.peek().token == Token::Hash {
            self.advance();
            let value = self.parse_numeric_literal()?;
            Ok(AttributeComparison::Numeric(NumericComparison { operator, value }))
        } else if operator == NumericOperator::Eq || operator == NumericOperator::NotEq {
            let value = if self.peek().token == Token::Star {
                self.advance();
                ExpressionComparison::Wildcard
            } else {
                ExpressionComparison::Constraint(Box::new(self.parse_expression_constraint()?))
            };
            Ok(AttributeComparison::Expression { negated, value })
        } else {
            Err(ParseError::Unexpected {
                found: self.peek().token.clone(),
                offset: self.peek().offset,
                expected: "`#` before a numeric attribute value",
            })
        }
    }

    /// Consumes a comparison operator token (possibly two tokens, for
    /// `<=`/`>=` which the lexer emits as separate `Lt`/`Gt` + `Eq`
    /// tokens). Returns the operator plus whether it was a `!=` negation,
    /// which only applies to expression-valued comparisons.
    fn parse_comparison_operator(&mut self) -> Result<(NumericOperator, bool), ParseError> {
        let tok = self.advance();
        match tok.token {
            Token::Eq => Ok((NumericOperator::Eq, false)),
            Token::NotEq => Ok((NumericOperator::NotEq, true)),
            Token::Lt => {
                if self.peek().token == Token::Eq {
                    self.advance();
                    Ok((NumericOperator::LtEq, false))
                } else {
                    Ok((NumericOperator::Lt, false))
                }
            }
            Token::Gt => {
                if self.peek().token == Token::Eq {
                    self.advance();
                    Ok((NumericOperator::GtEq, false))
                } else {
                    Ok((NumericOperator::Gt, false))
                }
            }
            other => Err(ParseError::Unexpected {
                found: other,
                offset: tok.offset,
                expected: "a comparison operator (`=`, `!=`, `<`, `<=`, `>`, `>=`)",
            }),
        }
    }

    fn parse_numeric_literal(&mut self) -> Result<String, ParseError> {
        let tok = self.advance();
        let mut value = match tok.token {
            Token::DigitRun(d) => d,
            other => {
                return Err(ParseError::Unexpected {
                    found: other,
                    offset: tok.offset,
                    expected: "a numeric literal",
                })
            }
        };
        if self.peek().token == Token::Dot {
            self.advance();
            let frac_tok = self.advance();
            match frac_tok.token {
                Token::DigitRun(d) => {
                    value.push('.');
                    value.push_str(&d);
                }
                other => {
                    return Err(ParseError::Unexpected {
                        found: other,
                        offset: frac_tok.offset,
                        expected: "digits after a decimal point",
                    })
                }
            }
        }
        Ok(value)
    }
}

fn token_for(op: CompoundOperator) -> Token {
    match op {
        CompoundOperator::And => Token::And,
        CompoundOperator::Or => Token::Or,
        CompoundOperator::Minus => Token::Minus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focus_id(ec: &ExpressionConstraint) -> u64 {
        match &ec.0 {
            SubExpressionConstraint::Simple(s) => match &s.focus {
                ExpressionFocus::Concept(c) => c.id,
                _ => panic!("not a concept focus"),
            },
            _ => panic!("not a simple constraint"),
        }
    }

    #[test]
    fn parses_bare_concept_reference() {
        let ec = parse("73211009 |Diabetes mellitus|").unwrap();
        assert_eq!(focus_id(&ec), 73211009);
    }

    #[test]
    fn parses_descendant_of() {
        let ec = parse("< 64572001").unwrap();
        match &ec.0 {
            SubExpressionConstraint::Simple(s) => {
                assert_eq!(s.operator, Some(HierarchyOperator::DescendantOf));
            }
            _ => panic!("expected simple constraint"),
        }
    }

    #[test]
    fn child_of_is_a_distinct_operator_from_descendant_of() {
        let a = parse("< 64572001").unwrap();
        let b = parse("<! 64572001").unwrap();
        let op = |ec: &ExpressionConstraint| match &ec.0 {
            SubExpressionConstraint::Simple(s) => s.operator,
            _ => None,
        };
        assert_ne!(op(&a), op(&b));
        assert_eq!(op(&b), Some(HierarchyOperator::ChildOf));
    }

    #[test]
    fn parses_wildcard() {
        let ec = parse("*").unwrap();
        assert!(matches!(
            ec.0,
            SubExpressionConstraint::Simple(ref s) if s.focus == ExpressionFocus::Wildcard
        ));
    }

    #[test]
    fn parses_member_of() {
        let ec = parse("^ 900000000000506000").unwrap();
        match &ec.0 {
            SubExpressionConstraint::Simple(s) => {
                assert!(matches!(s.focus, ExpressionFocus::MemberOf(_)));
            }
            _ => panic!("expected simple constraint"),
        }
    }

    #[test]
    fn parses_compound_and() {
        let ec = parse("< 64572001 AND < 404684003").unwrap();
        match ec.0 {
            SubExpressionConstraint::Compound(c) => {
                assert_eq!(c.operator, CompoundOperator::And);
                assert_eq!(c.terms.len(), 2);
            }
            _ => panic!("expected compound constraint"),
        }
    }

    #[test]
    fn parses_refined_expression_with_attribute() {
        let ec = parse("< 404684003 : 363698007 |Finding site| = 113257007").unwrap();
        match ec.0 {
            SubExpressionConstraint::Refined(r) => match r.refinement {
                Refinement::Set(AttributeSet::Ungrouped(attrs)) => {
                    assert_eq!(attrs.len(), 1);
                    assert!(!attrs[0].reversed);
                }
                _ => panic!("expected an ungrouped attribute set"),
            },
            _ => panic!("expected refined constraint"),
        }
    }

    #[test]
    fn parses_reversed_attribute() {
        let ec = parse("404684003 : R 363698007 = 113257007").unwrap();
        match ec.0 {
            SubExpressionConstraint::Refined(r) => match r.refinement {
                Refinement::Set(AttributeSet::Ungrouped(attrs)) => assert!(attrs[0].reversed),
                _ => panic!("expected ungrouped attribute set"),
            },
            _ => panic!("expected refined constraint"),
        }
    }

    #[test]
    fn parses_numeric_attribute_comparison() {
        let ec = parse("27658006 : 111115 |Has active ingredient| = #10").unwrap();
        match ec.0 {
            SubExpressionConstraint::Refined(r) => match r.refinement {
                Refinement::Set(AttributeSet::Ungrouped(attrs)) => {
                    assert!(matches!(attrs[0].comparison, AttributeComparison::Numeric(_)));
                }
                _ => panic!("expected ungrouped attribute set"),
            },
            _ => panic!("expected refined constraint"),
        }
    }

    #[test]
    fn parses_grouped_attributes_with_cardinality() {
        let ec = parse("404684003 : [1..2]{ 363698007 = 113257007 }").unwrap();
        match ec.0 {
            SubExpressionConstraint::Refined(r) => match r.refinement {
                Refinement::Set(AttributeSet::Grouped(groups)) => {
                    assert_eq!(groups.len(), 1);
                    assert!(groups[0].cardinality.is_some());
                }
                _ => panic!("expected a grouped attribute set"),
            },
            _ => panic!("expected refined constraint"),
        }
    }

    #[test]
    fn parses_dotted_expression() {
        let ec = parse("< 404684003 . 116676008").unwrap();
        assert!(matches!(ec.0, SubExpressionConstraint::Dotted(_)));
    }

    #[test]
    fn parses_nested_focus() {
        let ec = parse("(< 404684003 OR < 64572001)").unwrap();
        match ec.0 {
            SubExpressionConstraint::Simple(s) => {
                assert!(matches!(s.focus, ExpressionFocus::Nested(_)));
            }
            _ => panic!("expected simple constraint wrapping a nested focus"),
        }
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("73211009 )").is_err());
    }

    #[test]
    fn invalid_focus_is_an_error() {
        assert!(parse(": 1").is_err());
    }
}
