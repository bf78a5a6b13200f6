//! ECL lexer.
//!
//! The one subtlety worth a comment: a bare run of digits is ambiguous
//! between a decimal numeric literal (`#3.4`, cardinality bounds) and the
//! start of an SCTID. The disambiguation rule is positional, not lexical —
//! a digit run is an SCTID unless it's immediately preceded by `#` (a
//! concrete-value literal marker) or it's one side of a `..`-delimited
//! cardinality range, in which case it's a plain integer. The lexer itself
//! stays dumb (`DigitRun`); the parser applies the rule since only the
//! parser knows which grammar position it's in.

use thiserror::Error;

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of ASCII digits, disambiguated by the parser.
    DigitRun(String),
    /// `|...|` delimited term text.
    Term(String),
    /// `"..."` quoted string literal (concrete string values).
    QuotedString(String),
    /// `<`
    Lt,
    /// `<<`
    LtLt,
    /// `<!`
    LtBang,
    /// `>`
    Gt,
    /// `>>`
    GtGt,
    /// `>!`
    GtBang,
    /// `^`
    Caret,
    /// `*`
    Star,
    /// `!`
    Bang,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `+`
    Plus,
    /// `#`
    Hash,
    /// `AND` (case-insensitive keyword)
    And,
    /// `OR`
    Or,
    /// `MINUS`
    Minus,
    /// `R` (reverse-flag keyword on a refinement attribute).
    Reverse,
    /// End of input.
    Eof,
}

/// Errors raised while lexing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    /// An unrecognised character was encountered.
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Byte offset of the character.
        offset: usize,
    },
    /// A `|...|` or `"..."` delimited literal was never closed.
    #[error("unterminated literal starting at offset {offset}")]
    UnterminatedLiteral {
        /// Byte offset where the literal began.
        offset: usize,
    },
}

/// A token with the byte offset it started at, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// Byte offset the token started at.
    pub offset: usize,
}

/// Tokenizes `src` into a vector of [`Spanned`] tokens, ending with
/// [`Token::Eof`].
pub fn lex(src: &str) -> Result<Vec<Spanned>, LexError> {
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
            '<' => {
                if chars.get(i + 1) == Some(&'<') {
                    if chars.get(i + 2) == Some(&'!') {
                        (Token::LtBang, 3) // treat <<! like <! per the open question: distinct node, shared evaluation
                    } else {
                        (Token::LtLt, 2)
                    }
                } else if chars.get(i + 1) == Some(&'!') {
                    (Token::LtBang, 2)
                } else {
                    (Token::Lt, 1)
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'>') {
                    (Token::GtGt, 2)
                } else if chars.get(i + 1) == Some(&'!') {
                    (Token::GtBang, 2)
                } else {
                    (Token::Gt, 1)
                }
            }
            '^' => (Token::Caret, 1),
            '*' => (Token::Star, 1),
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    (Token::NotEq, 2)
                } else {
                    (Token::Bang, 1)
                }
            }
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '{' => (Token::LBrace, 1),
            '}' => (Token::RBrace, 1),
            ':' => (Token::Colon, 1),
            ',' => (Token::Comma, 1),
            '+' => (Token::Plus, 1),
            '#' => (Token::Hash, 1),
            '=' => (Token::Eq, 1),
            '.' => {
                if chars.get(i + 1) == Some(&'.') {
                    (Token::DotDot, 2)
                } else {
                    (Token::Dot, 1)
                }
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
                        None => return Err(LexError::UnterminatedLiteral { offset: start }),
                    }
                }
                (Token::Term(s), j + 1 - i)
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
                        None => return Err(LexError::UnterminatedLiteral { offset: start }),
                    }
                }
                (Token::QuotedString(s), j + 1 - i)
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
            a if a.is_alphabetic() => {
                let mut j = i;
                let mut s = String::new();
                while let Some(&ch) = chars.get(j) {
                    if ch.is_alphanumeric() || ch == '_' {
                        s.push(ch);
                        j += 1;
                    } else {
                        break;
                    }
                }
                let upper = s.to_ascii_uppercase();
                let token = match upper.as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "MINUS" => Token::Minus,
                    "R" => Token::Reverse,
                    _ => return Err(LexError::UnexpectedChar { ch: a, offset: start }),
                };
                (token, j - i)
            }
            other => return Err(LexError::UnexpectedChar { ch: other, offset: start }),
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
