//! Boolean combinator over condition slots.
//!
//! The condition clause of a statement is reduced to a skeleton in which
//! every condition atom is replaced by a `{}` slot, e.g. `({} | {}) & !{}`.
//! [`Combinator::parse`] turns that skeleton into a small expression tree once,
//! at compile time; [`Combinator::evaluate`] walks it for every record with
//! the aggregated truth value of each condition.
//!
//! Precedence, from loosest to tightest: `|`, `&`, `!`.

use crate::error::{MarcError, Result};
use std::fmt;

/// Compiled boolean expression over condition slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combinator {
    /// Truth value of the condition at this position (statement order).
    Atom(usize),
    /// Negation.
    Not(Box<Combinator>),
    /// Conjunction.
    And(Box<Combinator>, Box<Combinator>),
    /// Disjunction.
    Or(Box<Combinator>, Box<Combinator>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Slot,
    Not,
    And,
    Or,
    LParen,
    RParen,
}

fn tokenize(skeleton: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = skeleton.chars().peekable();
    while let Some(c) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '!' => Token::Not,
            '&' => Token::And,
            '|' => Token::Or,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' if chars.peek() == Some(&'}') => {
                chars.next();
                Token::Slot
            },
            other => {
                return Err(MarcError::InvalidCondition(format!(
                    "unexpected character {other:?} in condition clause"
                )))
            },
        };
        tokens.push(token);
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    slots: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Combinator> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            expr = Combinator::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Combinator> {
        let mut expr = self.parse_not()?;
        while self.peek() == Some(Token::And) {
            self.advance();
            let rhs = self.parse_not()?;
            expr = Combinator::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Combinator> {
        if self.peek() == Some(Token::Not) {
            self.advance();
            let expr = self.parse_not()?;
            Ok(Combinator::Not(Box::new(expr)))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Combinator> {
        match self.advance() {
            Some(Token::Slot) => {
                let index = self.slots;
                self.slots += 1;
                Ok(Combinator::Atom(index))
            },
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(MarcError::InvalidCondition(
                        "unbalanced parenthesis".to_string(),
                    )),
                }
            },
            Some(token) => Err(MarcError::InvalidCondition(format!(
                "unexpected {token:?} in condition clause"
            ))),
            None => Err(MarcError::InvalidCondition(
                "condition clause ends unexpectedly".to_string(),
            )),
        }
    }
}

impl Combinator {
    /// Parse a slot skeleton into an expression.
    ///
    /// `atoms` is the number of condition atoms extracted from the clause;
    /// the skeleton must contain exactly that many `{}` slots.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidCondition`] for illegal characters, syntax
    /// errors, or a slot count that differs from `atoms`.
    ///
    /// # Examples
    ///
    /// ```
    /// use marcflow::Combinator;
    ///
    /// let combo = Combinator::parse("{} | !{}", 2).unwrap();
    /// assert!(combo.evaluate(&[false, false]));
    /// assert!(!combo.evaluate(&[false, true]));
    /// assert!(Combinator::parse("{} {}", 2).is_err());
    /// ```
    pub fn parse(skeleton: &str, atoms: usize) -> Result<Self> {
        let tokens = tokenize(skeleton)?;
        let slots = tokens.iter().filter(|t| **t == Token::Slot).count();
        if slots != atoms {
            return Err(MarcError::InvalidCondition(format!(
                "expected {atoms} condition slots, found {slots}"
            )));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            slots: 0,
        };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(MarcError::InvalidCondition(
                "trailing input in condition clause".to_string(),
            ));
        }
        Ok(expr)
    }

    /// Evaluate with one truth value per condition, in statement order.
    ///
    /// A slot without a corresponding value counts as false.
    #[must_use]
    pub fn evaluate(&self, truths: &[bool]) -> bool {
        match self {
            Combinator::Atom(index) => truths.get(*index).copied().unwrap_or(false),
            Combinator::Not(expr) => !expr.evaluate(truths),
            Combinator::And(lhs, rhs) => lhs.evaluate(truths) && rhs.evaluate(truths),
            Combinator::Or(lhs, rhs) => lhs.evaluate(truths) || rhs.evaluate(truths),
        }
    }

    /// Number of slots in the expression.
    #[must_use]
    pub fn slots(&self) -> usize {
        match self {
            Combinator::Atom(_) => 1,
            Combinator::Not(expr) => expr.slots(),
            Combinator::And(lhs, rhs) | Combinator::Or(lhs, rhs) => lhs.slots() + rhs.slots(),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Combinator::Or(..) => 0,
            Combinator::And(..) => 1,
            Combinator::Not(_) | Combinator::Atom(_) => 2,
        }
    }

    fn fmt_child(&self, child: &Combinator, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::Atom(index) => write!(f, "{{{index}}}"),
            Combinator::Not(expr) => {
                write!(f, "not ")?;
                self.fmt_child(expr, f)
            },
            Combinator::And(lhs, rhs) => {
                self.fmt_child(lhs, f)?;
                write!(f, " and ")?;
                self.fmt_child(rhs, f)
            },
            Combinator::Or(lhs, rhs) => {
                self.fmt_child(lhs, f)?;
                write!(f, " or ")?;
                self.fmt_child(rhs, f)
            },
        }
    }
}
