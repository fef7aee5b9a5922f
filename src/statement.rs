//! Selection statement compiler.
//!
//! A statement is a run of field patterns followed by an optional condition
//! clause:
//!
//! ```text
//! 245a 100_ 650*  (650_0a^Fiction | !041___) & 245__aCat\ Tales
//! ```
//!
//! The leading tokens of length 3 or 4 are field patterns. The first token of
//! any other length starts the condition clause, which runs to the end of the
//! statement. Inside the clause each condition atom is a 6-character label
//! (tag, two indicators, subfield code) optionally followed by a regular
//! expression. A space or parenthesis inside that expression is written
//! `\ `, `\(` or `\)`. Atoms are combined with `!`, `&`, `|` and parentheses.

use crate::combinator::Combinator;
use crate::error::{MarcError, Result};
use crate::label::ANY;
use crate::options::SelectOptions;
use crate::query::{ConditionSpec, FieldSpec};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FIELD_TOKEN: Regex = Regex::new(r"^\w{3}[\w*]?$").unwrap();
    static ref CONDITION_ATOM: Regex = Regex::new(r"\w{3}[\w ]{2}\w[^ )]*").unwrap();
}

// Escaped characters are parked in the private use area while atoms are
// located, so they can't be read as clause syntax.
const ESCAPED_SPACE: char = '\u{E000}';
const ESCAPED_OPEN: char = '\u{E001}';
const ESCAPED_CLOSE: char = '\u{E002}';

/// Output of the compiler, before it is frozen into a query.
#[derive(Debug)]
pub(crate) struct ParsedStatement {
    pub fields: Vec<FieldSpec>,
    pub conditions: Vec<ConditionSpec>,
    pub combinator: Option<Combinator>,
}

/// Compile a statement under the given options.
pub(crate) fn parse_statement(statement: &str, options: &SelectOptions) -> Result<ParsedStatement> {
    let normalized = statement.replace('\t', " ");
    let normalized = normalized.trim_start();
    if normalized.is_empty() {
        return Err(MarcError::InvalidStatement("statement is empty".to_string()));
    }

    let (tokens, clause) = split_statement(normalized);
    if tokens.is_empty() {
        return Err(MarcError::InvalidStatement(
            "statement selects no fields".to_string(),
        ));
    }

    let fields = tokens
        .into_iter()
        .map(|token| parse_field(token, options))
        .collect::<Result<Vec<_>>>()?;

    let (conditions, combinator) = match clause {
        Some(clause) => {
            let (conditions, combinator) = parse_condition_clause(clause, options)?;
            (conditions, Some(combinator))
        },
        None => (Vec::new(), None),
    };

    Ok(ParsedStatement {
        fields,
        conditions,
        combinator,
    })
}

/// Split off the leading field-shaped tokens. Whatever follows them is the
/// condition clause, taken verbatim.
fn split_statement(statement: &str) -> (Vec<&str>, Option<&str>) {
    let field_count = statement
        .split_whitespace()
        .take_while(|token| matches!(token.chars().count(), 3 | 4))
        .count();

    let mut tokens = Vec::with_capacity(field_count);
    let mut rest = statement;
    for _ in 0..field_count {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        tokens.push(&rest[..end]);
        rest = &rest[end..];
    }

    let rest = rest.trim_start();
    let clause = if rest.is_empty() { None } else { Some(rest) };
    (tokens, clause)
}

fn parse_field(token: &str, options: &SelectOptions) -> Result<FieldSpec> {
    if !FIELD_TOKEN.is_match(token) || token.trim_matches(ANY).is_empty() {
        return Err(MarcError::InvalidFieldPattern(token.to_string()));
    }
    Ok(FieldSpec::new(options.fold(token).into_owned()))
}

fn parse_condition_clause(
    clause: &str,
    options: &SelectOptions,
) -> Result<(Vec<ConditionSpec>, Combinator)> {
    let escaped = clause
        .replace("\\ ", &ESCAPED_SPACE.to_string())
        .replace("\\(", &ESCAPED_OPEN.to_string())
        .replace("\\)", &ESCAPED_CLOSE.to_string());

    let conditions = CONDITION_ATOM
        .find_iter(&escaped)
        .map(|atom| parse_condition_atom(atom.as_str(), options))
        .collect::<Result<Vec<_>>>()?;
    if conditions.is_empty() {
        return Err(MarcError::InvalidCondition(format!(
            "no condition found in {clause:?}"
        )));
    }

    let skeleton = CONDITION_ATOM.replace_all(&escaped, "{}");
    let combinator = Combinator::parse(&skeleton, conditions.len())?;
    Ok((conditions, combinator))
}

fn parse_condition_atom(atom: &str, options: &SelectOptions) -> Result<ConditionSpec> {
    let split = atom.char_indices().nth(6).map_or(atom.len(), |(i, _)| i);
    let (label, pattern) = atom.split_at(split);
    if label.trim_matches(ANY).is_empty() {
        return Err(MarcError::InvalidCondition(format!(
            "condition label {label:?} is only wildcards"
        )));
    }

    let regex = if pattern.is_empty() {
        None
    } else {
        Some(Regex::new(&unescape(pattern))?)
    };
    Ok(ConditionSpec::new(options.fold(label).into_owned(), regex))
}

fn unescape(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ESCAPED_SPACE => ' ',
            ESCAPED_OPEN => '(',
            ESCAPED_CLOSE => ')',
            other => other,
        })
        .collect()
}
