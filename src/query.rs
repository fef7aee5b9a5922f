//! Compiled queries and per-record collection.
//!
//! A [`CompiledQuery`] is built once from a selection statement and never
//! changes afterwards. Per-record state lives in a [`MatchContext`] owned by
//! whichever reader is parsing, so independent readers can share one query.
//!
//! # Examples
//!
//! ```
//! use marcflow::{CompiledQuery, MatchContext};
//!
//! let query = CompiledQuery::compile("245a 650_ 650_0a^Fiction")?;
//! let mut context = MatchContext::default();
//!
//! let mut collector = query.collector(&mut context);
//! collector.emit_subfield("245", "10", 'a', "Night tales");
//! collector.emit_subfield("650", " 0", 'a', "Fiction");
//! let row = collector.finish();
//!
//! assert_eq!(row.get("245a"), Some(&["Night tales".to_string()][..]));
//! assert_eq!(row.get("650_"), Some(&["Fiction".to_string()][..]));
//! # Ok::<(), marcflow::MarcError>(())
//! ```

use crate::combinator::Combinator;
use crate::error::Result;
use crate::label::{self, CONTROL_SLOTS, INDICATOR};
use crate::options::SelectOptions;
use crate::result::ResultRow;
use crate::statement::parse_statement;
use regex::Regex;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashSet;

/// One selected output field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pattern: String,
}

impl FieldSpec {
    pub(crate) fn new(pattern: String) -> Self {
        FieldSpec { pattern }
    }

    /// The field pattern, case-folded per the query options.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether an emission label contributes to this field.
    #[must_use]
    pub fn matches(&self, label: &str) -> bool {
        label::matches(&self.pattern, label)
    }
}

/// One condition of the statement's condition clause.
#[derive(Debug, Clone)]
pub struct ConditionSpec {
    label: String,
    regex: Option<Regex>,
}

impl ConditionSpec {
    pub(crate) fn new(label: String, regex: Option<Regex>) -> Self {
        ConditionSpec { label, regex }
    }

    /// The 6-character label pattern.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The regular expression values must contain, if any.
    #[must_use]
    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    /// Test one emission. `None` if the label is not addressed by this
    /// condition, otherwise whether the value satisfies it.
    #[must_use]
    pub fn test(&self, label: &str, value: &str) -> Option<bool> {
        if !label::condition_matches(&self.label, label) {
            return None;
        }
        Some(self.regex.as_ref().map_or(true, |regex| regex.is_match(value)))
    }
}

/// Fast-reject set of the tags a query can possibly use.
///
/// Tags are the first three characters of every field and condition
/// pattern. Patterns with a wildcard in the tag are kept apart and matched
/// character by character.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    exact: HashSet<String>,
    wildcard: Vec<String>,
}

impl TagFilter {
    fn insert(&mut self, pattern: &str) {
        let tag = label::tag_of(pattern);
        if tag.contains(label::ANY) {
            if !self.wildcard.iter().any(|known| known == tag) {
                self.wildcard.push(tag.to_string());
            }
        } else {
            self.exact.insert(tag.to_string());
        }
    }

    /// Whether values under this tag can contribute to any field or condition.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.exact.contains(tag)
            || self
                .wildcard
                .iter()
                .any(|pattern| label::matches(pattern, tag))
    }
}

/// An immutable, compiled selection statement.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    statement: String,
    fields: Vec<FieldSpec>,
    conditions: Vec<ConditionSpec>,
    combinator: Option<Combinator>,
    tags: TagFilter,
    options: SelectOptions,
}

impl CompiledQuery {
    /// Compile a statement with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is malformed: no fields, an invalid
    /// field pattern, a condition that is only wildcards, a regex that does not
    /// compile, or a condition clause that is not a valid boolean expression.
    pub fn compile(statement: &str) -> Result<Self> {
        Self::compile_with(statement, SelectOptions::default())
    }

    /// Compile a statement with the given options.
    ///
    /// # Errors
    ///
    /// See [`CompiledQuery::compile`].
    pub fn compile_with(statement: &str, options: SelectOptions) -> Result<Self> {
        let parsed = parse_statement(statement, &options)?;

        let mut tags = TagFilter::default();
        for field in &parsed.fields {
            tags.insert(field.pattern());
        }
        for condition in &parsed.conditions {
            tags.insert(condition.label());
        }

        tracing::trace!(
            statement,
            fields = parsed.fields.len(),
            conditions = parsed.conditions.len(),
            "compiled selection statement"
        );

        Ok(CompiledQuery {
            statement: statement.to_string(),
            fields: parsed.fields,
            conditions: parsed.conditions,
            combinator: parsed.combinator,
            tags,
            options,
        })
    }

    /// The statement this query was compiled from.
    #[must_use]
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Selected fields, in statement order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Conditions, in statement order.
    #[must_use]
    pub fn conditions(&self) -> &[ConditionSpec] {
        &self.conditions
    }

    /// The condition combinator, present iff there are conditions.
    #[must_use]
    pub fn combinator(&self) -> Option<&Combinator> {
        self.combinator.as_ref()
    }

    /// Options the query was compiled with.
    #[must_use]
    pub fn options(&self) -> &SelectOptions {
        &self.options
    }

    /// The fast-reject tag set.
    #[must_use]
    pub fn tags(&self) -> &TagFilter {
        &self.tags
    }

    /// Start collecting one record. The context is reset first.
    pub fn collector<'q, 'c>(&'q self, context: &'c mut MatchContext) -> RecordCollector<'q, 'c> {
        context.reset(self.conditions.len());
        RecordCollector {
            query: self,
            context,
            values: vec![Vec::new(); self.fields.len()],
        }
    }

    /// A serializable snapshot of the query, for diagnostics.
    #[must_use]
    pub fn describe(&self) -> QueryDescription {
        QueryDescription {
            statement: self.statement.clone(),
            fields: self.fields.iter().map(|f| f.pattern.clone()).collect(),
            conditions: self
                .conditions
                .iter()
                .map(|c| ConditionDescription {
                    label: c.label.clone(),
                    regex: c.regex.as_ref().map(|r| r.as_str().to_string()),
                })
                .collect(),
            combinator: self.combinator.as_ref().map(ToString::to_string),
            options: self.options,
        }
    }
}

/// Snapshot of a compiled query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryDescription {
    /// Source statement.
    pub statement: String,
    /// Field patterns.
    pub fields: Vec<String>,
    /// Conditions.
    pub conditions: Vec<ConditionDescription>,
    /// Combinator rendered with `and`/`or`/`not`.
    pub combinator: Option<String>,
    /// Options in effect.
    pub options: SelectOptions,
}

/// Snapshot of one condition.
#[derive(Debug, Clone, Serialize)]
pub struct ConditionDescription {
    /// 6-character label pattern.
    pub label: String,
    /// Regex source, if any.
    pub regex: Option<String>,
}

/// Per-record condition outcomes.
///
/// Holds one list of outcomes per condition. Readers keep one context and
/// reuse it for every record; [`CompiledQuery::collector`] clears it.
#[derive(Debug, Clone, Default)]
pub struct MatchContext {
    outcomes: Vec<SmallVec<[bool; 4]>>,
}

impl MatchContext {
    fn reset(&mut self, conditions: usize) {
        self.outcomes.resize_with(conditions, SmallVec::new);
        for outcomes in &mut self.outcomes {
            outcomes.clear();
        }
    }

    fn record(&mut self, condition: usize, outcome: bool) {
        if let Some(outcomes) = self.outcomes.get_mut(condition) {
            outcomes.push(outcome);
        }
    }

    /// Aggregated truth value of each condition: any outcome true.
    #[must_use]
    pub fn truths(&self) -> Vec<bool> {
        self.outcomes
            .iter()
            .map(|outcomes| outcomes.iter().any(|&o| o))
            .collect()
    }
}

/// Routes the emissions of one record into field values and condition
/// outcomes, then assembles the record's [`ResultRow`].
#[derive(Debug)]
pub struct RecordCollector<'q, 'c> {
    query: &'q CompiledQuery,
    context: &'c mut MatchContext,
    values: Vec<Vec<String>>,
}

impl RecordCollector<'_, '_> {
    fn is_relevant(&self, tag: &str) -> bool {
        self.query.tags.contains(&self.query.options.fold(tag))
    }

    /// Offer a value under a 3- or 4-character field label.
    pub fn emit_field(&mut self, label: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        let label = self.query.options.fold(label);
        if !self.query.tags.contains(label::tag_of(&label)) {
            return;
        }
        for (field, values) in self.query.fields.iter().zip(self.values.iter_mut()) {
            if field.matches(&label) {
                values.push(value.to_string());
            }
        }
    }

    /// Offer a value under a 6-character condition label.
    pub fn emit_condition(&mut self, label: &str, value: &str) {
        if value.is_empty() || self.query.conditions.is_empty() {
            return;
        }
        let label = self.query.options.fold(label);
        if !self.query.tags.contains(label::tag_of(&label)) {
            return;
        }
        for (index, condition) in self.query.conditions.iter().enumerate() {
            if let Some(outcome) = condition.test(&label, value) {
                self.context.record(index, outcome);
            }
        }
    }

    /// Emit a value that has neither indicators nor subfields: the leader,
    /// a control field or an accession number.
    pub fn emit_control(&mut self, tag: &str, value: &str) {
        if !self.is_relevant(tag) {
            return;
        }
        self.emit_field(tag, value);
        if !self.query.conditions.is_empty() {
            self.emit_condition(&format!("{tag}{CONTROL_SLOTS}"), value);
        }
    }

    /// Emit the indicator pair of a data field.
    pub fn emit_indicators(&mut self, tag: &str, indicators: &str) {
        if !self.is_relevant(tag) {
            return;
        }
        self.emit_field(&format!("{tag}{INDICATOR}"), indicators);
    }

    /// Emit one subfield of a data field.
    pub fn emit_subfield(&mut self, tag: &str, indicators: &str, code: char, value: &str) {
        if !self.is_relevant(tag) {
            return;
        }
        self.emit_field(&format!("{tag}{code}"), value);
        if !self.query.conditions.is_empty() {
            self.emit_condition(&format!("{tag}{indicators}{code}"), value);
        }
    }

    /// Evaluate the conditions and assemble the result.
    ///
    /// A record failing its condition filter yields the canonical empty row.
    #[must_use]
    pub fn finish(self) -> ResultRow {
        let options = &self.query.options;
        if let Some(combinator) = &self.query.combinator {
            if !combinator.evaluate(&self.context.truths()) {
                return ResultRow::empty(options.shape);
            }
        }
        ResultRow::assemble(&self.query.fields, self.values, options)
    }
}
