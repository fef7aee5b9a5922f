//! Emission labels and wildcard pattern matching.
//!
//! Every value a parser emits carries a label:
//!
//! | Label | Meaning |
//! |-------|---------|
//! | `245` | control field value, or a whole data field |
//! | `245*` | the indicator pair of a data field |
//! | `245a` | one subfield |
//! | `LDR` | the record leader |
//!
//! Conditions are tested against a 6-character form instead: tag, both
//! indicators and the subfield code (`24510a`). Control fields, the leader
//! and the Aleph accession number use `___` in the last three slots.

/// Reserved tag for the record leader.
pub const LEADER_TAG: &str = "LDR";

/// Reserved tag for the Aleph accession sequence number.
pub const ASN_TAG: &str = "ASN";

/// Reserved tag for the Aleph format line.
pub const FORMAT_TAG: &str = "FMT";

/// Matches any single character of a label.
pub const ANY: char = '_';

/// Marks the indicator cell of a 4-character label.
pub const INDICATOR: char = '*';

/// Slot filler for condition labels of values without indicators or subfields.
pub(crate) const CONTROL_SLOTS: &str = "___";

/// Test a field pattern against a 3- or 4-character emission label.
///
/// The pattern and label must have the same length. `_` in the pattern
/// matches any character, except that a wildcard in the fourth position never
/// matches an indicator label: `245_` selects subfields of 245, never `245*`.
/// Case folding is applied by the caller, to both sides alike.
///
/// # Examples
///
/// ```
/// use marcflow::label::matches;
///
/// assert!(matches("245a", "245a"));
/// assert!(matches("_45_", "245b"));
/// assert!(matches("245*", "245*"));
/// assert!(!matches("245_", "245*"));
/// assert!(!matches("245*", "245a"));
/// assert!(!matches("245", "245a"));
/// ```
#[must_use]
pub fn matches(pattern: &str, label: &str) -> bool {
    if pattern == label {
        return true;
    }
    let length = pattern.chars().count();
    if length != label.chars().count() {
        return false;
    }
    if length == 4 && pattern.ends_with(ANY) && label.ends_with(INDICATOR) {
        return false;
    }
    pattern
        .chars()
        .zip(label.chars())
        .all(|(p, l)| p == ANY || p == l)
}

/// Test a 6-character condition pattern against a condition label.
///
/// `_` matches any character. In the two indicator slots a space matches any
/// indicator as well.
#[must_use]
pub(crate) fn condition_matches(pattern: &str, label: &str) -> bool {
    pattern.chars().count() == label.chars().count()
        && pattern
            .chars()
            .zip(label.chars())
            .enumerate()
            .all(|(slot, (p, l))| {
                p == ANY || p == l || (p == ' ' && INDICATOR_SLOTS.contains(&slot))
            })
}

/// Positions of the indicators in a condition label.
const INDICATOR_SLOTS: std::ops::Range<usize> = 3..5;

/// The tag part (first three characters) of a label or pattern.
#[must_use]
pub fn tag_of(label: &str) -> &str {
    match label.char_indices().nth(3) {
        Some((end, _)) => &label[..end],
        None => label,
    }
}

/// Whether a tag denotes a value emitted whole, without indicators or subfields.
#[must_use]
pub fn is_control_tag(tag: &str) -> bool {
    tag.starts_with("00")
}
