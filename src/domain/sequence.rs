//! Month-scoped sequence codes.
//!
//! Patients receive an `LN` and visits a reference number, both shaped
//! `YYMM` followed by a four digit counter that restarts every month. There is
//! no counter table: the next value is derived from the codes already stored
//! under the month prefix. Two allocations racing within the same month can
//! observe the same maximum; callers rely on a unique index and retry.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use thiserror::Error;

/// Marker carried by LN codes issued before the plain `YYMM####` format.
pub const LEGACY_MARKER: char = 'L';

const SEQUENCE_DIGITS: usize = 4;
const MAX_SEQUENCE: u32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("Sequence for scope {prefix} is exhausted")]
    Exhausted { prefix: String },

    #[error("Invalid scope prefix: {0}")]
    InvalidPrefix(String),
}

/// `YYMM` for the given local calendar date, e.g. `2509` for September 2025.
#[must_use]
pub fn scope_prefix(date: NaiveDate) -> String {
    format!("{:02}{:02}", date.year().rem_euclid(100), date.month())
}

/// Highest counter among `existing` codes belonging to `prefix`.
///
/// Codes outside the scope, or whose suffix is not exactly four digits, are
/// skipped rather than treated as errors.
pub fn current_max<'a, I>(prefix: &str, existing: I) -> Result<Option<u32>, SequenceError>
where
    I: IntoIterator<Item = &'a str>,
{
    let pattern = scope_pattern(prefix)?;

    Ok(existing
        .into_iter()
        .filter_map(|code| pattern.captures(code.trim()))
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()))
        .max())
}

/// Next code in the `prefix` scope: highest existing counter plus one.
///
/// The legacy `L`-marked form counts towards the maximum but new codes are
/// always produced in the plain form.
pub fn allocate_next_code<'a, I>(prefix: &str, existing: I) -> Result<String, SequenceError>
where
    I: IntoIterator<Item = &'a str>,
{
    let next = current_max(prefix, existing)?.map_or(1, |max| max + 1);

    if next > MAX_SEQUENCE {
        return Err(SequenceError::Exhausted {
            prefix: prefix.to_string(),
        });
    }

    Ok(format_code(prefix, next))
}

/// `prefix` followed by `counter` zero-padded to four digits.
#[must_use]
pub fn format_code(prefix: &str, counter: u32) -> String {
    format!("{prefix}{counter:0width$}", width = SEQUENCE_DIGITS)
}

fn scope_pattern(prefix: &str) -> Result<Regex, SequenceError> {
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_digit()) {
        return Err(SequenceError::InvalidPrefix(prefix.to_string()));
    }

    Regex::new(&format!(
        r"^{LEGACY_MARKER}?{}(\d{{{SEQUENCE_DIGITS}}})$",
        regex::escape(prefix)
    ))
    .map_err(|_| SequenceError::InvalidPrefix(prefix.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_prefix() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 14).unwrap();
        assert_eq!(scope_prefix(date), "2509");

        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert_eq!(scope_prefix(date), "3001");

        let date = NaiveDate::from_ymd_opt(2100, 12, 31).unwrap();
        assert_eq!(scope_prefix(date), "0012");
    }

    #[test]
    fn test_first_code_of_month() {
        let code = allocate_next_code("2509", Vec::<&str>::new()).unwrap();
        assert_eq!(code, "25090001");
        assert_eq!(code.len(), 8);
    }

    #[test]
    fn test_increments_highest_suffix() {
        let existing = ["25090001", "25090002"];
        assert_eq!(allocate_next_code("2509", existing).unwrap(), "25090003");

        let unordered = ["25090007", "25090002", "25090005"];
        assert_eq!(allocate_next_code("2509", unordered).unwrap(), "25090008");
    }

    #[test]
    fn test_other_months_are_ignored() {
        let existing = ["25080041", "25100003", "25090002"];
        assert_eq!(allocate_next_code("2509", existing).unwrap(), "25090003");

        assert_eq!(
            allocate_next_code("2511", existing).unwrap(),
            "25110001"
        );
    }

    #[test]
    fn test_legacy_marker_counts_towards_max() {
        let existing = ["L25090009", "25090003"];
        assert_eq!(allocate_next_code("2509", existing).unwrap(), "25090010");
    }

    #[test]
    fn test_malformed_suffixes_are_skipped() {
        let existing = ["2509ABCD", "250900", "250900123", "25090004", "X25090050"];
        assert_eq!(allocate_next_code("2509", existing).unwrap(), "25090005");
    }

    #[test]
    fn test_exhausted_scope() {
        let existing = ["25099999"];
        assert_eq!(
            allocate_next_code("2509", existing),
            Err(SequenceError::Exhausted {
                prefix: "2509".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(matches!(
            allocate_next_code("25.9", Vec::<&str>::new()),
            Err(SequenceError::InvalidPrefix(_))
        ));
        assert!(allocate_next_code("", Vec::<&str>::new()).is_err());
    }

    #[test]
    fn test_current_max() {
        assert_eq!(current_max("2509", Vec::<&str>::new()).unwrap(), None);
        assert_eq!(
            current_max("2509", ["25090012", "L25090004"]).unwrap(),
            Some(12)
        );
    }
}
