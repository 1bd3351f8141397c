//! Input-boundary normalisation.
//!
//! Raw form text becomes either a finite number or unset before it reaches
//! a draft. NaN and infinities never cross this boundary.

use thiserror::Error;

use crate::draft::Field;

#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error("unknown field {0:?} (expected weight, reps or sets)")]
    UnknownField(String),
}

/// Normalise raw text into a draft field value.
///
/// Empty or whitespace-only text is unset. Anything that does not parse to
/// a finite number (`"e"`, `"-"`, `"inf"`, `"NaN"`) is also unset.
pub fn parse_field_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a field name from user input.
pub fn parse_field(raw: &str) -> Result<Field, InputError> {
    Field::parse(raw).ok_or_else(|| InputError::UnknownField(raw.to_string()))
}

/// Value as it was recorded server-side: a string that must be a positive
/// finite number to count.
pub fn parse_recorded_value(raw: &str) -> Option<f64> {
    parse_field_value(raw).filter(|v| *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_unset() {
        assert_eq!(parse_field_value(""), None);
        assert_eq!(parse_field_value("   "), None);
    }

    #[test]
    fn numbers_parse() {
        assert_eq!(parse_field_value("100"), Some(100.0));
        assert_eq!(parse_field_value(" 62.5 "), Some(62.5));
        assert_eq!(parse_field_value("0"), Some(0.0));
    }

    #[test]
    fn partial_entries_are_unset() {
        assert_eq!(parse_field_value("-"), None);
        assert_eq!(parse_field_value("e"), None);
        assert_eq!(parse_field_value("1e"), None);
    }

    #[test]
    fn non_finite_is_unset() {
        assert_eq!(parse_field_value("inf"), None);
        assert_eq!(parse_field_value("NaN"), None);
        assert_eq!(parse_field_value("1e400"), None);
    }

    #[test]
    fn recorded_values_must_be_positive() {
        assert_eq!(parse_recorded_value("100"), Some(100.0));
        assert_eq!(parse_recorded_value("0"), None);
        assert_eq!(parse_recorded_value("-5"), None);
        assert_eq!(parse_recorded_value("abc"), None);
    }

    #[test]
    fn unknown_field_errors() {
        assert_eq!(parse_field("reps"), Ok(Field::Reps));
        assert_eq!(
            parse_field("volume"),
            Err(InputError::UnknownField("volume".into()))
        );
    }
}
