use crate::IngestError;

const MISSING_TOKENS: [&str; 5] = ["", "-", "--", "n/a", "nan"];

/// Coerce a source cell to a number.
///
/// Thousands separators (`,`, spaces) are stripped first; sentinel tokens such as
/// `-` and the empty string are missing values, never zero.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
    {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|ch| !matches!(ch, ',' | ' ' | '\u{a0}' | '\u{202f}' | '\''))
        .collect();
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// [`parse_number`] with the field name attached to the failure.
pub(crate) fn coerce(field: &'static str, raw: &str) -> Result<f64, IngestError> {
    parse_number(raw).ok_or_else(|| IngestError::Parse {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_missing() {
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("  "), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn thousands_separators_are_stripped() {
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("12 345"), Some(12345.0));
        assert_eq!(parse_number("1\u{a0}000"), Some(1000.0));
        assert_eq!(parse_number("-3.25"), Some(-3.25));
    }

    #[test]
    fn garbage_is_missing() {
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert!(matches!(
            coerce("close", "x"),
            Err(IngestError::Parse { field: "close", .. })
        ));
    }
}
