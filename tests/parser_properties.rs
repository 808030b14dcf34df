//! Property tests for header location and numeric coercion.

use bourse_core::map::parse_number;
use bourse_core::parse::parse_text;
use bourse_core::{Deadline, HeaderRules};
use proptest::prelude::*;

fn noise_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[0-9 ]{1,24}",
        "[0-9]{1,4}/[0-9]{1,2}/[0-9]{4}",
    ]
}

fn data_row() -> impl Strategy<Value = (String, u32, u32)> {
    ("[A-Z]{1,5}", 0u32..100_000, 0u32..1_000_000)
}

fn with_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::new();
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

proptest! {
    #[test]
    fn header_is_found_below_any_noise(
        noise in prop::collection::vec(noise_line(), 0..8),
        rows in prop::collection::vec(data_row(), 0..12),
    ) {
        let mut text = String::new();
        for line in &noise {
            text.push_str(line);
            text.push('\n');
        }
        text.push_str("Symbol;Last;Volume\n");
        for (symbol, last, volume) in &rows {
            text.push_str(&format!("{symbol};{last};{volume}\n"));
        }

        let table = parse_text(&text, &HeaderRules::default(), &Deadline::start(60_000))
            .expect("header located");

        prop_assert_eq!(table.columns, vec!["symbol", "last", "volume"]);
        let expected: Vec<Vec<String>> = rows
            .iter()
            .map(|(symbol, last, volume)| vec![symbol.clone(), last.to_string(), volume.to_string()])
            .collect();
        prop_assert_eq!(table.rows, expected);
    }

    #[test]
    fn displayed_floats_parse_back_exactly(value in -1.0e12f64..1.0e12) {
        prop_assert_eq!(parse_number(&value.to_string()), Some(value));
    }

    #[test]
    fn thousands_separators_never_change_the_value(value in 0u64..10_000_000_000) {
        prop_assert_eq!(parse_number(&with_thousands(value)), Some(value as f64));
    }

    #[test]
    fn sentinels_are_missing_whatever_the_padding(
        token in prop_oneof![Just("-"), Just("--"), Just(""), Just("n/a"), Just("NaN")],
        left in " {0,3}",
        right in " {0,3}",
    ) {
        prop_assert_eq!(parse_number(&format!("{left}{token}{right}")), None);
    }
}
