//! Column letters and sheet-qualified cell references.

/// Characters that force a sheet name to be quoted in a cell reference.
const QUOTE_TRIGGERS: &[char] = &[' ', '-', '!', '@', '#', '$', '%', '^', '&', '*', '(', ')'];

/// 1-based column index to spreadsheet letters: 1 → `A`, 27 → `AA`, 702 → `ZZ`.
///
/// Returns an empty string for 0.
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = ((col - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Inverse of [`column_letters`]; case-insensitive. `None` for empty or non-alphabetic input.
pub fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut value: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }
    Some(value)
}

pub fn needs_quoting(sheet: &str) -> bool {
    sheet.chars().any(|c| QUOTE_TRIGGERS.contains(&c))
}

/// `Sheet1!B2`, or `'Q1 2024'!AB5` when the sheet name needs quoting.
pub fn cell_reference(sheet: &str, col_letters: &str, row: u32) -> String {
    if needs_quoting(sheet) {
        format!("'{sheet}'!{col_letters}{row}")
    } else {
        format!("{sheet}!{col_letters}{row}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_columns() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(28), "AB");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_letters(0), "");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(column_number(""), None);
        assert_eq!(column_number("A1"), None);
        assert_eq!(column_number("ab"), Some(28));
    }

    #[test]
    fn references_quote_special_sheet_names() {
        assert_eq!(cell_reference("Sheet1", "B", 2), "Sheet1!B2");
        assert_eq!(cell_reference("Q1 2024", &column_letters(28), 5), "'Q1 2024'!AB5");
        assert_eq!(cell_reference("P&L", "A", 1), "'P&L'!A1");
        assert_eq!(cell_reference("north-east", "C", 9), "'north-east'!C9");
        assert_eq!(cell_reference("Data_2024", "C", 9), "Data_2024!C9");
    }

    proptest! {
        #[test]
        fn letters_round_trip(n in 1u32..=701) {
            prop_assert_eq!(column_number(&column_letters(n)), Some(n));
        }

        #[test]
        fn letters_are_uppercase_ascii(n in 1u32..=16_384) {
            let letters = column_letters(n);
            prop_assert!(!letters.is_empty());
            prop_assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
        }
    }
}
