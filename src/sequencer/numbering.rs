//! Exhibit numbering derived from list position.

use crate::models::NumberingStyle;

/// Largest value with a standard Roman representation
const MAX_ROMAN: usize = 3999;

const ROMAN_TABLE: &[(usize, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Number for the item at zero-based `index`
pub fn number_at(index: usize, style: NumberingStyle) -> String {
    let n = index + 1;
    match style {
        NumberingStyle::Numbers => n.to_string(),
        NumberingStyle::Letters => to_letters(n),
        NumberingStyle::Roman => to_roman(n),
    }
}

/// Bijective base-26: 1 → A, 26 → Z, 27 → AA
pub fn to_letters(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Subtractive Roman numerals, decimal beyond 3999
pub fn to_roman(mut n: usize) -> String {
    if n == 0 || n > MAX_ROMAN {
        return n.to_string();
    }

    let mut out = String::new();
    for &(value, symbol) in ROMAN_TABLE {
        while n >= value {
            out.push_str(symbol);
            n -= value;
        }
    }
    out
}
