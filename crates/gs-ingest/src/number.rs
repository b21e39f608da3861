//! Locale-tolerant amount parsing.
//!
//! Spreadsheets exported from German and English locales disagree on which
//! of `,` and `.` is the decimal mark.  [`parse_amount`] accepts both:
//!
//! | Input          | Value      | Rule                                   |
//! |----------------|------------|----------------------------------------|
//! | `1.000,50`     | `1000.5`   | both present: the later one is decimal |
//! | `1,000.50`     | `1000.5`   | both present: the later one is decimal |
//! | `12,5`         | `12.5`     | sole comma + 1–2 digits: decimal       |
//! | `35,000`       | `35000`    | comma + 3 digits: thousands            |
//! | `1,234,56`     | `1234.56`  | several commas, last + 1–2 digits      |
//! | `1.000.000`    | `1000000`  | several dots, 3-digit groups           |
//! | `1.5`          | `1.5`      | otherwise the dot is decimal           |
//! | `50 000 €`     | `50000`    | spaces and `€` are stripped            |

/// Parse a user-supplied amount. Returns `None` for empty, malformed or
/// non-finite input.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '€' | ' ' | '\u{a0}'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                join_last_as_decimal(&cleaned.replace('.', ""), ',')
            } else {
                join_last_as_decimal(&cleaned.replace(',', ""), '.')
            }
        }
        (Some(comma), None) => {
            let after = &cleaned[comma + 1..];
            if is_short_fraction(after) {
                join_last_as_decimal(&cleaned, ',')
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(_)) => {
            if cleaned.matches('.').count() > 1 && has_thousands_groups(&cleaned, '.') {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };

    let value: f64 = normalized.parse().ok()?;
    value.is_finite().then_some(value)
}

/// 1–2 ASCII digits.
fn is_short_fraction(s: &str) -> bool {
    (1..=2).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Treat the last `sep` as the decimal point and drop all earlier ones.
fn join_last_as_decimal(s: &str, sep: char) -> String {
    match s.rfind(sep) {
        Some(pos) => {
            let integer: String = s[..pos].chars().filter(|c| *c != sep).collect();
            format!("{}.{}", integer, &s[pos + sep.len_utf8()..])
        }
        None => s.to_string(),
    }
}

/// `true` if every group after the first is exactly three digits.
fn has_thousands_groups(s: &str, sep: char) -> bool {
    let mut groups = s.split(sep);
    let lead_ok = groups
        .next()
        .map(|g| {
            let g = g.strip_prefix('-').unwrap_or(g);
            (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit())
        })
        .unwrap_or(false);
    lead_ok && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_numbers() {
        assert_eq!(parse_amount("50000"), Some(50_000.0));
        assert_eq!(parse_amount(" 120 "), Some(120.0));
        assert_eq!(parse_amount("0"), Some(0.0));
        assert_eq!(parse_amount("-3"), Some(-3.0));
    }

    #[test]
    fn german_format() {
        assert_eq!(parse_amount("1.000,50"), Some(1_000.5));
        assert_eq!(parse_amount("1.234.567,89"), Some(1_234_567.89));
        assert_eq!(parse_amount("12,5"), Some(12.5));
        assert_eq!(parse_amount("12,50 €"), Some(12.5));
    }

    #[test]
    fn english_format() {
        assert_eq!(parse_amount("1,000.50"), Some(1_000.5));
        assert_eq!(parse_amount("35,000"), Some(35_000.0));
        assert_eq!(parse_amount("1,234,567"), Some(1_234_567.0));
    }

    #[test]
    fn several_commas_with_short_tail() {
        assert_eq!(parse_amount("1,234,56"), Some(1_234.56));
    }

    #[test]
    fn dots_only() {
        assert_eq!(parse_amount("1.5"), Some(1.5));
        assert_eq!(parse_amount("1.000"), Some(1.0));
        assert_eq!(parse_amount("1.000.000"), Some(1_000_000.0));
        assert_eq!(parse_amount("1.2.3"), None);
    }

    #[test]
    fn currency_and_spaces_are_stripped() {
        assert_eq!(parse_amount("50 000 €"), Some(50_000.0));
        assert_eq!(parse_amount("€1.000,00"), Some(1_000.0));
        assert_eq!(parse_amount("50\u{a0}000"), Some(50_000.0));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("€"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("NaN"), None);
    }
}
