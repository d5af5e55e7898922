// Locale helpers for parsing and rendering Brazilian-formatted values.
//
// Sheet cells arrive as pre-formatted pt-BR strings ("R$ 1.234,56",
// "1.234", "01/03/2025"). Everything here is forgiving: bad input turns
// into zero or `None`, never into an error, so the rest of the code can
// assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a pt-BR number such as `"1.234,5"` into `1234.5`.
///
/// - Empty input, the literal `"0"` and the placeholder `"-"` yield `0`.
/// - `.` is a thousands separator and is dropped.
/// - The first `,` becomes the decimal point.
/// - Trailing junk after the numeric prefix is ignored (`"12,5%"` -> `12.5`).
/// - Anything without a numeric prefix yields `0`.
pub fn parse_br_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() || s == "0" || s == "-" {
        return 0.0;
    }
    let cleaned = s.replace('.', "").replacen(',', ".", 1);
    leading_float(&cleaned)
}

/// Same as [`parse_br_number`], but also strips every `R$` marker and the
/// whitespace around it (`"R$ 1.234,56"` -> `1234.56`, `"-R$ 10,00"` -> `-10`).
pub fn parse_br_currency(s: &str) -> f64 {
    let stripped: String = s.replace("R$", "").split_whitespace().collect();
    parse_br_number(&stripped)
}

/// Integer counters (impressions, clicks, views). Thousands separators are
/// removed and any fractional part is truncated: `"1.234,9"` -> `1234`.
pub fn parse_br_integer(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() || s == "0" || s == "-" {
        return 0.0;
    }
    leading_float(&s.replace('.', "")).trunc()
}

/// Parse a `DD/MM/YYYY` date.
///
/// Returns `None` unless the input has exactly three slash-separated numeric
/// parts forming a real calendar date. Callers must handle `None` before
/// comparing dates.
pub fn parse_br_date(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let year: i32 = parts[2].trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Accept either `DD/MM/YYYY` or ISO `YYYY-MM-DD`, so both bounds of a date
/// range end up in the same representation.
pub fn parse_any_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    parse_br_date(s).or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

// Longest prefix that looks like `[+-]digits[.digits]`, parsed as f64.
fn leading_float(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    let candidate = &s[..end];
    if end == digits_start || candidate == "." || candidate.ends_with("-.") {
        return 0.0;
    }
    match candidate.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Format with a fixed number of decimals and pt-BR separators
/// (`1234567.891` with 2 decimals -> `1.234.567,89`).
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::pt);
    if let Some(frac) = frac_part {
        res.push(',');
        res.push_str(frac);
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_brl(n: f64) -> String {
    format!("R$ {}", format_number(n, 2))
}

pub fn format_int(n: f64) -> String {
    format_number(n.round(), 0)
}

pub fn format_percent(n: f64) -> String {
    format!("{}%", format_number(n, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_with_symbol_and_separators() {
        assert!((parse_br_currency("R$ 1.234,56") - 1234.56).abs() < 1e-9);
        assert!((parse_br_currency("R$1.234,56") - 1234.56).abs() < 1e-9);
        assert!((parse_br_currency("  R$ 10,5 ") - 10.5).abs() < 1e-9);
        assert!((parse_br_currency("-R$ 10,00") + 10.0).abs() < 1e-9);
    }

    #[test]
    fn numbers_drop_thousands_separators() {
        assert_eq!(parse_br_number("1.234"), 1234.0);
        assert_eq!(parse_br_number("1.234.567"), 1234567.0);
        assert!((parse_br_number("12,5") - 12.5).abs() < 1e-9);
        assert!((parse_br_number("12,5%") - 12.5).abs() < 1e-9);
    }

    #[test]
    fn empty_zero_and_garbage_are_zero() {
        assert_eq!(parse_br_number(""), 0.0);
        assert_eq!(parse_br_number("0"), 0.0);
        assert_eq!(parse_br_number("-"), 0.0);
        assert_eq!(parse_br_number("n/a"), 0.0);
        assert_eq!(parse_br_currency("R$"), 0.0);
        assert_eq!(parse_br_currency(""), 0.0);
        assert_eq!(parse_br_integer("abc"), 0.0);
    }

    #[test]
    fn integers_truncate() {
        assert_eq!(parse_br_integer("1.234"), 1234.0);
        assert_eq!(parse_br_integer("1.234,9"), 1234.0);
    }

    #[test]
    fn dates_need_three_parts() {
        assert_eq!(
            parse_br_date("01/03/2025"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert_eq!(parse_br_date("1/3/2025"), NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(parse_br_date("2025-03-01"), None);
        assert_eq!(parse_br_date("01/03"), None);
        assert_eq!(parse_br_date("31/02/2025"), None);
        assert_eq!(parse_br_date(""), None);
    }

    #[test]
    fn any_date_accepts_iso() {
        assert_eq!(
            parse_any_date("2025-03-01"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert_eq!(
            parse_any_date("01/03/2025"),
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
    }

    #[test]
    fn formats_pt_br() {
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_int(1234567.4), "1.234.567");
        assert_eq!(format_percent(1.0), "1,00%");
        assert_eq!(format_number(-0.001, 2), "0,00");
        assert_eq!(format_number(-1500.0, 1), "-1.500,0");
    }
}
