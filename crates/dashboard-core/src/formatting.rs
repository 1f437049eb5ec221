use chrono::NaiveDate;

use crate::dates::Locale;

/// Shown where a date is absent.
pub const NO_DATE: &str = "—";

/// Format a floating-point number with locale thousands/decimal separators
/// and a fixed number of decimal places.
///
/// # Examples
///
/// ```
/// use dashboard_core::dates::Locale;
/// use dashboard_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1, Locale::En), "1,234.5");
/// assert_eq!(format_number(1234.5, 1, Locale::PtBr), "1.234,5");
/// assert_eq!(format_number(0.0, 2, Locale::En), "0.00");
/// ```
pub fn format_number(value: f64, decimals: u32, locale: Locale) -> String {
    let (thousands, decimal) = locale.separators();
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a relative epsilon so exact binary midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let grouped = group_thousands(&integer_part.to_string(), thousands);

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", rounded - rounded.trunc(), prec = decimals as usize);
        // "0.50" → "50"
        format!("{}{}{}", grouped, decimal, &frac_str[2..])
    };

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a row count: `1234` → `"1,234"` (en) or `"1.234"` (pt-BR).
pub fn format_count(count: usize, locale: Locale) -> String {
    group_thousands(&count.to_string(), locale.separators().0)
}

/// Format a percentage with one decimal place: `"12.5%"` / `"12,5%"`.
pub fn format_percent(value: f64, locale: Locale) -> String {
    format!("{}%", format_number(value, 1, locale))
}

/// Format a date as `dd/mm/yyyy` (pt-BR) or ISO (en); absent → [`NO_DATE`].
pub fn format_date(date: Option<NaiveDate>, locale: Locale) -> String {
    match (date, locale) {
        (None, _) => NO_DATE.to_string(),
        (Some(d), Locale::PtBr) => d.format("%d/%m/%Y").to_string(),
        (Some(d), Locale::En) => d.format("%Y-%m-%d").to_string(),
    }
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero.
///
/// ```
/// use dashboard_core::formatting::percentage;
///
/// assert!((percentage(50.0, 200.0, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0.0, 0.0, 2), 0.0);
/// ```
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert `separator` every three digits from the right of an integer string.
fn group_thousands(s: &str, separator: char) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(separator);
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
