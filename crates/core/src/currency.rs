//! Dollar formatting with thousands separators.

/// Format a value as `$1,234,567.89`.
///
/// Negative values keep the sign after the dollar sign (`$-5.00`).
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return format!("${}", value);
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let negative = value.is_sign_negative() && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0');

    format!(
        "${}{}.{}",
        if negative { "-" } else { "" },
        group_thousands(int_part),
        frac_part
    )
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
