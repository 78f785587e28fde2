/// Format a count with comma thousands separators, e.g. `1234567` as `"1,234,567"`.
#[must_use]
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Like [`format_count`], with a leading minus sign for negative values.
#[must_use]
pub fn format_signed(value: i64) -> String {
    let magnitude = format_count(value.unsigned_abs());
    if value < 0 { format!("-{magnitude}") } else { magnitude }
}
