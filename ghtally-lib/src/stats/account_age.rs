use chrono::{Datelike, Months, NaiveDate};

/// Describe the calendar distance from `from` to `today`, e.g. `"8 years, 2 months, 1 day"`.
///
/// Zero components are left out, except that days are always shown when nothing else is.
/// On an anniversary (whole years only) a cake is appended. A `from` later than `today`
/// is described as `"0 days"`.
#[must_use]
pub fn age_descriptor(from: NaiveDate, today: NaiveDate) -> String {
    let (years, months, days) = calendar_difference(from, today);

    let mut parts = Vec::new();
    if years > 0 {
        parts.push(plural(years, "year"));
    }
    if months > 0 {
        parts.push(plural(months, "month"));
    }
    if days > 0 || parts.is_empty() {
        parts.push(plural(days, "day"));
    }

    let mut text = parts.join(", ");
    if months == 0 && days == 0 && years > 0 {
        text.push_str(" 🎂");
    }
    text
}

/// Whole years, remaining whole months and remaining days between two dates.
fn calendar_difference(from: NaiveDate, today: NaiveDate) -> (u32, u32, u32) {
    if today <= from {
        return (0, 0, 0);
    }

    let mut total_months = i64::from(today.year() - from.year()) * 12 + i64::from(today.month()) - i64::from(from.month());

    // Month arithmetic clamps to the end of the month, so Jan 31 to Feb 27 overshoots
    // and counts zero whole months.
    let mut anchor = add_months(from, total_months);
    while total_months > 0 && anchor.is_none_or(|a| a > today) {
        total_months -= 1;
        anchor = add_months(from, total_months);
    }

    let anchor = anchor.unwrap_or(from);
    let days = u32::try_from((today - anchor).num_days()).unwrap_or(0);
    let total_months = u32::try_from(total_months).unwrap_or(0);

    (total_months / 12, total_months % 12, days)
}

fn add_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(u32::try_from(months).ok()?))
}

fn plural(n: u32, unit: &str) -> String {
    if n == 1 { format!("{n} {unit}") } else { format!("{n} {unit}s") }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_descriptor() {
        assert_eq!(age_descriptor(date(2015, 6, 1), date(2023, 8, 2)), "8 years, 2 months, 1 day");
    }

    #[test]
    fn test_plurals() {
        assert_eq!(age_descriptor(date(2020, 1, 1), date(2021, 2, 3)), "1 year, 1 month, 2 days");
    }

    #[test]
    fn test_anniversary_gets_cake() {
        assert_eq!(age_descriptor(date(2002, 7, 5), date(2024, 7, 5)), "22 years 🎂");
    }

    #[test]
    fn test_month_boundary_without_days() {
        assert_eq!(age_descriptor(date(2020, 1, 15), date(2020, 3, 15)), "2 months");
    }

    #[test]
    fn test_days_only() {
        assert_eq!(age_descriptor(date(2024, 3, 1), date(2024, 3, 11)), "10 days");
    }

    #[test]
    fn test_same_day() {
        assert_eq!(age_descriptor(date(2024, 3, 1), date(2024, 3, 1)), "0 days");
    }

    #[test]
    fn test_future_start() {
        assert_eq!(age_descriptor(date(2030, 1, 1), date(2024, 3, 1)), "0 days");
    }

    #[test]
    fn test_end_of_month_start() {
        // Jan 31 + 1 month clamps to Feb 29 (2024), one day before Mar 1
        assert_eq!(age_descriptor(date(2024, 1, 31), date(2024, 3, 1)), "1 month, 1 day");
        assert_eq!(age_descriptor(date(2024, 1, 31), date(2024, 2, 28)), "28 days");
    }

    #[test]
    fn test_leap_day_birthday() {
        assert_eq!(age_descriptor(date(2020, 2, 29), date(2021, 2, 28)), "1 year 🎂");
    }
}
