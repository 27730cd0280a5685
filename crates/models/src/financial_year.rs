//! Australian financial year helpers.
//!
//! A financial year is named by the calendar year it ends in:
//! FY2025 runs from 1 July 2024 to 30 June 2025.

use chrono::{Datelike, NaiveDate};

use crate::errors::ModelError;

pub const EARLIEST_FY: i32 = 2000;
pub const LATEST_FY: i32 = 2100;

pub fn financial_year_of(date: NaiveDate) -> i32 {
    if date.month() >= 7 { date.year() + 1 } else { date.year() }
}

/// First and last day (inclusive) of a financial year.
pub fn fy_bounds(fy: i32) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(fy.saturating_sub(1), 7, 1).unwrap_or(NaiveDate::MIN);
    let end = NaiveDate::from_ymd_opt(fy, 6, 30).unwrap_or(NaiveDate::MAX);
    (start, end)
}

/// `2025` -> `"2024-25"`
pub fn fy_label(fy: i32) -> String {
    format!("{}-{:02}", i64::from(fy) - 1, fy.rem_euclid(100))
}

pub fn validate_fy(fy: i32) -> Result<i32, ModelError> {
    if !(EARLIEST_FY..=LATEST_FY).contains(&fy) {
        return Err(ModelError::Validation(format!("financial_year {fy} out of range")));
    }
    Ok(fy)
}

/// Ensure `date` falls inside `fy`.
pub fn validate_date_in_fy(date: NaiveDate, fy: i32) -> Result<(), ModelError> {
    if financial_year_of(date) != fy {
        return Err(ModelError::Validation(format!(
            "date {date} is outside financial year {}",
            fy_label(fy)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

    #[test]
    fn july_starts_the_next_year() {
        assert_eq!(financial_year_of(d(2024, 6, 30)), 2024);
        assert_eq!(financial_year_of(d(2024, 7, 1)), 2025);
        assert_eq!(financial_year_of(d(2025, 1, 15)), 2025);
    }

    #[test]
    fn bounds_and_label() {
        assert_eq!(fy_bounds(2025), (d(2024, 7, 1), d(2025, 6, 30)));
        assert_eq!(fy_label(2025), "2024-25");
        assert_eq!(fy_label(2000), "1999-00");
    }

    #[test]
    fn date_must_sit_in_year() {
        assert!(validate_date_in_fy(d(2024, 8, 1), 2025).is_ok());
        assert!(validate_date_in_fy(d(2024, 6, 1), 2025).is_err());
        assert!(validate_fy(1990).is_err());
    }

    #[test]
    fn extreme_years_do_not_overflow() {
        assert!(fy_label(i32::MIN).starts_with("-2147483649-"));
        assert_eq!(fy_bounds(i32::MIN), (NaiveDate::MIN, NaiveDate::MAX));
        assert!(validate_fy(i32::MIN).is_err());
        assert!(validate_fy(i32::MAX).is_err());
    }
}
