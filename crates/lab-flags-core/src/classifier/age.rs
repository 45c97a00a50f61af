//! Age calculation from report birth dates.

use chrono::{Datelike, NaiveDate};

use super::{ClassifierError, ClassifierResult};

/// Parse a `DD/MM/YYYY` birth date.
///
/// Surrounding whitespace is ignored. Days that do not exist on the calendar
/// ("31/02/1980") are rejected rather than rolled over.
pub fn parse_birth_date(text: &str) -> ClassifierResult<NaiveDate> {
    let invalid = || ClassifierError::InvalidBirthDate(text.to_string());

    let trimmed = text.trim();
    // chrono skips spaces before numeric fields.
    if trimmed.contains(char::is_whitespace) {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y").map_err(|_| invalid())
}

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

/// Age in whole years for a `DD/MM/YYYY` birth date as of `today`.
pub fn age_years(birth_date: &str, today: NaiveDate) -> ClassifierResult<i32> {
    Ok(age_on(parse_birth_date(birth_date)?, today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_birthday_passed() {
        assert_eq!(age_years("10/03/1980", date(2024, 6, 1)).unwrap(), 44);
    }

    #[test]
    fn test_birthday_not_yet_reached() {
        assert_eq!(age_years("10/09/1980", date(2024, 6, 1)).unwrap(), 43);
        assert_eq!(age_years("02/06/1980", date(2024, 6, 1)).unwrap(), 43);
    }

    #[test]
    fn test_birthday_today() {
        assert_eq!(age_years("01/06/1980", date(2024, 6, 1)).unwrap(), 44);
    }

    #[test]
    fn test_newborn() {
        assert_eq!(age_years("15/01/2024", date(2024, 6, 1)).unwrap(), 0);
    }

    #[test]
    fn test_leap_day_birth() {
        assert_eq!(age_years("29/02/2000", date(2023, 2, 28)).unwrap(), 22);
        assert_eq!(age_years("29/02/2000", date(2023, 3, 1)).unwrap(), 23);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let birth = parse_birth_date("  10/03/1980\n").unwrap();
        assert_eq!(birth, date(1980, 3, 10));
    }

    #[test]
    fn test_impossible_calendar_day_fails() {
        let err = age_years("29/02/2023", date(2024, 6, 1)).unwrap_err();
        assert_eq!(err, ClassifierError::InvalidBirthDate("29/02/2023".into()));
    }

    #[test]
    fn test_invalid_formats() {
        let today = date(2024, 6, 1);
        for bad in [
            "",
            "1980-03-10",
            "10/03",
            "aa/bb/cccc",
            "31/02/1980",
            "10/13/1980",
            "10/03/1980/1",
            "+1/+2/1980",
            " 10 / 03 / 1980",
        ] {
            assert!(
                matches!(age_years(bad, today), Err(ClassifierError::InvalidBirthDate(_))),
                "expected error for {:?}",
                bad
            );
        }
    }
}
