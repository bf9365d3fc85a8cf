use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WizardError};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Age bracket driving eligibility branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeCategory {
    Children,
    Youth,
    Adults,
    Seniors,
}

impl AgeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeCategory::Children => "children",
            AgeCategory::Youth => "youth",
            AgeCategory::Adults => "adults",
            AgeCategory::Seniors => "seniors",
        }
    }
}

/// Classify an age in years. Each bracket includes its lower bound.
pub fn age_category_from_age(age: f64) -> Result<AgeCategory> {
    if age.is_nan() || age < 0.0 {
        return Err(WizardError::InvalidArgument(format!(
            "age must be a non-negative number, got {age}"
        )));
    }

    let category = if age < 16.0 {
        AgeCategory::Children
    } else if age < 18.0 {
        AgeCategory::Youth
    } else if age < 65.0 {
        AgeCategory::Adults
    } else {
        AgeCategory::Seniors
    };
    Ok(category)
}

/// Completed years between `date_of_birth` and `today`.
///
/// A birthday counts on the day itself, so someone born 1959-01-01 is 65 on
/// 2024-01-01. Negative when the birth date lies in the future.
pub fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        WizardError::InvalidArgument(format!("invalid date '{value}', expected yyyy-MM-dd: {e}"))
    })
}

pub fn age_category_from_date_of_birth(date_of_birth: &str, today: NaiveDate) -> Result<AgeCategory> {
    let date_of_birth = parse_date(date_of_birth)?;
    age_category_from_age(f64::from(age_in_years(date_of_birth, today)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        parse_date(value).unwrap()
    }

    #[test]
    fn test_brackets_partition_at_boundaries() {
        let cases = [
            (0.0, AgeCategory::Children),
            (15.9999, AgeCategory::Children),
            (16.0, AgeCategory::Youth),
            (17.9999, AgeCategory::Youth),
            (18.0, AgeCategory::Adults),
            (64.9999, AgeCategory::Adults),
            (65.0, AgeCategory::Seniors),
            (104.0, AgeCategory::Seniors),
        ];
        for (age, expected) in cases {
            assert_eq!(age_category_from_age(age).unwrap(), expected, "age {age}");
        }
    }

    #[test]
    fn test_negative_age_is_rejected_with_value() {
        let err = age_category_from_age(-1.5).unwrap_err();
        assert!(matches!(err, WizardError::InvalidArgument(_)));
        assert!(err.to_string().contains("-1.5"));
    }

    #[test]
    fn test_birthday_counts_on_the_day() {
        let dob = date("1959-01-01");
        assert_eq!(age_in_years(dob, date("2024-01-01")), 65);
        assert_eq!(age_in_years(dob, date("2023-12-31")), 64);
        assert_eq!(
            age_category_from_date_of_birth("1959-01-01", date("2024-01-01")).unwrap(),
            AgeCategory::Seniors
        );
        assert_eq!(
            age_category_from_date_of_birth("1959-01-01", date("2023-12-31")).unwrap(),
            AgeCategory::Adults
        );
    }

    #[test]
    fn test_leap_day_birthday() {
        let dob = date("2008-02-29");
        assert_eq!(age_in_years(dob, date("2026-02-28")), 17);
        assert_eq!(age_in_years(dob, date("2026-03-01")), 18);
    }

    #[test]
    fn test_future_birth_date_is_invalid() {
        let result = age_category_from_date_of_birth("2030-05-01", date("2026-01-01"));
        assert!(matches!(result, Err(WizardError::InvalidArgument(_))));
    }

    #[test]
    fn test_malformed_date_is_invalid() {
        assert!(age_category_from_date_of_birth("01/02/1990", date("2026-01-01")).is_err());
    }
}
