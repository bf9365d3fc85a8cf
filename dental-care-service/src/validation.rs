use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use wizard_flow::{FieldError, age::parse_date};

static CANADIAN_POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ABCEGHJ-NPRSTVXY]\d[ABCEGHJ-NPRSTV-Z] ?\d[ABCEGHJ-NPRSTV-Z]\d$").unwrap()
});
static US_ZIP_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PHONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?[\s.-]?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}$").unwrap());

pub const MAX_NAME_LENGTH: usize = 100;
pub const CANADA: &str = "CAN";
pub const USA: &str = "USA";

/// Collects field errors while a form is checked.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, code: &str) {
        self.0.push(FieldError::new(field, code));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }

    /// Required non-empty text, trimmed.
    pub fn required_text(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(v.to_string()),
            None => {
                self.push(field, "required");
                None
            }
        }
    }

    pub fn name(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let name = self.required_text(field, value)?;
        if name.chars().count() > MAX_NAME_LENGTH {
            self.push(field, "too-long");
            return None;
        }
        if name.chars().any(|c| c.is_ascii_digit()) {
            self.push(field, "characters-invalid");
            return None;
        }
        Some(name)
    }

    pub fn sin(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let sin = self.required_text(field, value)?;
        match normalize_sin(&sin) {
            Some(sin) => Some(sin),
            None => {
                self.push(field, "invalid");
                None
            }
        }
    }

    /// ISO date that is not after `today`.
    pub fn past_date(&mut self, field: &str, value: Option<&str>, today: NaiveDate) -> Option<NaiveDate> {
        let raw = self.required_text(field, value)?;
        match parse_date(&raw) {
            Ok(date) if date > today => {
                self.push(field, "future");
                None
            }
            Ok(date) => Some(date),
            Err(_) => {
                self.push(field, "invalid");
                None
            }
        }
    }

    pub fn required_bool(&mut self, field: &str, value: Option<bool>) -> Option<bool> {
        if value.is_none() {
            self.push(field, "required");
        }
        value
    }

    /// Checkbox that must be ticked.
    pub fn accepted(&mut self, field: &str, value: Option<bool>) -> bool {
        let accepted = value == Some(true);
        if !accepted {
            self.push(field, "required");
        }
        accepted
    }
}

/// Digits of a valid social insurance number: nine digits passing the
/// Luhn check. Spaces and dashes are ignored.
pub fn normalize_sin(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if digits.len() != 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if digits.starts_with('0') || digits.starts_with('8') {
        return None;
    }
    luhn_valid(&digits).then_some(digits)
}

fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

pub fn is_valid_postal_code(country: &str, postal_code: &str) -> bool {
    let postal_code = postal_code.trim().to_uppercase();
    match country {
        CANADA => CANADIAN_POSTAL_CODE.is_match(&postal_code),
        USA => US_ZIP_CODE.is_match(&postal_code),
        _ => true,
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

pub fn is_valid_phone_number(phone: &str) -> bool {
    PHONE_NUMBER.is_match(phone.trim())
}

/// Deserialize a form body. Shape errors surface as a single form-level error.
pub fn parse_form<T: DeserializeOwned>(input: &Value) -> Result<T, Vec<FieldError>> {
    serde_json::from_value(input.clone()).map_err(|_| vec![FieldError::new("form", "invalid")])
}
