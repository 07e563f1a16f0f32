//! Field rules shared by the service and the HTTP layer.
//!
//! [`validate_fail_fast`] stops at the first failing field (name, then email,
//! then age). [`validate_collect_all`] reports every failing field at once.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
/// Matches the `users.email` column width
pub const EMAIL_MAX_CHARS: usize = 100;
pub const AGE_MIN: i32 = 0;
pub const AGE_MAX: i32 = 150;

pub const MSG_NAME_BLANK: &str = "Name must not be blank";
pub const MSG_NAME_LENGTH: &str = "Name must be between 2 and 100 characters";
pub const MSG_EMAIL_BLANK: &str = "Email must not be blank";
pub const MSG_EMAIL_FORMAT: &str = "Email format is invalid";
pub const MSG_EMAIL_LENGTH: &str = "Email must be at most 100 characters";
pub const MSG_AGE_RANGE: &str = "Age must be between 0 and 150";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap()
});

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Field name to message, ordered by field name
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

pub fn check_name(name: Option<&str>) -> Result<(), FieldError> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(FieldError::new("name", MSG_NAME_BLANK));
    }

    let chars = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&chars) {
        return Err(FieldError::new("name", MSG_NAME_LENGTH));
    }
    Ok(())
}

pub fn check_email(email: Option<&str>) -> Result<(), FieldError> {
    let email = email.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(FieldError::new("email", MSG_EMAIL_BLANK));
    }
    if email.chars().count() > EMAIL_MAX_CHARS {
        return Err(FieldError::new("email", MSG_EMAIL_LENGTH));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(FieldError::new("email", MSG_EMAIL_FORMAT));
    }
    Ok(())
}

/// Absent age is valid
pub fn check_age(age: Option<i32>) -> Result<(), FieldError> {
    match age {
        Some(age) if !(AGE_MIN..=AGE_MAX).contains(&age) => Err(FieldError::new("age", MSG_AGE_RANGE)),
        _ => Ok(()),
    }
}

/// Name, email, age in that order; the first failure wins.
pub fn validate_fail_fast(
    name: Option<&str>,
    email: Option<&str>,
    age: Option<i32>,
) -> Result<(), FieldError> {
    check_name(name)?;
    check_email(email)?;
    check_age(age)
}

/// Every failing field. Empty when the input is valid.
pub fn validate_collect_all(name: Option<&str>, email: Option<&str>, age: Option<i32>) -> FieldErrors {
    [check_name(name), check_email(email), check_age(age)]
        .into_iter()
        .filter_map(Result::err)
        .map(|e| (e.field, e.message))
        .collect()
}
