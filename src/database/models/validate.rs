use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;

pub static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("valid email pattern")
});

pub static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://\w([\w.-]*\w)?(:\d{2,5})?([/?#]\S*)?$")
        .expect("valid url pattern")
});

/// Collects every failed rule of one payload into a single 400
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(message.into());
        }
        self
    }

    /// Present and not blank
    pub fn required(&mut self, value: Option<&str>, message: &str) -> &mut Self {
        self.check(value.is_some_and(|v| !v.trim().is_empty()), message)
    }

    /// Only checked when the value is present
    pub fn max_chars(&mut self, value: Option<&str>, max: usize, message: &str) -> &mut Self {
        self.check(value.map_or(true, |v| v.chars().count() <= max), message)
    }

    pub fn matches(&mut self, value: Option<&str>, re: &Regex, message: &str) -> &mut Self {
        self.check(value.map_or(true, |v| re.is_match(v.trim())), message)
    }

    pub fn one_of(&mut self, value: Option<&str>, allowed: &[&str], message: &str) -> &mut Self {
        self.check(value.map_or(true, |v| allowed.contains(&v)), message)
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(std::mem::take(&mut self.errors)))
        }
    }
}

/// Trimmed copy of an optional string field
pub fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|v| v.trim().to_string())
}
