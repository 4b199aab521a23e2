//! Field and form validation run before anything is sent to the server.
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::{Category, Product, User};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

// Indonesian mobile numbers: +62, 62 or a leading 0, then 9-12 digits.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+62|62|0)[0-9]{9,12}$").expect("valid phone regex"));

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Additive strength score in `0..=100`.
pub fn password_strength(password: &str) -> u8 {
    let len = password.chars().count();
    let mut score = 0u8;
    if len >= 8 {
        score += 25;
    }
    if len >= 12 {
        score += 25;
    }
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 15;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 15;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 10;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 10;
    }
    score
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

impl PasswordStrength {
    pub fn from_score(score: u8) -> Self {
        if score < 40 {
            PasswordStrength::Weak
        } else if score < 70 {
            PasswordStrength::Medium
        } else {
            PasswordStrength::Strong
        }
    }

    pub fn of(password: &str) -> Self {
        Self::from_score(password_strength(password))
    }

    pub fn label(&self) -> &'static str {
        match self {
            PasswordStrength::Weak => "Weak",
            PasswordStrength::Medium => "Medium",
            PasswordStrength::Strong => "Strong",
        }
    }
}

/// Checks a record before it is created or updated.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;

    /// Creation can be stricter than update (e.g. a password is mandatory).
    fn validate_new(&self) -> Result<(), ValidationError> {
        self.validate()
    }
}

fn require(field: &'static str, value: &str, label: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, format!("{} is required", label)));
    }
    Ok(())
}

fn check_password(field: &'static str, password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            field,
            format!("password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

impl Validate for Product {
    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name, "product name")?;
        require("category", &self.category, "category")?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::new("price", "price must be zero or more"));
        }
        if self.stock < 0 {
            return Err(ValidationError::new("stock", "stock must be zero or more"));
        }
        Ok(())
    }
}

impl Validate for Category {
    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name, "category name")
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name, "name")?;
        require("username", &self.username, "username")?;
        if !is_valid_email(&self.email) {
            return Err(ValidationError::new("email", "email address is not valid"));
        }
        if let Some(phone) = self.phone.as_deref().filter(|p| !p.is_empty()) {
            if !is_valid_phone(phone) {
                return Err(ValidationError::new("phone", "phone number is not valid"));
            }
        }
        if self.role().is_none() {
            return Err(ValidationError::new("role", "role must be admin or user"));
        }
        if let Some(password) = &self.password {
            check_password("password", password)?;
        }
        Ok(())
    }

    fn validate_new(&self) -> Result<(), ValidationError> {
        if self.password.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::new("password", "password is required"));
        }
        self.validate()
    }
}

/// Change-password form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl Validate for PasswordChange {
    fn validate(&self) -> Result<(), ValidationError> {
        require("old_password", &self.old_password, "current password")?;
        if self.new_password != self.confirm_password {
            return Err(ValidationError::new(
                "confirm_password",
                "new password and confirmation do not match",
            ));
        }
        check_password("new_password", &self.new_password)
    }
}
