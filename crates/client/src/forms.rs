//! Client-side checks applied before a form is submitted
//!
//! The rules mirror the backend's request constraints so that obviously bad
//! input is rejected without a round trip. A form that fails here never
//! reaches the API client.

use crate::error::ClientError;
use crate::types::{RegisterRequest, ResetPasswordRequest, UpdateProfileRequest};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 255;
const MAX_NAME_LEN: usize = 100;
const MAX_TEXT_LEN: usize = 255;

static MOBILE_NO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+\-() ]{7,20}$").expect("mobile number pattern is valid"));

/// Field-level validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is mandatory")]
    Missing(&'static str),

    #[error("Email should be valid")]
    InvalidEmail,

    #[error("Mobile number must be between 7 to 20 digits")]
    InvalidMobileNo,

    #[error("{field} must be less than {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Password must be between 8 to 255 characters")]
    PasswordLength,

    #[error("Passwords do not match")]
    PasswordMismatch,
}

impl From<ValidationError> for ClientError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Registration form as filled in on the vendor portal
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub email: String,
    pub mobile_no: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Option<String>,
}

impl RegistrationForm {
    /// Check the form and turn it into the registration payload
    pub fn validate(&self) -> Result<RegisterRequest, ValidationError> {
        let first_name = required(&self.first_name, "First name")?;
        max_len(first_name, "First name", MAX_NAME_LEN)?;
        max_len(self.last_name.trim(), "Last name", MAX_NAME_LEN)?;
        max_len(self.company_name.trim(), "Company name", MAX_TEXT_LEN)?;
        let email = required(&self.email, "Email")?;
        max_len(email, "Email", MAX_TEXT_LEN)?;
        validate_email(email)?;
        let mobile_no = required(&self.mobile_no, "Mobile number")?;
        validate_mobile(mobile_no)?;

        validate_password(&self.password, "Password")?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }

        Ok(RegisterRequest {
            first_name: first_name.to_string(),
            last_name: self.last_name.trim().to_string(),
            company_name: self.company_name.trim().to_string(),
            email: email.to_string(),
            mobile_no: mobile_no.to_string(),
            password: self.password.clone(),
            role: self
                .role
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_uppercase),
        })
    }
}

impl UpdateProfileRequest {
    /// Check the mandatory profile fields
    pub fn validate(&self) -> Result<(), ValidationError> {
        max_len(required(&self.first_name, "First name")?, "First name", MAX_NAME_LEN)?;
        max_len(self.last_name.trim(), "Last name", MAX_NAME_LEN)?;
        max_len(self.company_name.trim(), "Company name", MAX_TEXT_LEN)?;
        validate_mobile(required(&self.mobile_no, "Mobile number")?)
    }
}

impl ResetPasswordRequest {
    /// Check the reset token and the new password
    pub fn validate(&self) -> Result<(), ValidationError> {
        required(&self.token, "Reset token")?;
        validate_password(&self.new_password, "New password")
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(value)
    }
}

fn max_len(value: &str, field: &'static str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        Err(ValidationError::TooLong { field, max })
    } else {
        Ok(())
    }
}

fn validate_password(password: &str, field: &'static str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    let len = password.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::PasswordLength)
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidEmail),
    }
}

fn validate_mobile(mobile_no: &str) -> Result<(), ValidationError> {
    if MOBILE_NO.is_match(mobile_no) {
        Ok(())
    } else {
        Err(ValidationError::InvalidMobileNo)
    }
}
