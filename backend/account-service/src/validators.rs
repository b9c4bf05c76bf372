use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Input validation for account requests

// E.164: '+', a non-zero leading digit, 11-14 characters overall
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9][0-9]{9,12}$").expect("hardcoded phone regex is invalid - fix source code")
});

static PIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}$").expect("hardcoded PIN regex is invalid - fix source code"));

static OTP_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4,8}$").expect("hardcoded OTP regex is invalid - fix source code")
});

static NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\p{L}[\p{L} '\-]*$").expect("hardcoded name regex is invalid - fix source code")
});

pub fn validate_phone(phone: &str) -> bool {
    PHONE_REGEX.is_match(phone)
}

pub fn validate_pin_format(pin: &str) -> bool {
    PIN_REGEX.is_match(pin)
}

pub fn validate_otp_code(code: &str) -> bool {
    OTP_CODE_REGEX.is_match(code)
}

pub fn validate_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

/// validator crate compatible custom validators
pub fn validate_phone_validator(phone: &str) -> Result<(), ValidationError> {
    if validate_phone(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone_number"))
    }
}

pub fn validate_pin_validator(pin: &str) -> Result<(), ValidationError> {
    if validate_pin_format(pin) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_pin"))
    }
}

pub fn validate_otp_code_validator(code: &str) -> Result<(), ValidationError> {
    if validate_otp_code(code) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_otp_code"))
    }
}

pub fn validate_name_validator(name: &str) -> Result<(), ValidationError> {
    if validate_name(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_name"))
    }
}

/// Mask a phone number for logs, keeping the last four digits
pub fn mask_phone(phone: &str) -> String {
    if phone.chars().count() <= 4 {
        return "****".to_string();
    }
    let mut visible: Vec<char> = phone.chars().rev().take(4).collect();
    visible.reverse();
    format!("****{}", visible.into_iter().collect::<String>())
}
