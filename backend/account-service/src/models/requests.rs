//! Inbound request bodies. Each one is validated before it reaches a service.

use super::{OtpTuple, ProfileChanges};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============ Registration / Login ============

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 2, max = 100, message = "First name must be between 2-100 characters"),
        custom(function = "crate::validators::validate_name_validator")
    )]
    pub first_name: String,
    #[validate(
        length(min = 2, max = 100, message = "Last name must be between 2-100 characters"),
        custom(function = "crate::validators::validate_name_validator")
    )]
    pub last_name: String,
    #[validate(custom(function = "crate::validators::validate_phone_validator"))]
    pub phone_number: String,
    #[validate(custom(function = "crate::validators::validate_pin_validator"))]
    pub pin: String,
    #[validate(must_match(other = "pin", message = "PINs do not match"))]
    pub confirm_pin: String,
    #[validate(length(min = 10, max = 100, message = "Device token must be between 10-100 characters"))]
    pub device_token: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "crate::validators::validate_phone_validator"))]
    pub phone_number: String,
    #[validate(custom(function = "crate::validators::validate_pin_validator"))]
    pub pin: String,
    #[validate(length(min = 10, max = 100, message = "Device token must be between 10-100 characters"))]
    pub device_token: String,
}

// ============ OTP ============

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewOtpRequest {
    #[validate(custom(function = "crate::validators::validate_phone_validator"))]
    pub phone_number: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CheckOtpRequest {
    #[validate(custom(function = "crate::validators::validate_phone_validator"))]
    pub phone_number: String,
    #[validate(custom(function = "crate::validators::validate_otp_code_validator"))]
    pub code: String,
    pub key_uid: Uuid,
}

impl CheckOtpRequest {
    pub fn otp(&self) -> OtpTuple {
        OtpTuple::new(&self.phone_number, &self.code, self.key_uid)
    }
}

// ============ PIN ============

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResetPinRequest {
    #[validate(custom(function = "crate::validators::validate_phone_validator"))]
    pub phone_number: String,
    #[validate(custom(function = "crate::validators::validate_pin_validator"))]
    pub new_pin: String,
    #[validate(must_match(other = "new_pin", message = "PINs do not match"))]
    pub confirm_pin: String,
    #[validate(custom(function = "crate::validators::validate_otp_code_validator"))]
    pub code: String,
    pub key_uid: Uuid,
}

impl ResetPinRequest {
    pub fn otp(&self) -> OtpTuple {
        OtpTuple::new(&self.phone_number, &self.code, self.key_uid)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdatePinRequest {
    #[validate(custom(function = "crate::validators::validate_phone_validator"))]
    pub phone_number: String,
    #[validate(custom(function = "crate::validators::validate_pin_validator"))]
    pub old_pin: String,
    #[validate(custom(function = "crate::validators::validate_pin_validator"))]
    pub new_pin: String,
    #[validate(must_match(other = "new_pin", message = "PINs do not match"))]
    pub confirm_pin: String,
    #[validate(custom(function = "crate::validators::validate_otp_code_validator"))]
    pub code: String,
    pub key_uid: Uuid,
}

impl UpdatePinRequest {
    pub fn otp(&self) -> OtpTuple {
        OtpTuple::new(&self.phone_number, &self.code, self.key_uid)
    }
}

// ============ Account ============

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RemoveAccountRequest {
    #[validate(custom(function = "crate::validators::validate_phone_validator"))]
    pub phone_number: String,
    #[validate(custom(function = "crate::validators::validate_pin_validator"))]
    pub pin: String,
    #[validate(custom(function = "crate::validators::validate_otp_code_validator"))]
    pub code: String,
    pub key_uid: Uuid,
}

impl RemoveAccountRequest {
    pub fn otp(&self) -> OtpTuple {
        OtpTuple::new(&self.phone_number, &self.code, self.key_uid)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct GetUserRequest {
    #[validate(custom(function = "crate::validators::validate_phone_validator"))]
    pub phone_number: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(custom(function = "crate::validators::validate_phone_validator"))]
    pub phone_number: String,
    #[serde(default)]
    #[validate(
        length(min = 2, max = 100, message = "First name must be between 2-100 characters"),
        custom(function = "crate::validators::validate_name_validator")
    )]
    pub first_name: Option<String>,
    #[serde(default)]
    #[validate(
        length(min = 2, max = 100, message = "Last name must be between 2-100 characters"),
        custom(function = "crate::validators::validate_name_validator")
    )]
    pub last_name: Option<String>,
    #[serde(default)]
    #[validate(url(message = "Photo must be a valid URL"))]
    pub photo: Option<String>,
    #[serde(default)]
    pub face_id: Option<bool>,
    #[serde(default)]
    pub finger_print: Option<bool>,
}

impl UpdateProfileRequest {
    pub fn changes(&self) -> ProfileChanges {
        ProfileChanges {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            photo: self.photo.clone(),
            face_id: self.face_id,
            finger_print: self.finger_print,
        }
    }
}
