use super::response::{ApiResponse, ValidatedJson};
use super::AppState;
use crate::error::{AccountError, Result};
use crate::models::requests::{
    CheckOtpRequest, GetUserRequest, LoginRequest, NewOtpRequest, RegisterRequest,
    RemoveAccountRequest, ResetPinRequest, UpdatePinRequest, UpdateProfileRequest,
};
use crate::models::{AccountSummary, AuthResult, IssuedOtp, UserSummary};
use crate::security::Claims;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

type Reply<T> = Result<Json<ApiResponse<T>>>;

fn ensure_owner(claims: &Claims, phone: &str) -> Result<()> {
    if claims.phone == phone {
        Ok(())
    } else {
        Err(AccountError::Forbidden)
    }
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResult>>)> {
    let session = state
        .accounts
        .register(
            &req.first_name,
            &req.last_name,
            &req.phone_number,
            &req.pin,
            &req.device_token,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Account created successfully", session),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Reply<AuthResult> {
    let session = state
        .accounts
        .login(&req.phone_number, &req.pin, &req.device_token)
        .await?;

    Ok(ApiResponse::ok("Login successful", session))
}

pub async fn new_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<NewOtpRequest>,
) -> Reply<IssuedOtp> {
    let issued = state.accounts.new_otp(&req.phone_number).await?;
    Ok(ApiResponse::ok("OTP sent", issued))
}

pub async fn check_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CheckOtpRequest>,
) -> Reply<()> {
    state.accounts.check_otp(&req.otp()).await?;
    Ok(ApiResponse::message("OTP verified"))
}

pub async fn reset_pin(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPinRequest>,
) -> Reply<()> {
    state.accounts.reset_pin(&req.otp(), &req.new_pin).await?;
    Ok(ApiResponse::message("PIN reset successfully"))
}

pub async fn update_pin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<UpdatePinRequest>,
) -> Reply<()> {
    ensure_owner(&claims, &req.phone_number)?;
    state
        .accounts
        .update_pin(&req.otp(), &req.old_pin, &req.new_pin)
        .await?;
    Ok(ApiResponse::message("PIN updated successfully"))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Reply<UserSummary> {
    ensure_owner(&claims, &req.phone_number)?;
    let user = state
        .accounts
        .update_profile(&req.phone_number, &req.changes())
        .await?;
    Ok(ApiResponse::ok("Profile updated", user))
}

pub async fn remove_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<RemoveAccountRequest>,
) -> Reply<()> {
    ensure_owner(&claims, &req.phone_number)?;
    state.accounts.remove_account(&req.otp(), &req.pin).await?;
    Ok(ApiResponse::message("Account removed"))
}

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Reply<()> {
    state.accounts.sign_out(&claims).await?;
    Ok(ApiResponse::message("Successfully signed out"))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<GetUserRequest>,
) -> Reply<AccountSummary> {
    ensure_owner(&claims, &req.phone_number)?;
    let account = state.accounts.get_user(&req.phone_number).await?;
    Ok(ApiResponse::ok("User found", account))
}
