use crate::error::AccountError;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};
use validator::Validate;

/// Response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: None,
        })
    }
}

pub(crate) fn error_response(err: &AccountError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.is_internal() {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, status = status.as_u16(), "Request rejected");
    }

    let body = ApiResponse::<()> {
        success: false,
        message: err.public_message(),
        data: None,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        error_response(&self)
    }
}

/// JSON body that has passed `validator` checks
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AccountError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AccountError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}
