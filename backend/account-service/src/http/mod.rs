//! HTTP surface (axum)
//!
//! Every response uses the `{success, message, data?}` envelope. Routes that
//! act on an existing account require a bearer token whose `phone` claim
//! matches the phone number in the body.

mod auth;
mod handlers;
mod response;

pub use auth::require_auth;
pub use response::{ApiResponse, ValidatedJson};

use crate::security::TokenIssuer;
use crate::services::AccountService;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(accounts: AccountService) -> Self {
        let tokens = Arc::new(accounts.tokens().clone());
        Self {
            accounts: Arc::new(accounts),
            tokens,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let open = Router::new()
        .route("/healthz", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/new-otp", post(handlers::new_otp))
        .route("/check-otp", post(handlers::check_otp))
        .route("/reset-pin", post(handlers::reset_pin));

    let authenticated = Router::new()
        .route("/update-pin", post(handlers::update_pin))
        .route("/update-profile", post(handlers::update_profile))
        .route("/remove-account", post(handlers::remove_account))
        .route("/user", post(handlers::get_user))
        .route("/sign-out", post(handlers::sign_out))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api/v1", open.merge(authenticated))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    response::error_response(&crate::error::AccountError::Internal(detail))
}
