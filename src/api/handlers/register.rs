use crate::{
    api::handlers::{error_response, valid_email, MessageResponse, OtpRequiredResponse},
    auth::AuthService,
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct RegisterRequest {
    email: String,
    password: String,
}

// Request bodies carry passwords; keep them out of instrument output.
impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful, OTP dispatched", body = OtpRequiredResponse),
        (status = 400, description = "Email already registered or invalid payload", body = MessageResponse),
        (status = 500, description = "Store or notification failure", body = MessageResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(service))]
pub async fn register(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if !valid_email(&request.email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    if request.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Invalid password".to_string()).into_response();
    }

    match service
        .register(&request.email, &request.password, Utc::now())
        .await
    {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(OtpRequiredResponse {
                message: "Registration successful. Please verify your email.".to_string(),
                requires_otp: outcome.requires_otp,
            }),
        )
            .into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
