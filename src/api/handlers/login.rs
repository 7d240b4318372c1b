use crate::{
    api::handlers::{
        error_response, session_cookie, MessageResponse, OtpRequiredResponse, UserResponse,
    },
    auth::{AuthService, LoginOutcome},
};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub user: UserResponse,
}

// No email-format rejection here: a format-based 400 would reveal which
// inputs can exist, while the contract for anything unknown is a single
// undifferentiated 401.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = LoginResponse),
        (status = 401, description = "Unknown email or wrong password", body = MessageResponse),
        (status = 403, description = "Password correct but email not verified; fresh OTP dispatched", body = OtpRequiredResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(service))]
pub async fn login(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service
        .login(&request.email, &request.password, Utc::now())
        .await
    {
        Ok(LoginOutcome::Session(session)) => {
            let mut headers = HeaderMap::new();
            match session_cookie(&session.token) {
                Ok(cookie) => {
                    headers.insert(SET_COOKIE, cookie);
                }
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string())
                        .into_response();
                }
            }

            let body = LoginResponse {
                user: UserResponse {
                    email: session.user.email,
                    is_verified: session.user.is_verified,
                },
            };
            (StatusCode::OK, headers, Json(body)).into_response()
        }
        Ok(LoginOutcome::VerificationRequired) => (
            StatusCode::FORBIDDEN,
            Json(OtpRequiredResponse {
                message: "Email not verified".to_string(),
                requires_otp: true,
            }),
        )
            .into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
