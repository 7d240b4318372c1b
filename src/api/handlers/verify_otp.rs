use crate::{
    api::handlers::{error_response, session_cookie, MessageResponse, UserResponse},
    auth::AuthService,
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

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    email: String,
    code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpResponse {
    pub message: String,
    pub user: UserResponse,
}

#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified, session cookie set", body = VerifyOtpResponse),
        (status = 400, description = "No challenge, expired, or wrong code", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(service))]
pub async fn verify_otp(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service
        .verify_otp(&request.email, &request.code, Utc::now())
        .await
    {
        Ok(session) => {
            let mut headers = HeaderMap::new();
            match session_cookie(&session.token) {
                Ok(cookie) => {
                    headers.insert(SET_COOKIE, cookie);
                }
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Verification failed".to_string(),
                    )
                        .into_response();
                }
            }

            let body = VerifyOtpResponse {
                message: "Email verified successfully".to_string(),
                user: UserResponse {
                    email: session.user.email,
                    is_verified: session.user.is_verified,
                },
            };
            (StatusCode::OK, headers, Json(body)).into_response()
        }
        Err(err) => error_response(&err).into_response(),
    }
}
