use crate::{
    api::handlers::{error_response, MessageResponse},
    auth::AuthService,
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendOtpRequest {
    email: String,
}

#[utoipa::path(
    post,
    path = "/auth/resend-otp",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "Replacement OTP dispatched", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 500, description = "Notification failure", body = MessageResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(service))]
pub async fn resend_otp(
    service: Extension<Arc<AuthService>>,
    payload: Option<Json<ResendOtpRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    match service.resend_otp(&request.email, Utc::now()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "OTP resent successfully".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(&err).into_response(),
    }
}
