use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            required, AuthResponse, ForgotPasswordRequest, LoginRequest, MeResponse,
            MessageResponse, RegisterRequest,
        },
        extractors::authorization_header,
    },
    error::AuthError,
    state::AppState,
};

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If the email exists, a password reset link has been sent";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload.map(|Json(v)| v).map_err(|rejection| {
        warn!(error = %rejection, "rejected request body");
        AuthError::InvalidInput(rejection.body_text())
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let payload = body(payload)?;
    let (Some(email), Some(password)) = (required(&payload.email), required(&payload.password))
    else {
        return Err(AuthError::InvalidInput(
            "Email and password are required".into(),
        ));
    };

    let session = state
        .service
        .register(email, password, payload.name.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token: session.token,
            user: session.user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    let payload = body(payload)?;
    let (Some(email), Some(password)) = (required(&payload.email), required(&payload.password))
    else {
        return Err(AuthError::InvalidInput(
            "Email and password are required".into(),
        ));
    };

    let session = state.service.login(email, password).await?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        token: session.token,
        user: session.user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AuthError> {
    let payload = body(payload)?;
    let Some(email) = required(&payload.email) else {
        return Err(AuthError::InvalidInput("Email is required".into()));
    };

    state.service.forgot_password(email).await?;

    Ok(Json(MessageResponse {
        message: FORGOT_PASSWORD_MESSAGE,
    }))
}

#[instrument(skip(state, headers))]
pub async fn get_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AuthError> {
    let user = state
        .service
        .current_user(authorization_header(&headers))
        .await?;

    Ok(Json(MeResponse { user: user.into() }))
}
