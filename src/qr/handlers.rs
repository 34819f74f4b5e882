use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use time::OffsetDateTime;
use tracing::instrument;

use super::dto::QrResponse;
use crate::{auth::extractors::authorization_header, error::AuthError, state::AppState};

pub fn qr_routes() -> Router<AppState> {
    Router::new().route("/qr/current", get(current_qr))
}

#[instrument(skip(state, headers))]
pub async fn current_qr(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<QrResponse>, AuthError> {
    let snapshot = state
        .service
        .current_secret(authorization_header(&headers))
        .await?;

    Ok(Json(QrResponse {
        uuid: snapshot.value,
        timestamp: OffsetDateTime::now_utc(),
        generated_at: snapshot.generated_at,
    }))
}
