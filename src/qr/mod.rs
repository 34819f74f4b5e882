use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod rotation;

pub fn router() -> Router<AppState> {
    handlers::qr_routes()
}
