//! Authentication service that hands a short-lived, periodically rotating
//! identifier to signed-in clients only.
//!
//! - `auth`: registration, login, bearer tokens, session resolution
//! - `qr`: the rotating secret and its endpoint
//! - `app`: the axum router and server loop

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod qr;
pub mod state;
