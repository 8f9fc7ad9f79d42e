/// HTTP API surface
///
/// Thin handlers over the session manager and query engine. Every success
/// response uses the same envelope so clients can branch on `success`.

pub mod channel;
pub mod session;

use axum::{Json, Router};
use serde::Serialize;

use crate::context::AppContext;

/// Success response envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: &str) -> Json<Self> {
        Json(Self {
            status_code: 200,
            data,
            message: message.to_string(),
            success: true,
        })
    }
}

/// Assemble all API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(session::routes())
        .merge(channel::routes())
}
