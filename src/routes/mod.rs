pub mod user;

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
}

/// 存活检查
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { status: "ok" })
}
