use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cache::CacheError;
use crate::cache::operations::session::SessionError;
use crate::context::ContextError;
use crate::database::StoreError;
use crate::result::ApiResult;
use crate::utils::error_codes;

/// 对外错误分类，每个错误带一个分类码和一段可读原因
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// 响应体中的业务错误码
    pub fn code(&self) -> i32 {
        match self {
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::Conflict(_) => error_codes::USER_EXISTS,
            AppError::Unauthenticated(_) => error_codes::AUTH_FAILED,
            AppError::InvalidArgument(_) => error_codes::VALIDATION_ERROR,
            AppError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// 对外可见的原因；内部错误细节（SQL、连接信息）只进日志
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthenticated(msg)
            | AppError::InvalidArgument(msg) => msg.clone(),
            AppError::Internal(_) => "内部服务器错误".to_string(),
        }
    }
}

/// 分类 -> 传输层状态码，交付层统一经由此函数转换
pub fn status_code(err: &AppError) -> StatusCode {
    match err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = Json(ApiResult::<()>::error(self.code(), &self.public_message()));
        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("用户不存在".to_string()),
            StoreError::Conflict(_) => AppError::Conflict("邮箱已被注册".to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => AppError::NotFound("会话不存在或已过期".to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ContextError> for AppError {
    fn from(err: ContextError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("password hashing: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task: {err}"))
    }
}
