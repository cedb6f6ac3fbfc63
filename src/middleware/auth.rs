use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::cache::SessionError;
use crate::context::RequestContext;
use crate::error::AppError;

/// 携带会话令牌的请求头
pub const SESSION_HEADER: &str = "x-session-id";

/// 校验会话令牌，通过后把 `Session` 放入请求扩展
///
/// 缺失、为空、格式不对、不存在和已过期都一律视为未认证。
pub async fn auth_middleware(
    State(state): State<AppState>,
    ctx: RequestContext,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(SESSION_HEADER)
        .ok_or_else(|| AppError::Unauthenticated("缺少会话令牌".to_string()))?
        .to_str()
        .map(str::trim)
        .map_err(|_| AppError::Unauthenticated("会话令牌格式无效".to_string()))?
        .to_string();

    if token.is_empty() {
        return Err(AppError::Unauthenticated("会话令牌格式无效".to_string()));
    }

    let session = match state.sessions.get_session(&ctx, &token).await {
        Ok(session) => session,
        Err(SessionError::NotFound) => {
            return Err(AppError::Unauthenticated("会话不存在或已过期".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
