// 请求上下文
// 每个编排器和存储操作的第一个参数，携带截止时间和取消令牌

use std::future::Future;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::AppState;

/// 上下文中断原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("operation cancelled")]
    Cancelled,
}

/// 请求上下文：可选的绝对截止时间 + 取消令牌
#[derive(Debug, Clone)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RequestContext {
    /// 无截止时间、不会被外部取消的上下文（后台任务和测试使用）
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// 从现在起 `timeout` 后到期
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// 绑定到父令牌，父令牌取消时本上下文一并取消
    pub fn with_parent(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 在截止时间和取消令牌的约束下执行 `fut`
    ///
    /// 截止时间已过或令牌已取消时，`fut` 被丢弃，其中未完成的 IO 随之中止。
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ContextError>
    where
        F: Future<Output = T>,
    {
        if self.cancel.is_cancelled() {
            return Err(ContextError::Cancelled);
        }

        match self.deadline {
            Some(deadline) => {
                if Instant::now() >= deadline {
                    return Err(ContextError::DeadlineExceeded);
                }
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(ContextError::Cancelled),
                    res = tokio::time::timeout_at(deadline, fut) => {
                        res.map_err(|_| ContextError::DeadlineExceeded)
                    }
                }
            }
            None => {
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(ContextError::Cancelled),
                    out = fut => Ok(out),
                }
            }
        }
    }
}

/// 每个 HTTP 请求派生一个上下文：截止时间来自配置，令牌挂在服务关闭令牌之下
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::with_timeout(state.config.request_timeout()).with_parent(&state.shutdown))
    }
}
