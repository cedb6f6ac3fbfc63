use std::sync::Arc;

use uuid::Uuid;

use crate::cache::{SessionError, SessionStore};
use crate::context::RequestContext;
use crate::models::Session;

/// 会话编排器，直接委托给会话存储
pub struct SessionService {
    store: Arc<dyn SessionStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn create_session(
        &self,
        ctx: &RequestContext,
        user_id: Uuid,
        ttl_secs: u64,
    ) -> Result<String, SessionError> {
        self.store.create(ctx, user_id, ttl_secs).await
    }

    pub async fn get_session(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> Result<Session, SessionError> {
        self.store.get(ctx, token).await
    }

    pub async fn delete_session(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> Result<(), SessionError> {
        self.store.delete(ctx, token).await
    }
}
