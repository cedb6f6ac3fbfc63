use std::sync::Arc;

use config::Config;
use tokio_util::sync::CancellationToken;

use cache::{MemorySessionStore, MemoryUserCache};
use database::MemoryUserStore;
use services::{SessionService, UserService};

pub mod cache;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod result;
pub mod router;
pub mod routes;
pub mod services;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<UserService>,
    pub sessions: Arc<SessionService>,
    /// 服务关闭时取消，所有请求上下文都挂在它下面
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, users: UserService, sessions: SessionService) -> Self {
        Self {
            config,
            users: Arc::new(users),
            sessions: Arc::new(sessions),
            shutdown: CancellationToken::new(),
        }
    }

    /// 全部使用内存后端
    pub fn in_memory(config: Config) -> Self {
        let users = UserService::new(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryUserCache::new()),
            config.user_cache_ttl_secs,
            config.bcrypt_cost,
        );
        let sessions = SessionService::new(Arc::new(MemorySessionStore::new()));
        Self::new(config, users, sessions)
    }
}
