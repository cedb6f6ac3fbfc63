use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Postgres + Redis
    Postgres,
    /// 进程内存，本地调试用
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StorageBackend::Postgres),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub session_expire_secs: u64,
    pub user_cache_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub bcrypt_cost: u32,
    pub db_max_connections: u32,
    pub storage_backend: StorageBackend,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: String::new(),
            redis_url: String::new(),
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            api_base_uri: "/api".to_string(),
            session_expire_secs: 86400,
            user_cache_ttl_secs: crate::services::user::USER_CACHE_TTL_SECS,
            request_timeout_secs: 5,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            db_max_connections: 10,
            storage_backend: StorageBackend::Postgres,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    /// 从环境变量（以及 .env 文件）加载配置
    ///
    /// Postgres 后端要求 DATABASE_URL 和 REDIS_URL，其余项缺失或格式错误时使用默认值。
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let storage_backend = parse_or("STORAGE_BACKEND", defaults.storage_backend);

        let (database_url, redis_url) = match storage_backend {
            StorageBackend::Postgres => (env::var("DATABASE_URL")?, env::var("REDIS_URL")?),
            StorageBackend::Memory => (
                env::var("DATABASE_URL").unwrap_or_default(),
                env::var("REDIS_URL").unwrap_or_default(),
            ),
        };

        Ok(Config {
            database_url,
            redis_url,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or("SERVER_PORT", defaults.server_port),
            api_base_uri: env::var("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            session_expire_secs: parse_or("SESSION_EXPIRE", defaults.session_expire_secs),
            user_cache_ttl_secs: parse_or("USER_CACHE_TTL", defaults.user_cache_ttl_secs),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT", defaults.request_timeout_secs),
            bcrypt_cost: parse_or("BCRYPT_COST", defaults.bcrypt_cost),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            storage_backend,
        })
    }

    pub fn session_expire(&self) -> Duration {
        Duration::from_secs(self.session_expire_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
