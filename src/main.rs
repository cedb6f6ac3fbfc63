use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_directory::{
    AppState,
    cache::{RedisSessionStore, RedisUserCache},
    config::{Config, StorageBackend},
    database::PgUserRepository,
    router::build_router,
    services::{SessionService, UserService},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let state = match config.storage_backend {
        StorageBackend::Postgres => connect_backends(config).await?,
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, all data is lost on restart");
            AppState::in_memory(config)
        }
    };

    let app = build_router(state.clone());

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received, cancelling in-flight requests");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}

async fn connect_backends(config: Config) -> Result<AppState, BoxError> {
    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'user_directory';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database migrations applied");

    // 设置 Redis 客户端
    let redis = Arc::new(redis::Client::open(config.redis_url.clone())?);

    let users = UserService::new(
        Arc::new(PgUserRepository::new(pool)),
        Arc::new(RedisUserCache::new(redis.clone())),
        config.user_cache_ttl_secs,
        config.bcrypt_cost,
    );
    let sessions = SessionService::new(Arc::new(RedisSessionStore::new(redis)));

    Ok(AppState::new(config, users, sessions))
}
