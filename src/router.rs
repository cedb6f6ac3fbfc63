use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::{DefaultOnFailure, TraceLayer};
use tracing::Level;

use crate::{
    AppState,
    middleware::auth_middleware,
    routes,
};

// 无需会话即可访问的路由
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(routes::user::register))
        .route("/users/login", post(routes::user::login))
        .route("/users/search", get(routes::user::find_by_name))
        .route("/users", get(routes::user::get_users))
        .route("/users/{user_id}", get(routes::user::get_user))
}

// 需要 x-session-id 的路由
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(routes::user::get_me))
        .route("/users/logout", post(routes::user::logout))
        .route(
            "/users/{user_id}",
            put(routes::user::update_user).delete(routes::user::delete_user),
        )
        .route("/users/{user_id}/role", put(routes::user::update_role))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
}

/// 组装完整的应用路由
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(public_routes())
        .merge(protected_routes(&state));

    // axum 不允许在根路径 nest
    let base = state.config.api_base_uri.trim().trim_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{base}"), api)
    };

    let router = router
        .route("/ping", get(routes::ping))
        // 5xx 的错误日志由 AppError 负责，这里只留调试级别
        .layer(
            TraceLayer::new_for_http()
                .on_failure(DefaultOnFailure::new().level(Level::DEBUG)),
        );

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
