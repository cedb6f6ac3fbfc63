use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    context::RequestContext,
    error::{AppError, AppResult},
    models::Session,
    utils::success_to_api_response,
};

use super::model::{
    EmptyResponse, FindByNameParams, LoginRequest, LoginResponse, PaginationParams,
    RegisterRequest, UpdateRoleRequest, UpdateUserRequest, UserResponse, UsersListResponse,
};

fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|e| AppError::InvalidArgument(format!("用户ID格式无效: {}", e)))
}

/// 注册新用户
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    if req.email.trim().is_empty() || req.password.trim().is_empty() {
        return Err(AppError::InvalidArgument("邮箱和密码不能为空".to_string()));
    }

    let user = state.users.register(&ctx, req.into()).await?;
    Ok((
        StatusCode::CREATED,
        success_to_api_response(UserResponse::from(user)),
    ))
}

/// 用户登录，成功后创建会话
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state.users.login(&ctx, &req.email, &req.password).await?;

    let session_id = state
        .sessions
        .create_session(&ctx, user.user_id, state.config.session_expire().as_secs())
        .await?;
    tracing::info!(user_id = %user.user_id, "user logged in");

    Ok(success_to_api_response(LoginResponse {
        user: user.into(),
        session_id,
    }))
}

/// 当前会话对应的用户
pub async fn get_me(
    State(state): State<AppState>,
    ctx: RequestContext,
    Extension(session): Extension<Session>,
) -> AppResult<impl IntoResponse> {
    let user = state.users.get_by_id(&ctx, session.user_id).await?;
    Ok(success_to_api_response(UserResponse::from(user)))
}

/// 注销：删除当前会话
pub async fn logout(
    State(state): State<AppState>,
    ctx: RequestContext,
    Extension(session): Extension<Session>,
) -> AppResult<impl IntoResponse> {
    state
        .sessions
        .delete_session(&ctx, &session.session_id)
        .await?;
    Ok(success_to_api_response(EmptyResponse {}))
}

pub async fn get_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&user_id)?;
    let user = state.users.get_by_id(&ctx, user_id).await?;
    Ok(success_to_api_response(UserResponse::from(user)))
}

/// 部分更新用户资料
pub async fn update_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&user_id)?;
    let user = state.users.update(&ctx, req.into_update(user_id)).await?;
    Ok(success_to_api_response(UserResponse::from(user)))
}

pub async fn update_role(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&user_id)?;
    let user = state.users.update_role(&ctx, user_id, &req.role).await?;
    Ok(success_to_api_response(UserResponse::from(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&user_id)?;
    state.users.delete(&ctx, user_id).await?;
    Ok(success_to_api_response(EmptyResponse {}))
}

/// 按名字搜索
pub async fn find_by_name(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<FindByNameParams>,
) -> AppResult<impl IntoResponse> {
    let pq = params.pagination();
    let list = state.users.find_by_name(&ctx, &params.name, &pq).await?;
    Ok(success_to_api_response(UsersListResponse::from(list)))
}

pub async fn get_users(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let list = state.users.get_users(&ctx, &params.into()).await?;
    Ok(success_to_api_response(UsersListResponse::from(list)))
}
