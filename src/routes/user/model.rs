use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NewUser, PaginationQuery, User, UserUpdate, UsersList};

/// 对外的用户视图，结构上不含密码字段
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub about: Option<String>,
    pub avatar: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
    pub postcode: Option<i32>,
    pub birthday: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub login_date: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let role = user.role().to_string();
        UserResponse {
            user_id: user.user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role,
            about: user.about,
            avatar: user.avatar,
            phone_number: user.phone_number,
            address: user.address,
            city: user.city,
            country: user.country,
            gender: user.gender,
            postcode: user.postcode,
            birthday: user.birthday,
            created_at: user.created_at,
            updated_at: user.updated_at,
            login_date: user.login_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Option<String>,
    pub about: Option<String>,
    pub avatar: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
    pub postcode: Option<i32>,
    pub birthday: Option<NaiveDate>,
}

impl From<RegisterRequest> for NewUser {
    fn from(req: RegisterRequest) -> Self {
        NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
            role: req.role,
            about: req.about,
            avatar: req.avatar,
            phone_number: req.phone_number,
            address: req.address,
            city: req.city,
            country: req.country,
            gender: req.gender,
            postcode: req.postcode,
            birthday: req.birthday,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub session_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub about: Option<String>,
    pub avatar: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
    pub postcode: Option<i32>,
    pub birthday: Option<NaiveDate>,
}

impl UpdateUserRequest {
    pub fn into_update(self, user_id: Uuid) -> UserUpdate {
        UserUpdate {
            user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            about: self.about,
            avatar: self.avatar,
            phone_number: self.phone_number,
            address: self.address,
            city: self.city,
            country: self.country,
            gender: self.gender,
            postcode: self.postcode,
            birthday: self.birthday,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub role: String,
}

/// 分页查询参数，size 为 0 或缺省时取默认值
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub orderby: Option<String>,
}

impl From<PaginationParams> for PaginationQuery {
    fn from(p: PaginationParams) -> Self {
        PaginationQuery::new(p.size.unwrap_or(0), p.page.unwrap_or(1), p.orderby)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FindByNameParams {
    #[serde(default)]
    pub name: String,
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub orderby: Option<String>,
}

impl FindByNameParams {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(
            self.size.unwrap_or(0),
            self.page.unwrap_or(1),
            self.orderby.clone(),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersListResponse {
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub size: i64,
    pub has_more: bool,
    pub users: Vec<UserResponse>,
}

impl From<UsersList> for UsersListResponse {
    fn from(list: UsersList) -> Self {
        UsersListResponse {
            total_count: list.total_count,
            total_pages: list.total_pages,
            page: list.page,
            size: list.size,
            has_more: list.has_more,
            users: list.users.into_iter().map(UserResponse::from).collect(),
        }
    }
}

/// 无响应数据时使用
#[derive(Debug, Serialize, Deserialize)]
pub struct EmptyResponse {}
