use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::normalize_email;

/// 未指定角色时的默认角色
pub const DEFAULT_ROLE: &str = "user";

/// 用户完整快照
///
/// 缓存中保存的就是这个结构（包括密码哈希）；对外返回前必须先 `sanitize_password`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub password: String,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub login_date: DateTime<Utc>,
}

impl User {
    /// 清空密码哈希
    pub fn sanitize_password(&mut self) {
        self.password.clear();
    }

    pub fn sanitized(mut self) -> Self {
        self.sanitize_password();
        self
    }

    pub fn role(&self) -> &str {
        self.role
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE)
    }
}

/// 注册输入
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// 调用 `prepare` 之前是明文，之后由编排器替换为哈希
    pub password: String,
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

impl NewUser {
    /// 规范化邮箱、去掉密码两端空白，空角色回落到默认角色
    pub fn prepare(&mut self) {
        self.email = normalize_email(&self.email);
        self.password = self.password.trim().to_string();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        let role = self
            .role
            .take()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());
        self.role = Some(role);
    }
}

/// 部分更新输入：`None` 或空字符串（postcode 为 0）表示保持原值
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub user_id: Uuid,
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

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl UserUpdate {
    /// 统一空值表示：空白字符串和 0 邮编都变成 `None`，邮箱做规范化
    pub fn normalize(mut self) -> Self {
        self.first_name = blank_to_none(self.first_name);
        self.last_name = blank_to_none(self.last_name);
        self.email = blank_to_none(self.email).map(|e| normalize_email(&e));
        self.about = blank_to_none(self.about);
        self.avatar = blank_to_none(self.avatar);
        self.phone_number = blank_to_none(self.phone_number);
        self.address = blank_to_none(self.address);
        self.city = blank_to_none(self.city);
        self.country = blank_to_none(self.country);
        self.gender = blank_to_none(self.gender);
        self.postcode = self.postcode.filter(|p| *p != 0);
        self
    }

    /// 把本次更新合并到已有记录上（内存存储使用，与 SQL 的 COALESCE 语义一致）
    pub fn apply_to(&self, user: &mut User) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        set(&mut user.first_name, &self.first_name);
        set(&mut user.last_name, &self.last_name);
        set(&mut user.email, &self.email);
        set_opt(&mut user.about, &self.about);
        set_opt(&mut user.avatar, &self.avatar);
        set_opt(&mut user.phone_number, &self.phone_number);
        set_opt(&mut user.address, &self.address);
        set_opt(&mut user.city, &self.city);
        set_opt(&mut user.country, &self.country);
        set_opt(&mut user.gender, &self.gender);
        set_opt(&mut user.postcode, &self.postcode);
        set_opt(&mut user.birthday, &self.birthday);
    }
}

/// 分页列表结果
#[derive(Debug, Clone, PartialEq)]
pub struct UsersList {
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub size: i64,
    pub has_more: bool,
    pub users: Vec<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_defaults_blank_role() {
        let mut input = NewUser {
            email: " Bob@Mail.com ".into(),
            password: " pw ".into(),
            role: Some("   ".into()),
            ..Default::default()
        };
        input.prepare();
        assert_eq!(input.email, "bob@mail.com");
        assert_eq!(input.password, "pw");
        assert_eq!(input.role.as_deref(), Some(DEFAULT_ROLE));
    }

    #[test]
    fn normalize_drops_blank_fields() {
        let update = UserUpdate {
            first_name: Some("  ".into()),
            email: Some(" NEW@Mail.com".into()),
            postcode: Some(0),
            city: Some("Taipei".into()),
            ..Default::default()
        }
        .normalize();
        assert_eq!(update.first_name, None);
        assert_eq!(update.email.as_deref(), Some("new@mail.com"));
        assert_eq!(update.postcode, None);
        assert_eq!(update.city.as_deref(), Some("Taipei"));
    }
}
