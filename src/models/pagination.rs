/// 调用方未指定 size 时的默认每页数量
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// 每页数量上限，超出时截断
pub const MAX_PAGE_SIZE: i64 = 100;

/// 列表排序字段，只接受白名单内的列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserOrder {
    #[default]
    Name,
    LastName,
    Email,
    CreatedAt,
}

impl UserOrder {
    /// 未知字段回落到默认的姓名排序
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "last_name" => UserOrder::LastName,
            "email" => UserOrder::Email,
            "created_at" => UserOrder::CreatedAt,
            _ => UserOrder::Name,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            UserOrder::Name => "first_name, last_name",
            UserOrder::LastName => "last_name, first_name",
            UserOrder::Email => "email",
            UserOrder::CreatedAt => "created_at",
        }
    }
}

/// 分页查询参数
#[derive(Debug, Clone, Default)]
pub struct PaginationQuery {
    pub size: i64,
    pub page: i64,
    pub order_by: Option<String>,
}

impl PaginationQuery {
    pub fn new(size: i64, page: i64, order_by: Option<String>) -> Self {
        Self {
            size,
            page,
            order_by,
        }
    }

    pub fn size(&self) -> i64 {
        if self.size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.size.min(MAX_PAGE_SIZE)
        }
    }

    /// 页码从 1 开始，0 和负数按第一页处理
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.size())
    }

    pub fn limit(&self) -> i64 {
        self.size()
    }

    pub fn order(&self) -> UserOrder {
        self.order_by
            .as_deref()
            .map(UserOrder::from_key)
            .unwrap_or_default()
    }
}

pub fn total_pages(total_count: i64, size: i64) -> i64 {
    if total_count <= 0 || size <= 0 {
        return 0;
    }
    total_count / size + i64::from(total_count % size != 0)
}

pub fn has_more(page: i64, total_count: i64, size: i64) -> bool {
    page.saturating_mul(size) < total_count
}
