// 编排层
// 协调存储、缓存和会话存储，对外暴露身份操作

pub mod session;
pub mod user;

pub use session::SessionService;
pub use user::UserService;
