pub mod pagination;
pub mod session;
pub mod user;

pub use pagination::{PaginationQuery, UserOrder};
pub use session::Session;
pub use user::{NewUser, User, UserUpdate, UsersList};
