mod auth;

pub use auth::{SESSION_HEADER, auth_middleware};
