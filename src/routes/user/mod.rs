mod handler;
pub mod model;

pub use handler::{
    delete_user,
    find_by_name,
    get_me,
    get_user,
    get_users,
    login,
    logout,
    register,
    update_role,
    update_user,
};
