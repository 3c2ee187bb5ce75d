//! Route paths.

pub const POST_USER_REGISTER: &str = "/user/register";
pub const POST_USER_LOGIN: &str = "/user/login";
pub const POST_USER_REFRESH_TOKEN: &str = "/user/refresh-token";
pub const POST_USER_LOGOUT: &str = "/user/logout";
pub const GET_USER_ME: &str = "/user/me";
pub const USER_PROFILE: &str = "/user/profile";
pub const PUT_USER_PASSWORD: &str = "/user/password";

pub const GET_ADMIN_USERS: &str = "/admin/users";
pub const POST_ADMIN_CREATE_USER: &str = "/admin/create-user";
pub const PUT_ADMIN_UPDATE_USER: &str = "/admin/update-user/{user_id}";
pub const DELETE_ADMIN_DELETE_USER: &str = "/admin/delete-user/{user_id}";
pub const DELETE_ADMIN_SOFT_DELETE_USER: &str = "/admin/soft-delete-user/{user_id}";

pub const UPLOADS: &str = "/uploads";
