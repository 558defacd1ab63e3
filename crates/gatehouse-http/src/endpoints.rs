//! Endpoint paths, relative to the versioned API base.

pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_REGISTER: &str = "/auth/register";
pub const AUTH_ME: &str = "/auth/me";
pub const AUTH_REFRESH: &str = "/auth/refresh";
pub const AUTH_LOGOUT: &str = "/auth/logout";

pub const USERS: &str = "/users";

/// Path of a single user resource.
pub fn user(id: &str) -> String {
    format!("{}/{}", USERS, id)
}

/// Path of one page of the user list.
pub fn users_page(page: u32, per_page: u32) -> String {
    format!("{}?page={}&per_page={}", USERS, page, per_page)
}
