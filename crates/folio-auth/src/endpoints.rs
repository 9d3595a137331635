//! Users API paths.

use url::Url;

pub const LOGIN: &str = "/api/users/login/";
pub const REGISTER: &str = "/api/users/register/";
pub const LOGOUT: &str = "/api/users/logout/";
pub const REFRESH: &str = "/api/users/refresh/";
pub const CURRENT_USER: &str = "/api/users/me/";
pub const GOOGLE_LOGIN: &str = "/api/users/google/login/";

/// Append `path` to `base`, keeping any path prefix `base` already has.
pub fn resolve(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Url::parse(&format!("{}/{}", base, path))
}
