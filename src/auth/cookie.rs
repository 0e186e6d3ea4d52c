use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::AuthConfig;

pub const REFRESH_COOKIE: &str = "refresh_token";

const REFRESH_COOKIE_MAX_AGE: Duration = Duration::days(7);

/// Builds the refresh-token carrier cookie. Without `persistent` the
/// cookie gets no Max-Age and lives only for the browser session.
/// Cross-site frontends need SameSite=None, which browsers only accept
/// together with Secure, hence both follow the production flag.
pub fn refresh_cookie(token: String, persistent: bool, auth: &AuthConfig) -> Cookie<'static> {
    let mut cookie = Cookie::new(REFRESH_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(auth.production);
    cookie.set_same_site(if auth.production {
        SameSite::None
    } else {
        SameSite::Lax
    });
    if persistent {
        cookie.set_max_age(REFRESH_COOKIE_MAX_AGE);
    }
    cookie
}

/// Removal cookie: empty value, Max-Age zero.
pub fn clear_refresh_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(REFRESH_COOKIE, "");
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_max_age(Duration::ZERO);
    cookie
}
