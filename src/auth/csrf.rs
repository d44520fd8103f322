use actix_web::http::Method;
use subtle::ConstantTimeEq;

pub const ACCESS_COOKIE: &str = "access_token";
pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Double-submit check for cookie-authenticated requests. Safe methods pass;
/// anything that mutates must echo the `csrf_token` cookie in `x-csrf-token`.
pub fn is_satisfied(method: &Method, cookie: Option<&str>, header: Option<&str>) -> bool {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return true;
    }
    match (cookie, header) {
        (Some(c), Some(h)) => !c.is_empty() && bool::from(c.as_bytes().ct_eq(h.as_bytes())),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_methods_need_no_token() {
        assert!(is_satisfied(&Method::GET, None, None));
        assert!(is_satisfied(&Method::OPTIONS, None, None));
    }

    #[test]
    fn mutations_need_matching_token() {
        assert!(is_satisfied(&Method::POST, Some("abc"), Some("abc")));
        assert!(!is_satisfied(&Method::POST, Some("abc"), Some("abd")));
        assert!(!is_satisfied(&Method::PUT, Some("abc"), None));
        assert!(!is_satisfied(&Method::DELETE, None, Some("abc")));
        assert!(!is_satisfied(&Method::POST, Some(""), Some("")));
    }

    #[test]
    fn tokens_of_different_length_never_match() {
        assert!(!is_satisfied(&Method::POST, Some("abc"), Some("abcd")));
        assert!(!is_satisfied(&Method::PATCH, Some("abcd"), Some("abc")));
    }
}
