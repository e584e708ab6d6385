/// Session transport
///
/// Binds tokens to HTTP: two HttpOnly, SameSite=Lax cookies (Secure in
/// production) whose Max-Age matches each token's lifetime, with
/// `Authorization: Bearer` accepted as an alternate transport for the
/// access token. Cookie values are only ever opaque signed tokens.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{http::header, HttpRequest, HttpResponseBuilder};

use crate::auth::jwt::TokenPair;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone)]
pub struct SessionCarrier {
    secure: bool,
    access_max_age: i64,
    refresh_max_age: i64,
}

impl SessionCarrier {
    /// `secure` should be true only in production. Max-ages are in seconds
    /// and must match the token lifetimes.
    pub fn new(secure: bool, access_max_age: i64, refresh_max_age: i64) -> Self {
        Self {
            secure,
            access_max_age,
            refresh_max_age,
        }
    }

    fn cookie(&self, name: &'static str, value: String, max_age: i64) -> Cookie<'static> {
        Cookie::build(name, value)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(Duration::seconds(max_age))
            .finish()
    }

    pub fn access_cookie(&self, token: &str) -> Cookie<'static> {
        self.cookie(ACCESS_TOKEN_COOKIE, token.to_string(), self.access_max_age)
    }

    pub fn refresh_cookie(&self, token: &str) -> Cookie<'static> {
        self.cookie(REFRESH_TOKEN_COOKIE, token.to_string(), self.refresh_max_age)
    }

    /// Set both session cookies on a response
    pub fn attach(&self, response: &mut HttpResponseBuilder, tokens: &TokenPair) {
        response
            .cookie(self.access_cookie(&tokens.access_token))
            .cookie(self.refresh_cookie(&tokens.refresh_token));
    }

    /// Overwrite both cookies with empty, immediately expiring values.
    /// Purely a client-side signal; issued tokens stay valid until expiry.
    pub fn clear(&self, response: &mut HttpResponseBuilder) {
        response
            .cookie(self.cookie(ACCESS_TOKEN_COOKIE, String::new(), 0))
            .cookie(self.cookie(REFRESH_TOKEN_COOKIE, String::new(), 0));
    }

    /// Access token from the cookie, falling back to a bearer header
    pub fn extract_access(&self, req: &HttpRequest) -> Option<String> {
        cookie_value(req, ACCESS_TOKEN_COOKIE).or_else(|| bearer_token(req))
    }

    pub fn extract_refresh(&self, req: &HttpRequest) -> Option<String> {
        cookie_value(req, REFRESH_TOKEN_COOKIE)
    }
}

fn cookie_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.cookie(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use actix_web::HttpResponse;

    fn carrier(secure: bool) -> SessionCarrier {
        SessionCarrier::new(secure, 900, 604_800)
    }

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "aaa.bbb.ccc".to_string(),
            refresh_token: "ddd.eee.fff".to_string(),
        }
    }

    #[test]
    fn test_attach_sets_both_cookies_with_secure_defaults() {
        let mut builder = HttpResponse::Ok();
        carrier(true).attach(&mut builder, &pair());
        let response = builder.finish();

        let cookies: Vec<_> = response.cookies().collect();
        assert_eq!(cookies.len(), 2);

        let access = cookies.iter().find(|c| c.name() == ACCESS_TOKEN_COOKIE).unwrap();
        assert_eq!(access.value(), "aaa.bbb.ccc");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Lax));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(access.max_age(), Some(Duration::seconds(900)));

        let refresh = cookies.iter().find(|c| c.name() == REFRESH_TOKEN_COOKIE).unwrap();
        assert_eq!(refresh.value(), "ddd.eee.fff");
        assert_eq!(refresh.max_age(), Some(Duration::seconds(604_800)));
        assert_eq!(refresh.http_only(), Some(true));
    }

    #[test]
    fn test_secure_flag_off_outside_production() {
        let cookie = carrier(false).access_cookie("token");
        assert_eq!(cookie.secure(), Some(false));
    }

    #[test]
    fn test_clear_expires_both_cookies() {
        let mut builder = HttpResponse::Ok();
        carrier(false).clear(&mut builder);
        let response = builder.finish();

        let cookies: Vec<_> = response.cookies().collect();
        assert_eq!(cookies.len(), 2);
        for cookie in cookies {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
            assert_eq!(cookie.http_only(), Some(true));
        }
    }

    #[test]
    fn test_extract_access_from_cookie() {
        let req = TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "from-cookie"))
            .to_http_request();

        assert_eq!(carrier(false).extract_access(&req), Some("from-cookie".to_string()));
    }

    #[test]
    fn test_extract_access_from_bearer_header() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer from-header"))
            .to_http_request();

        assert_eq!(carrier(false).extract_access(&req), Some("from-header".to_string()));
    }

    #[test]
    fn test_cookie_wins_over_header() {
        let req = TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "from-cookie"))
            .insert_header((header::AUTHORIZATION, "Bearer from-header"))
            .to_http_request();

        assert_eq!(carrier(false).extract_access(&req), Some("from-cookie".to_string()));
    }

    #[test]
    fn test_extract_access_absent() {
        let carrier = carrier(false);

        let req = TestRequest::default().to_http_request();
        assert_eq!(carrier.extract_access(&req), None);

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(carrier.extract_access(&req), None);

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert_eq!(carrier.extract_access(&req), None);
    }

    #[test]
    fn test_refresh_cookie_is_not_an_access_token() {
        let req = TestRequest::default()
            .cookie(Cookie::new(REFRESH_TOKEN_COOKIE, "refresh"))
            .to_http_request();

        let carrier = carrier(false);
        assert_eq!(carrier.extract_access(&req), None);
        assert_eq!(carrier.extract_refresh(&req), Some("refresh".to_string()));
    }

    #[test]
    fn test_extract_from_raw_cookie_header() {
        let req = TestRequest::default()
            .insert_header((header::COOKIE, "theme=dark; access_token=acc.ess.tok; refresh_token=ref.resh.tok"))
            .to_http_request();

        let carrier = carrier(false);
        assert_eq!(carrier.extract_access(&req), Some("acc.ess.tok".to_string()));
        assert_eq!(carrier.extract_refresh(&req), Some("ref.resh.tok".to_string()));
    }

    #[test]
    fn test_cleared_cookie_extracts_as_absent() {
        let carrier = carrier(false);
        let mut builder = HttpResponse::Ok();
        carrier.clear(&mut builder);
        let response = builder.finish();

        let mut req = TestRequest::default();
        for cookie in response.cookies() {
            req = req.cookie(Cookie::new(cookie.name().to_string(), cookie.value().to_string()));
        }
        let req = req.to_http_request();

        assert_eq!(carrier.extract_access(&req), None);
        assert_eq!(carrier.extract_refresh(&req), None);
    }
}
