//! Request authentication parameters.
//!
//! Logging in is someone else's job. This crate only needs the result: the
//! session cookies plus a few values scraped from the logged-in page, which
//! are attached to every request. Nothing here is validated or refreshed.

use std::collections::BTreeMap;

/// Cookie holding the numeric user id
pub const USER_COOKIE: &str = "c_user";

/// Authentication state attached to every authenticated request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// Id of the logged-in user
    pub user_id: String,
    /// Anti-forgery token (`fb_dtsg`)
    pub dtsg: String,
    /// Client revision marker (`__rev`)
    pub revision: String,
    /// Session cookies
    pub cookies: BTreeMap<String, String>,
}

impl AuthContext {
    /// Build a context, reading the user id from the `c_user` cookie.
    ///
    /// Returns `None` if that cookie is missing.
    pub fn from_cookies(
        cookies: BTreeMap<String, String>,
        dtsg: impl Into<String>,
        revision: impl Into<String>,
    ) -> Option<Self> {
        let user_id = cookies.get(USER_COOKIE)?.clone();
        Some(AuthContext {
            user_id,
            dtsg: dtsg.into(),
            revision: revision.into(),
            cookies,
        })
    }

    /// Query parameters identifying the logged-in client.
    pub fn query_params(&self) -> [(&'static str, &str); 4] {
        [
            ("__rev", self.revision.as_str()),
            ("__user", self.user_id.as_str()),
            ("__a", "1"),
            ("fb_dtsg", self.dtsg.as_str()),
        ]
    }

    /// `Cookie` header value, or `None` without cookies.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookies() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("c_user".to_string(), "1000".to_string()),
            ("xs".to_string(), "secret".to_string()),
        ])
    }

    #[test]
    fn test_from_cookies() {
        let auth = AuthContext::from_cookies(cookies(), "token", "42").unwrap();
        assert_eq!(auth.user_id, "1000");
        assert_eq!(
            auth.query_params(),
            [("__rev", "42"), ("__user", "1000"), ("__a", "1"), ("fb_dtsg", "token")]
        );
        assert_eq!(auth.cookie_header().as_deref(), Some("c_user=1000; xs=secret"));
    }

    #[test]
    fn test_missing_user_cookie() {
        assert!(AuthContext::from_cookies(BTreeMap::new(), "t", "r").is_none());
        assert_eq!(AuthContext::default().cookie_header(), None);
    }
}
