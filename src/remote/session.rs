//! Session token handling
//!
//! The server hands out its session as a `JSESSIONID` cookie on login. The
//! token is replayed as a `Cookie` header on every later call.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::remote::transport::HttpResponse;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "JSESSIONID";

fn cookie_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"JSESSIONID=([^;]+)").ok())
        .as_ref()
}

/// Opaque session token
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header pair carrying this session
    pub fn cookie_header(&self) -> (String, String) {
        ("Cookie".to_string(), format!("{}={}", SESSION_COOKIE, self.0))
    }

    /// Pull the session cookie out of a login response
    ///
    /// All `set-cookie` values are joined with `"; "` before matching, so
    /// the cookie may arrive in any of several headers.
    pub fn from_response(response: &HttpResponse) -> Option<Self> {
        let cookies = response.header_values("set-cookie");
        if cookies.is_empty() {
            return None;
        }
        let joined = cookies.join("; ");
        cookie_pattern()?
            .captures(&joined)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .filter(|v| !v.is_empty())
            .map(SessionToken::new)
    }
}

// Never print the token itself
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(len={})", self.0.len())
    }
}
