//! Cookie parsing and `Set-Cookie` rendering.

use axum::http::{header, HeaderMap};

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// A cookie to be sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            max_age: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    /// Session cookie: `Path=/; HttpOnly; SameSite=Lax`.
    pub fn session(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: Some("/".to_string()),
            http_only: true,
            same_site: Some(SameSite::Lax),
            ..Self::new(name, value)
        }
    }

    /// A cookie that makes the client drop `name` immediately.
    pub fn removal(name: impl Into<String>) -> Self {
        Self {
            max_age: Some(0),
            ..Self::session(name, "")
        }
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(path) = &self.path {
            out.push_str("; Path=");
            out.push_str(path);
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if let Some(same_site) = self.same_site {
            out.push_str("; SameSite=");
            out.push_str(same_site.as_str());
        }
        out
    }
}

/// Find the value of cookie `name` across every `Cookie` header.
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_cookie_among_many() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; sid=abc123"));
        headers.append(header::COOKIE, HeaderValue::from_static("lang=en"));

        assert_eq!(find_cookie(&headers, "sid"), Some("abc123"));
        assert_eq!(find_cookie(&headers, "lang"), Some("en"));
        assert_eq!(find_cookie(&headers, "missing"), None);
    }

    #[test]
    fn renders_session_cookie() {
        let cookie = Cookie::session("sid", "token");
        assert_eq!(cookie.to_header_value(), "sid=token; Path=/; HttpOnly; SameSite=Lax");
    }

    #[test]
    fn removal_expires_immediately() {
        let rendered = Cookie::removal("sid").to_header_value();
        assert!(rendered.starts_with("sid=; Path=/; Max-Age=0"));
    }
}
