use wasm_bindgen::JsCast;

pub(crate) const DEFAULT_SESSION_COOKIE: &str = "_session_id";

/// Where the session credential comes from.
///
/// The cookie variant is re-read on every request so a login in another tab
/// is picked up without reloading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SessionCredential {
    Cookie(String),
    Fixed(String),
}

impl SessionCredential {
    pub fn from_cookie(name: impl Into<String>) -> Self {
        Self::Cookie(name.into())
    }

    /// Current token, or an empty string when the cookie is not set.
    pub fn resolve(&self) -> String {
        match self {
            Self::Fixed(token) => token.clone(),
            Self::Cookie(name) => read_cookie(name).unwrap_or_default(),
        }
    }
}

impl Default for SessionCredential {
    fn default() -> Self {
        Self::from_cookie(DEFAULT_SESSION_COOKIE)
    }
}

/// Find `name` in a `document.cookie` string.
pub(crate) fn parse_cookie(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        if k.trim() != name {
            return None;
        }
        let v = v.trim();
        let v = v
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(v);
        Some(
            urlencoding::decode(v)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| v.to_string()),
        )
    })
}

pub(crate) fn read_cookie(name: &str) -> Option<String> {
    let doc = web_sys::window()?
        .document()?
        .dyn_into::<web_sys::HtmlDocument>()
        .ok()?;
    let cookies = doc.cookie().ok()?;
    parse_cookie(&cookies, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_finds_named_value() {
        let jar = "theme=dark; _session_id=abc123; other=1";
        assert_eq!(parse_cookie(jar, "_session_id").as_deref(), Some("abc123"));
        assert_eq!(parse_cookie(jar, "theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_parse_cookie_missing_and_prefix_names() {
        let jar = "x_session_id=nope; _session_id_old=stale";
        assert_eq!(parse_cookie(jar, "_session_id"), None);
        assert_eq!(parse_cookie("", "_session_id"), None);
    }

    #[test]
    fn test_parse_cookie_quoted_and_encoded_values() {
        assert_eq!(
            parse_cookie(r#"_session_id="a%2Fb""#, "_session_id").as_deref(),
            Some("a/b")
        );
        assert_eq!(
            parse_cookie("_session_id=v=1", "_session_id").as_deref(),
            Some("v=1")
        );
    }

    #[test]
    fn test_fixed_credential_resolves_without_browser() {
        let s = SessionCredential::Fixed("tok".to_string());
        assert_eq!(s.resolve(), "tok");
        assert_eq!(
            SessionCredential::default(),
            SessionCredential::Cookie(DEFAULT_SESSION_COOKIE.to_string())
        );
    }
}
