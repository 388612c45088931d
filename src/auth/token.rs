//! Bearer credential extraction and token claims.

use std::collections::HashMap;

use http::HeaderMap;
use http::header::{AUTHORIZATION, COOKIE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::verifier::AuthConfig;

/// Claims carried by an identity provider session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity provider user id)
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    #[serde(default)]
    pub iss: Option<String>,
    /// Every other claim, untouched
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Claims {
    /// The subject id, if present and non-blank.
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Find the session token in a request.
///
/// Sources are checked in order and the first non-empty one wins:
/// `Authorization: Bearer <token>`, a raw `Authorization` value, the
/// session header, then the session cookie.
pub fn extract_token(headers: &HeaderMap, config: &AuthConfig) -> Option<String> {
    if let Some(value) = header_str(headers, AUTHORIZATION.as_str()).map(str::trim)
        && !value.is_empty()
    {
        // The scheme name is case-insensitive; a bare "Bearer" carries no token
        match value.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
            None if value.eq_ignore_ascii_case("bearer") => {}
            _ => return Some(value.to_string()),
        }
    }

    if let Some(value) = header_str(headers, &config.session_header)
        && !value.trim().is_empty()
    {
        return Some(value.trim().to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == config.session_cookie && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_no_credentials() {
        let config = AuthConfig::default();
        assert_eq!(extract_token(&HeaderMap::new(), &config), None);
    }

    #[test]
    fn test_bearer_header() {
        let config = AuthConfig::default();
        let map = headers(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(extract_token(&map, &config).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_raw_authorization_header() {
        let config = AuthConfig::default();
        let map = headers(&[("authorization", "abc.def.ghi")]);
        assert_eq!(extract_token(&map, &config).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_empty_bearer_falls_through_to_session_header() {
        let config = AuthConfig::default();
        let map = headers(&[
            ("authorization", "Bearer "),
            ("x-session-token", "from-header"),
        ]);
        assert_eq!(extract_token(&map, &config).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        let config = AuthConfig::default();
        let map = headers(&[("authorization", "bearer abc.def.ghi")]);
        assert_eq!(extract_token(&map, &config).as_deref(), Some("abc.def.ghi"));

        let map = headers(&[("authorization", "BEARER  abc.def.ghi ")]);
        assert_eq!(extract_token(&map, &config).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bare_bearer_falls_through_to_session_cookie() {
        let config = AuthConfig::default();
        let map = headers(&[("authorization", "Bearer"), ("cookie", "__session=tok123")]);
        assert_eq!(extract_token(&map, &config).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_authorization_wins_over_session_sources() {
        let config = AuthConfig::default();
        let map = headers(&[
            ("authorization", "Bearer first"),
            ("x-session-token", "second"),
            ("cookie", "__session=third"),
        ]);
        assert_eq!(extract_token(&map, &config).as_deref(), Some("first"));
    }

    #[test]
    fn test_session_cookie() {
        let config = AuthConfig::default();
        let map = headers(&[("cookie", "theme=dark; __session=tok123; other=1")]);
        assert_eq!(extract_token(&map, &config).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_empty_session_cookie_is_ignored() {
        let config = AuthConfig::default();
        let map = headers(&[("cookie", "__session=")]);
        assert_eq!(extract_token(&map, &config), None);
    }

    #[test]
    fn test_claims_deserialization() {
        let json = r#"{
            "sub": "user_2abc",
            "email": "u1@x.com",
            "exp": 1735689600,
            "iss": "https://clerk.example.com",
            "sid": "sess_1"
        }"#;

        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.subject(), Some("user_2abc"));
        assert_eq!(claims.email.as_deref(), Some("u1@x.com"));
        assert_eq!(claims.username, None);
        assert_eq!(claims.exp, 1735689600);
        assert_eq!(claims.extra.get("sid"), Some(&Value::from("sess_1")));
    }

    #[test]
    fn test_blank_subject() {
        let claims: Claims = serde_json::from_str(r#"{"sub": "  ", "exp": 1}"#).unwrap();
        assert_eq!(claims.subject(), None);
    }
}
