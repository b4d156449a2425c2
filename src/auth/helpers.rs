//! Pure helper functions for authentication
//!
//! Cookie extraction and construction, redirect-target sanitizing, and the
//! HTTP client shared by the provider and the data store.

use axum::http::{header::InvalidHeaderValue, HeaderMap, HeaderValue};
use std::time::Duration;

use crate::config::Config;

pub const SESSION_COOKIE: &str = "session_token";
pub const CONTEXT_COOKIE: &str = "client_context";
pub const STATE_COOKIE: &str = "oauth_state";
pub const PKCE_COOKIE: &str = "oauth_pkce";
pub const CALLBACK_COOKIE: &str = "oauth_callback";

/// Where a sign-in lands when no usable target was requested
pub const DEFAULT_CALLBACK: &str = "/dashboard";

/// Client context cookies live for a year; they carry no authority
const CONTEXT_MAX_AGE_SECS: i64 = 365 * 24 * 60 * 60;

/// Sign-in cookies only need to survive the round trip to the provider
const FLOW_MAX_AGE_SECS: i64 = 600;

// =============================================================================
// HTTP Client Builders
// =============================================================================

/// Create a reqwest client for outbound requests using config timeouts
pub fn create_http_client(
    connect_timeout_secs: u64,
    request_timeout_secs: u64,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none()) // Security: prevent SSRF
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(request_timeout_secs))
        .build()
}

// =============================================================================
// Redirect Targets
// =============================================================================

/// Accept only same-site relative paths as post-login targets
///
/// Anything absolute, protocol-relative (`//host`) or backslash-smuggled falls
/// back to [`DEFAULT_CALLBACK`].
pub fn sanitize_callback_url(requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|target| target.starts_with('/'))
        .filter(|target| !target.starts_with("//") && !target.contains('\\'))
        .filter(|target| !target.chars().any(char::is_control))
        .unwrap_or(DEFAULT_CALLBACK)
        .to_string()
}

// =============================================================================
// Cookie Extraction
// =============================================================================

/// Extract a cookie value from headers
///
/// Handles multiple Cookie headers (some proxies fold/duplicate headers).
/// Uses `get_all` to collect all Cookie header values.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);

    // Iterate over all Cookie headers (proxies may send multiple)
    for header_value in headers.get_all("cookie") {
        if let Ok(cookie_str) = header_value.to_str() {
            if let Some(value) = cookie_str
                .split(';')
                .map(|c| c.trim())
                .find(|c| c.starts_with(&prefix))
                .and_then(|c| c.strip_prefix(&prefix))
            {
                return Some(value.to_string());
            }
        }
    }
    None
}

// =============================================================================
// Cookie Construction
// =============================================================================

fn cookie(config: &Config, name: &str, value: &str, path: &str, max_age: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path={}; Max-Age={}; SameSite=Lax{}{}",
        name,
        value,
        path,
        max_age,
        config.cookie_domain_attr(),
        config.cookie_secure_flag()
    )
}

pub fn session_cookie(config: &Config, token: &str, max_age: i64) -> String {
    cookie(config, SESSION_COOKIE, token, "/", max_age)
}

pub fn context_cookie(config: &Config, context: &str) -> String {
    cookie(config, CONTEXT_COOKIE, context, "/", CONTEXT_MAX_AGE_SECS)
}

/// Short-lived cookie scoped to `/auth` for the sign-in round trip
pub fn flow_cookie(config: &Config, name: &str, value: &str) -> String {
    cookie(config, name, value, "/auth", FLOW_MAX_AGE_SECS)
}

/// Expire a cookie previously set on `path`
pub fn clear_cookie(config: &Config, name: &str, path: &str) -> String {
    cookie(config, name, "", path, 0)
}

/// Create a HeaderValue from a string; cookie values we build are ASCII, but
/// provider-supplied values are not trusted to be.
pub fn header_value(s: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(s).inspect_err(|e| {
        tracing::error!(
            error = %e,
            value_len = s.len(),
            "Failed to create header value"
        );
    })
}

/// New random browser context id
pub fn new_context_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config(production: bool) -> Config {
        Config::from_lookup(|key| {
            let value = match key {
                "ENVIRONMENT" if production => Some("production"),
                "PUBLIC_URL" => Some("http://localhost:3000"),
                "AUTH0_DOMAIN" => Some("tenant.auth0.com"),
                "AUTH0_CLIENT_ID" => Some("client"),
                "AUTH0_CLIENT_SECRET" => Some("secret"),
                "SUPABASE_URL" => Some("https://project.supabase.co"),
                "SUPABASE_ANON_KEY" => Some("anon"),
                _ => None,
            };
            value.map(str::to_string)
        })
        .unwrap()
    }

    #[test]
    fn test_sanitize_accepts_relative_paths() {
        assert_eq!(sanitize_callback_url(Some("/dashboard")), "/dashboard");
        assert_eq!(
            sanitize_callback_url(Some("/dashboard?tab=1")),
            "/dashboard?tab=1"
        );
    }

    #[test]
    fn test_sanitize_rejects_offsite_targets() {
        assert_eq!(sanitize_callback_url(None), DEFAULT_CALLBACK);
        assert_eq!(sanitize_callback_url(Some("")), DEFAULT_CALLBACK);
        assert_eq!(
            sanitize_callback_url(Some("https://evil.example")),
            DEFAULT_CALLBACK
        );
        assert_eq!(sanitize_callback_url(Some("//evil.example")), DEFAULT_CALLBACK);
        assert_eq!(sanitize_callback_url(Some("/\\evil.example")), DEFAULT_CALLBACK);
        assert_eq!(sanitize_callback_url(Some("/a\r\nb")), DEFAULT_CALLBACK);
    }

    #[test]
    fn test_extract_cookie_finds_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("foo=bar; session_token=abc123; baz=qux"),
        );

        let result = extract_cookie(&headers, SESSION_COOKIE);
        assert_eq!(result, Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_cookie_missing_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("foo=bar; baz=qux"));

        assert_eq!(extract_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn test_extract_cookie_no_cookie_header() {
        let headers = HeaderMap::new();
        assert_eq!(extract_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn test_extract_cookie_multiple_headers() {
        // Some proxies send multiple Cookie headers instead of one combined header
        let mut headers = HeaderMap::new();
        headers.append("cookie", HeaderValue::from_static("foo=bar"));
        headers.append(
            "cookie",
            HeaderValue::from_static("client_context=ctx1; baz=qux"),
        );

        assert_eq!(
            extract_cookie(&headers, CONTEXT_COOKIE),
            Some("ctx1".to_string())
        );
    }

    #[test]
    fn test_extract_cookie_prefix_not_confused() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("xsession_token=nope; session_token=yes"),
        );
        assert_eq!(
            extract_cookie(&headers, SESSION_COOKIE),
            Some("yes".to_string())
        );
    }

    #[test]
    fn test_cookie_attributes() {
        let dev = session_cookie(&config(false), "tok", 60);
        assert_eq!(
            dev,
            "session_token=tok; HttpOnly; Path=/; Max-Age=60; SameSite=Lax"
        );

        let prod = flow_cookie(&config(true), STATE_COOKIE, "s");
        assert_eq!(
            prod,
            "oauth_state=s; HttpOnly; Path=/auth; Max-Age=600; SameSite=Lax; Secure"
        );

        let cleared = clear_cookie(&config(false), PKCE_COOKIE, "/auth");
        assert!(cleared.starts_with("oauth_pkce=; HttpOnly; Path=/auth; Max-Age=0"));
    }

    #[test]
    fn test_header_value_rejects_newlines() {
        assert!(header_value("a=b\r\nSet-Cookie: evil").is_err());
        assert!(header_value("a=b").is_ok());
    }

    #[test]
    fn test_context_ids_unique() {
        assert_ne!(new_context_id(), new_context_id());
    }
}
