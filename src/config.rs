//! Client instance configuration and how it merges with per-call options.

use crate::options::RequestOptions;
use std::collections::BTreeMap;

/// Defaults shared by every call made through a [`Client`](crate::Client).
///
/// # Examples
///
/// ```
/// use curlew::{InstanceConfig, RequestOptions};
///
/// let config = InstanceConfig::new()
///     .with_base_url("https://api.example.com")
///     .with_header("Authorization", "Bearer token");
///
/// assert_eq!(config.resolve_url("/users"), "https://api.example.com/users");
///
/// let options = RequestOptions::new().with_header("Accept", "application/json");
/// let merged = config.merge_into(options);
/// assert_eq!(merged.headers.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceConfig {
    /// Prefix prepended verbatim to every call URL.
    pub base_url: Option<String>,

    /// Headers sent with every call unless the call overrides them.
    pub headers: BTreeMap<String, String>,

    /// Proxy used unless the call names its own.
    pub proxy: Option<String>,
}

impl InstanceConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Adds a default header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the default proxy.
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Prefixes `url` with the base URL.
    ///
    /// This is plain concatenation: no slashes are added or removed.
    pub fn resolve_url(&self, url: &str) -> String {
        match self.base_url.as_deref() {
            Some(base) if !base.is_empty() => format!("{}{}", base, url),
            _ => url.to_string(),
        }
    }

    /// Layers `options` over this configuration.
    ///
    /// Headers are unioned with the call's value winning on a conflict.
    /// Header names are compared ignoring ASCII case, and the winning entry
    /// keeps the call's spelling. The proxy comes from the call when it sets
    /// one. Everything else is the call's own. Neither side is modified.
    pub fn merge_into(&self, options: RequestOptions) -> RequestOptions {
        RequestOptions {
            headers: merge_headers(&self.headers, &options.headers),
            proxy: options.proxy.clone().or_else(|| self.proxy.clone()),
            ..options
        }
    }

    /// Layers `overlay` over this configuration, with the same precedence as
    /// [`InstanceConfig::merge_into`].
    pub fn merged_with(&self, overlay: &InstanceConfig) -> InstanceConfig {
        InstanceConfig {
            base_url: overlay.base_url.clone().or_else(|| self.base_url.clone()),
            headers: merge_headers(&self.headers, &overlay.headers),
            proxy: overlay.proxy.clone().or_else(|| self.proxy.clone()),
        }
    }
}

/// Unions two header maps; on a shared name the `overlay` entry wins.
///
/// Names are matched ignoring ASCII case, so `Authorization` in `base` is
/// replaced by `authorization` in `overlay` rather than sent twice.
pub fn merge_headers(
    base: &BTreeMap<String, String>,
    overlay: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = base
        .iter()
        .filter(|(name, _)| !overlay.keys().any(|o| o.eq_ignore_ascii_case(name)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_headers_are_unioned() {
        let config = InstanceConfig::new().with_header("A", "1");
        let merged = config.merge_into(RequestOptions::new().with_header("B", "2"));

        assert_eq!(merged.headers.get("A").map(String::as_str), Some("1"));
        assert_eq!(merged.headers.get("B").map(String::as_str), Some("2"));
        assert_eq!(merged.headers.len(), 2);
    }

    #[test]
    fn test_call_side_wins_on_conflict() {
        let config = InstanceConfig::new().with_header("A", "1");
        let merged = config.merge_into(RequestOptions::new().with_header("A", "2"));

        assert_eq!(merged.headers.get("A").map(String::as_str), Some("2"));
        assert_eq!(merged.headers.len(), 1);
        // the instance keeps its own value
        assert_eq!(config.headers.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_header_names_match_ignoring_case() {
        let config = InstanceConfig::new()
            .with_header("Authorization", "Bearer instance")
            .with_header("Accept", "text/plain");
        let options = RequestOptions::new()
            .with_header("authorization", "Bearer call");
        let merged = config.merge_into(options);

        assert_eq!(merged.headers.len(), 2);
        assert_eq!(
            merged.headers.get("authorization").map(String::as_str),
            Some("Bearer call")
        );
        assert!(!merged.headers.contains_key("Authorization"));
        assert_eq!(config.headers.len(), 2);
    }

    #[test]
    fn test_proxy_precedence() {
        let config = InstanceConfig::new().with_proxy("http://instance:1");

        let merged = config.merge_into(RequestOptions::new());
        assert_eq!(merged.proxy.as_deref(), Some("http://instance:1"));

        let merged = config.merge_into(RequestOptions::new().with_proxy("http://call:2"));
        assert_eq!(merged.proxy.as_deref(), Some("http://call:2"));
    }

    #[test]
    fn test_call_only_fields_pass_through() {
        let config = InstanceConfig::new().with_header("A", "1");
        let merged = config.merge_into(
            RequestOptions::new()
                .with_method(Method::PUT)
                .with_body("x")
                .with_max_retries(9),
        );

        assert_eq!(merged.method, Method::PUT);
        assert_eq!(merged.max_retries, 9);
        assert!(merged.body.is_some());
    }

    #[test]
    fn test_resolve_url_is_plain_concatenation() {
        let config = InstanceConfig::new().with_base_url("https://api.example.com");
        assert_eq!(
            config.resolve_url("/users"),
            "https://api.example.com/users"
        );
        assert_eq!(config.resolve_url("users"), "https://api.example.comusers");

        assert_eq!(InstanceConfig::new().resolve_url("/users"), "/users");
        assert_eq!(
            InstanceConfig::new()
                .with_base_url("")
                .resolve_url("/users"),
            "/users"
        );
    }

    #[test]
    fn test_merged_with() {
        let base = InstanceConfig::new()
            .with_base_url("https://a")
            .with_header("A", "1")
            .with_header("B", "1")
            .with_proxy("http://p");
        let overlay = InstanceConfig::new()
            .with_base_url("https://b")
            .with_header("B", "2");

        let merged = base.merged_with(&overlay);
        assert_eq!(merged.base_url.as_deref(), Some("https://b"));
        assert_eq!(merged.proxy.as_deref(), Some("http://p"));
        assert_eq!(merged.headers.get("A").map(String::as_str), Some("1"));
        assert_eq!(merged.headers.get("B").map(String::as_str), Some("2"));
    }
}
