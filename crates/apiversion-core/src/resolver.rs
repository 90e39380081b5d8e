//! Raw version token resolution
//!
//! Resolution is asynchronous so that token sources backed by I/O (a remote
//! flag service, a tenant lookup) can suspend without blocking a worker.
//! Most sources only read the request, so they implement
//! [`SyncApiVersionResolver`] instead; every synchronous resolver is also an
//! [`ApiVersionResolver`] whose future completes on first poll.
//!
//! Resolvers treat an empty token as absent.
//!
//! # Example
//!
//! ```rust,ignore
//! use apiversion_core::{HeaderResolver, QueryParamResolver};
//!
//! let strategy = DefaultApiVersionStrategy::new(SemanticApiVersionParser)
//!     .resolver(HeaderResolver::new("X-API-Version"))
//!     .resolver(QueryParamResolver::new("version"))
//!     .resolver(|parts: &Parts| parts.headers.get("x-tenant-version")?.to_str().ok().map(String::from));
//! ```

use async_trait::async_trait;
use http::header::{self, HeaderName, InvalidHeaderName};
use http::request::Parts;
use thiserror::Error;

/// Resolve the raw version token of a request
#[async_trait]
pub trait ApiVersionResolver: Send + Sync {
    /// Resolve the token, or `None` when the request does not carry one
    async fn resolve(&self, parts: &Parts) -> Option<String>;
}

/// Resolve the raw version token of a request without suspending
pub trait SyncApiVersionResolver: Send + Sync {
    /// Resolve the token, or `None` when the request does not carry one
    fn resolve_now(&self, parts: &Parts) -> Option<String>;
}

#[async_trait]
impl<R> ApiVersionResolver for R
where
    R: SyncApiVersionResolver + ?Sized,
{
    async fn resolve(&self, parts: &Parts) -> Option<String> {
        self.resolve_now(parts)
    }
}

impl<F> SyncApiVersionResolver for F
where
    F: Fn(&Parts) -> Option<String> + Send + Sync,
{
    fn resolve_now(&self, parts: &Parts) -> Option<String> {
        self(parts)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Read the version from a request header
///
/// Example: `X-API-Version: 1.0`
#[derive(Debug, Clone)]
pub struct HeaderResolver {
    name: HeaderName,
}

impl HeaderResolver {
    /// Resolve from the named header
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid header name. Use
    /// [`try_new`](Self::try_new) for names read at runtime.
    pub fn new(name: &str) -> Self {
        Self::try_new(name).expect("invalid version header name")
    }

    /// Resolve from the named header, failing on an invalid name
    pub fn try_new(name: &str) -> Result<Self, InvalidHeaderName> {
        HeaderName::try_from(name).map(Self::from_header_name)
    }

    /// Resolve from an already validated header name
    pub fn from_header_name(name: HeaderName) -> Self {
        Self { name }
    }
}

impl Default for HeaderResolver {
    fn default() -> Self {
        Self::from_header_name(HeaderName::from_static("x-api-version"))
    }
}

impl SyncApiVersionResolver for HeaderResolver {
    fn resolve_now(&self, parts: &Parts) -> Option<String> {
        parts
            .headers
            .get(&self.name)
            .and_then(|value| value.to_str().ok())
            .and_then(non_empty)
    }
}

/// Read the version from a query parameter
///
/// Example: `?version=1.0`
#[derive(Debug, Clone)]
pub struct QueryParamResolver {
    param: String,
}

impl QueryParamResolver {
    /// Resolve from the named query parameter
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
        }
    }
}

impl Default for QueryParamResolver {
    fn default() -> Self {
        Self::new("version")
    }
}

impl SyncApiVersionResolver for QueryParamResolver {
    fn resolve_now(&self, parts: &Parts) -> Option<String> {
        parts
            .uri
            .query()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == self.param)
            .and_then(|(_, value)| non_empty(value))
    }
}

/// Read the version from the n-th path segment (zero-based)
///
/// With index `1`, `/api/1.2/users` resolves to `1.2`.
#[derive(Debug, Clone, Copy)]
pub struct PathSegmentResolver {
    index: usize,
}

impl PathSegmentResolver {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl SyncApiVersionResolver for PathSegmentResolver {
    fn resolve_now(&self, parts: &Parts) -> Option<String> {
        parts
            .uri
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .nth(self.index)
            .and_then(non_empty)
    }
}

/// A path pattern without a `{version}` placeholder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("version pattern '{0}' has no {{version}} placeholder")]
pub struct InvalidPathPattern(pub String);

/// Read the version from the path using a `{version}` placeholder pattern
///
/// The pattern is matched against the start of the path: the default
/// `/v{version}/` resolves `/v2/users` to `2` and ignores `/users/v2`. The
/// captured segment must look like a version (a digit, optionally after a
/// `v`), so `/videos/42` resolves to nothing.
#[derive(Debug, Clone)]
pub struct PathPatternResolver {
    before: String,
    after: String,
}

impl PathPatternResolver {
    /// # Panics
    ///
    /// Panics if `pattern` has no `{version}` placeholder. Use
    /// [`try_new`](Self::try_new) for patterns read at runtime.
    pub fn new(pattern: &str) -> Self {
        Self::try_new(pattern).expect("version pattern must contain a {version} placeholder")
    }

    pub fn try_new(pattern: &str) -> Result<Self, InvalidPathPattern> {
        let (before, after) = pattern
            .split_once("{version}")
            .ok_or_else(|| InvalidPathPattern(pattern.to_string()))?;
        Ok(Self {
            before: before.to_string(),
            after: after.to_string(),
        })
    }

    fn extract<'a>(&self, path: &'a str) -> Option<&'a str> {
        let remaining = path.strip_prefix(self.before.as_str())?;
        let end = if self.after.is_empty() {
            remaining.find('/').unwrap_or(remaining.len())
        } else {
            // A trailing separator is optional at the end of the path
            remaining
                .find(self.after.as_str())
                .or_else(|| (!remaining.contains('/')).then_some(remaining.len()))?
        };
        Some(&remaining[..end]).filter(|token| looks_like_version(token))
    }
}

fn looks_like_version(token: &str) -> bool {
    let digits = token.strip_prefix(|c: char| c == 'v' || c == 'V').unwrap_or(token);
    digits.starts_with(|c: char| c.is_ascii_digit())
}

impl Default for PathPatternResolver {
    fn default() -> Self {
        Self {
            before: "/v".to_string(),
            after: "/".to_string(),
        }
    }
}

impl SyncApiVersionResolver for PathPatternResolver {
    fn resolve_now(&self, parts: &Parts) -> Option<String> {
        self.extract(parts.uri.path()).and_then(non_empty)
    }
}

/// Read the version from a media type parameter
///
/// Looks at `Accept` first, then `Content-Type`. With media type
/// `application/vnd.acme+json` and parameter `v`, the header
/// `Accept: application/vnd.acme+json;v=1.1` resolves to `1.1`. A configured
/// subtype of `*` matches any subtype of the same type.
#[derive(Debug, Clone)]
pub struct MediaTypeParamResolver {
    media_type: String,
    param: String,
}

impl MediaTypeParamResolver {
    pub fn new(media_type: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into().to_ascii_lowercase(),
            param: param.into(),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.trim().to_ascii_lowercase();
        if candidate == self.media_type {
            return true;
        }
        match self.media_type.strip_suffix("/*") {
            Some(main_type) => candidate
                .split_once('/')
                .is_some_and(|(candidate_type, _)| candidate_type == main_type),
            None => false,
        }
    }

    fn extract(&self, header_value: &str) -> Option<String> {
        header_value.split(',').find_map(|media_range| {
            let mut pieces = media_range.split(';');
            let media_type = pieces.next()?;
            if !self.matches(media_type) {
                return None;
            }
            pieces
                .filter_map(|param| param.split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case(&self.param))
                .and_then(|(_, value)| non_empty(value.trim().trim_matches('"')))
        })
    }
}

impl SyncApiVersionResolver for MediaTypeParamResolver {
    fn resolve_now(&self, parts: &Parts) -> Option<String> {
        [header::ACCEPT, header::CONTENT_TYPE]
            .iter()
            .flat_map(|name| parts.headers.get_all(name))
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| self.extract(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = http::Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_header_resolver() {
        let resolver = HeaderResolver::default();

        assert_eq!(
            resolver.resolve_now(&parts("/", &[("X-API-Version", "2.0")])),
            Some("2.0".to_string())
        );
        assert_eq!(resolver.resolve_now(&parts("/", &[])), None);
        assert_eq!(
            resolver.resolve_now(&parts("/", &[("X-API-Version", "  ")])),
            None
        );
    }

    #[test]
    fn test_query_resolver() {
        let resolver = QueryParamResolver::default();

        assert_eq!(
            resolver.resolve_now(&parts("/items?foo=bar&version=2.1", &[])),
            Some("2.1".to_string())
        );
        assert_eq!(
            resolver.resolve_now(&parts("/items?api-version=3", &[])),
            None
        );
        assert_eq!(resolver.resolve_now(&parts("/items", &[])), None);
        assert_eq!(resolver.resolve_now(&parts("/items?version=", &[])), None);
    }

    #[test]
    fn test_path_segment_resolver() {
        let resolver = PathSegmentResolver::new(1);

        assert_eq!(
            resolver.resolve_now(&parts("/api/1.2/users", &[])),
            Some("1.2".to_string())
        );
        assert_eq!(resolver.resolve_now(&parts("/api", &[])), None);
    }

    #[test]
    fn test_path_pattern_resolver() {
        let resolver = PathPatternResolver::default();

        assert_eq!(
            resolver.resolve_now(&parts("/v1/users", &[])),
            Some("1".to_string())
        );
        assert_eq!(
            resolver.resolve_now(&parts("/v1.2/items", &[])),
            Some("1.2".to_string())
        );
        assert_eq!(
            resolver.resolve_now(&parts("/v3", &[])),
            Some("3".to_string())
        );
        assert_eq!(resolver.resolve_now(&parts("/users", &[])), None);
        assert_eq!(resolver.resolve_now(&parts("/users/vip", &[])), None);
        assert_eq!(resolver.resolve_now(&parts("/videos/42", &[])), None);
        assert_eq!(resolver.resolve_now(&parts("/vendors", &[])), None);
        assert_eq!(resolver.resolve_now(&parts("/v/users", &[])), None);

        let custom = PathPatternResolver::new("/api/{version}/");
        assert_eq!(
            custom.resolve_now(&parts("/api/2.0/products", &[])),
            Some("2.0".to_string())
        );
        assert_eq!(
            custom.resolve_now(&parts("/api/v2/products", &[])),
            Some("v2".to_string())
        );
        assert_eq!(custom.resolve_now(&parts("/api/products", &[])), None);
    }

    #[test]
    fn test_fallible_constructors() {
        assert!(HeaderResolver::try_new("X-Version").is_ok());
        assert!(HeaderResolver::try_new("X Version").is_err());

        let err = PathPatternResolver::try_new("/api/version/").unwrap_err();
        assert_eq!(err, InvalidPathPattern("/api/version/".to_string()));
        assert_eq!(
            err.to_string(),
            "version pattern '/api/version/' has no {version} placeholder"
        );
    }

    #[test]
    fn test_media_type_param_resolver() {
        let resolver = MediaTypeParamResolver::new("application/vnd.acme+json", "v");

        assert_eq!(
            resolver.resolve_now(&parts(
                "/",
                &[("Accept", "text/html, application/vnd.acme+json; v=\"1.1\"")]
            )),
            Some("1.1".to_string())
        );
        assert_eq!(
            resolver.resolve_now(&parts(
                "/",
                &[("Content-Type", "application/vnd.acme+json;v=2")]
            )),
            Some("2".to_string())
        );
        assert_eq!(
            resolver.resolve_now(&parts("/", &[("Accept", "application/json;v=2")])),
            None
        );

        let wildcard = MediaTypeParamResolver::new("application/*", "version");
        assert_eq!(
            wildcard.resolve_now(&parts("/", &[("Accept", "application/json;version=3")])),
            Some("3".to_string())
        );
    }

    #[tokio::test]
    async fn sync_resolvers_complete_through_async_interface() {
        let request = parts("/v2/users", &[("X-API-Version", "1.0")]);
        let resolvers: Vec<Box<dyn ApiVersionResolver>> = vec![
            Box::new(HeaderResolver::default()),
            Box::new(PathPatternResolver::default()),
        ];

        let header = HeaderResolver::default();
        assert_eq!(
            resolvers[0].resolve(&request).await,
            header.resolve_now(&request)
        );
        assert_eq!(resolvers[1].resolve(&request).await, Some("2".to_string()));
    }

    #[tokio::test]
    async fn closures_are_resolvers() {
        let resolver = |parts: &Parts| {
            let subdomain = parts.uri.host()?.split('.').next()?;
            subdomain.strip_prefix('v').map(str::to_string)
        };

        assert_eq!(
            resolver.resolve(&parts("http://v4.api.example.com/", &[])).await,
            Some("4".to_string())
        );
        assert_eq!(resolver.resolve(&parts("http://api.example.com/", &[])).await, None);
    }
}
