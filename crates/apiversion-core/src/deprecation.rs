//! Deprecation signalling
//!
//! Once a version has been resolved and validated, the strategy hands it to
//! an [`ApiVersionDeprecationHandler`] together with the handler chosen for
//! the request. The handler annotates the response; it cannot fail the
//! request.
//!
//! [`StandardDeprecationHandler`] emits the usual headers:
//!
//! | Header | Value |
//! |--------|-------|
//! | `Deprecation` | `@<unix seconds>` (RFC 9745), or `true` without a date |
//! | `Sunset` | HTTP date (RFC 8594) |
//! | `Link` | `<url>; rel="deprecation"` and `<url>; rel="sunset"` |
//! | `X-Deprecation-Notice` | free-form message |

use crate::version::Version;
use chrono::{DateTime, Utc};
use http::header::{HeaderName, HeaderValue, LINK};
use http::request::Parts;
use http::HeaderMap;
use std::any::Any;
use std::collections::BTreeMap;

static DEPRECATION: HeaderName = HeaderName::from_static("deprecation");
static SUNSET: HeaderName = HeaderName::from_static("sunset");
static DEPRECATION_NOTICE: HeaderName = HeaderName::from_static("x-deprecation-notice");

/// Signal that a resolved version is deprecated
pub trait ApiVersionDeprecationHandler<V: Version>: Send + Sync {
    /// Annotate `response_headers` if `version` is deprecated
    ///
    /// `handler` is the downstream handler selected for the request. It is
    /// opaque to the versioning layer; implementations may downcast it.
    fn handle_version(
        &self,
        version: &V,
        handler: &dyn Any,
        parts: &Parts,
        response_headers: &mut HeaderMap,
    );
}

/// Deprecation details for one version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeprecationInfo {
    /// When the version was (or will be) deprecated
    pub deprecation_date: Option<DateTime<Utc>>,
    /// When the version stops being served
    pub sunset_date: Option<DateTime<Utc>>,
    /// Documentation about the deprecation
    pub deprecation_link: Option<String>,
    /// Documentation about the sunset
    pub sunset_link: Option<String>,
    /// Deprecation message
    pub message: Option<String>,
}

impl DeprecationInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deprecation date
    pub fn deprecated_at(mut self, date: DateTime<Utc>) -> Self {
        self.deprecation_date = Some(date);
        self
    }

    /// Set a sunset date
    pub fn with_sunset(mut self, date: DateTime<Utc>) -> Self {
        self.sunset_date = Some(date);
        self
    }

    /// Link to deprecation documentation
    pub fn with_deprecation_link(mut self, url: impl Into<String>) -> Self {
        self.deprecation_link = Some(url.into());
        self
    }

    /// Link to sunset documentation
    pub fn with_sunset_link(mut self, url: impl Into<String>) -> Self {
        self.sunset_link = Some(url.into());
        self
    }

    /// Add a deprecation message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Write the deprecation headers for this version
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        let deprecation = match self.deprecation_date {
            Some(date) => format!("@{}", date.timestamp()),
            None => "true".to_string(),
        };
        insert(headers, &DEPRECATION, deprecation);

        if let Some(date) = self.sunset_date {
            insert(headers, &SUNSET, http_date(date));
        }
        if let Some(url) = &self.deprecation_link {
            append(headers, &LINK, link(url, "deprecation"));
        }
        if let Some(url) = &self.sunset_link {
            append(headers, &LINK, link(url, "sunset"));
        }
        if let Some(message) = &self.message {
            insert(headers, &DEPRECATION_NOTICE, message.clone());
        }
    }
}

fn http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn link(url: &str, rel: &str) -> String {
    format!("<{url}>; rel=\"{rel}\"; type=\"text/html\"")
}

fn header_value(name: &HeaderName, value: String) -> Option<HeaderValue> {
    match HeaderValue::try_from(value) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(header = %name, error = %err, "skipping invalid deprecation header value");
            None
        }
    }
}

fn insert(headers: &mut HeaderMap, name: &HeaderName, value: String) {
    if let Some(value) = header_value(name, value) {
        headers.insert(name.clone(), value);
    }
}

fn append(headers: &mut HeaderMap, name: &HeaderName, value: String) {
    if let Some(value) = header_value(name, value) {
        headers.append(name.clone(), value);
    }
}

/// Deprecation handler driven by per-version [`DeprecationInfo`]
///
/// # Example
///
/// ```rust,ignore
/// let handler = StandardDeprecationHandler::new().version(
///     ApiVersion::v1(),
///     DeprecationInfo::new()
///         .with_sunset(sunset)
///         .with_deprecation_link("https://example.com/migrate-to-v2"),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct StandardDeprecationHandler<V> {
    versions: BTreeMap<V, DeprecationInfo>,
}

impl<V: Version> StandardDeprecationHandler<V> {
    pub fn new() -> Self {
        Self {
            versions: BTreeMap::new(),
        }
    }

    /// Mark `version` as deprecated
    pub fn version(mut self, version: V, info: DeprecationInfo) -> Self {
        self.versions.insert(version, info);
        self
    }

    /// Check if a version is deprecated
    pub fn is_deprecated(&self, version: &V) -> bool {
        self.versions.contains_key(version)
    }

    /// Get deprecation info for a version
    pub fn deprecation_info(&self, version: &V) -> Option<&DeprecationInfo> {
        self.versions.get(version)
    }
}

impl<V: Version> Default for StandardDeprecationHandler<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Version> ApiVersionDeprecationHandler<V> for StandardDeprecationHandler<V> {
    fn handle_version(
        &self,
        version: &V,
        _handler: &dyn Any,
        parts: &Parts,
        response_headers: &mut HeaderMap,
    ) {
        if let Some(info) = self.versions.get(version) {
            tracing::debug!(%version, path = %parts.uri.path(), "deprecated API version requested");
            info.write_headers(response_headers);
        }
    }
}
