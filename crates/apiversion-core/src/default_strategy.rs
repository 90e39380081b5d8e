//! Default strategy implementation

use crate::deprecation::ApiVersionDeprecationHandler;
use crate::error::{ApiVersionError, VersionParseError};
use crate::parser::ApiVersionParser;
use crate::resolver::ApiVersionResolver;
use crate::strategy::ApiVersionStrategy;
use crate::version::Version;
use async_trait::async_trait;
use http::request::Parts;
use http::HeaderMap;
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

type SupportedPredicate<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Strategy assembled from resolvers, a parser and version policies
///
/// Resolvers are consulted in registration order; the first token found
/// wins. A version is supported when it is listed explicitly, was declared by
/// a route mapping (while detection is enabled), or matches the
/// [`supported_if`](Self::supported_if) predicate.
///
/// # Example
///
/// ```rust,ignore
/// use apiversion_core::*;
///
/// let strategy = DefaultApiVersionStrategy::new(SemanticApiVersionParser)
///     .resolver(HeaderResolver::new("X-API-Version"))
///     .default_version(ApiVersion::v1())
///     .supported_versions([ApiVersion::v1(), ApiVersion::v2()]);
/// ```
pub struct DefaultApiVersionStrategy<V: Version, P> {
    resolvers: Vec<Box<dyn ApiVersionResolver>>,
    parser: P,
    required: Option<bool>,
    default_version: Option<V>,
    supported: BTreeSet<V>,
    detect_supported: bool,
    detected: BTreeSet<V>,
    supported_if: Option<SupportedPredicate<V>>,
    deprecation_handler: Option<Box<dyn ApiVersionDeprecationHandler<V>>>,
}

impl<V, P> DefaultApiVersionStrategy<V, P>
where
    V: Version,
    P: ApiVersionParser<V>,
{
    /// Create a strategy with no resolvers and no supported versions
    pub fn new(parser: P) -> Self {
        Self {
            resolvers: Vec::new(),
            parser,
            required: None,
            default_version: None,
            supported: BTreeSet::new(),
            detect_supported: true,
            detected: BTreeSet::new(),
            supported_if: None,
            deprecation_handler: None,
        }
    }

    /// Add a resolver, consulted after the ones already registered
    pub fn resolver<R>(mut self, resolver: R) -> Self
    where
        R: ApiVersionResolver + 'static,
    {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Require a version on every request
    ///
    /// When not set, a version is required exactly when there is no default.
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Set the default version; it is also treated as supported
    pub fn default_version(mut self, version: V) -> Self {
        self.supported.insert(version.clone());
        self.default_version = Some(version);
        self
    }

    /// Add a supported version
    pub fn supported_version(mut self, version: V) -> Self {
        self.supported.insert(version);
        self
    }

    /// Add several supported versions
    pub fn supported_versions(mut self, versions: impl IntoIterator<Item = V>) -> Self {
        self.supported.extend(versions);
        self
    }

    /// Treat versions matching `predicate` as supported
    pub fn supported_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.supported_if = Some(Arc::new(predicate));
        self
    }

    /// Whether versions declared by route mappings count as supported
    pub fn detect_supported_versions(mut self, detect: bool) -> Self {
        self.detect_supported = detect;
        self
    }

    /// Set the handler that signals deprecated versions
    pub fn deprecation_handler<H>(mut self, handler: H) -> Self
    where
        H: ApiVersionDeprecationHandler<V> + 'static,
    {
        self.deprecation_handler = Some(Box::new(handler));
        self
    }

    /// Record a version declared by a route mapping
    ///
    /// Called while routes are registered, before the strategy is shared.
    pub fn add_mapped_version(&mut self, version: V) {
        self.detected.insert(version);
    }

    /// Whether a request must carry a version
    pub fn is_version_required(&self) -> bool {
        self.required.unwrap_or(self.default_version.is_none())
    }

    /// Check if a version is supported
    pub fn is_supported_version(&self, version: &V) -> bool {
        self.supported.contains(version)
            || (self.detect_supported && self.detected.contains(version))
            || self
                .supported_if
                .as_ref()
                .is_some_and(|predicate| predicate(version))
    }

    /// Explicitly supported versions, in ascending order
    pub fn supported(&self) -> impl Iterator<Item = &V> {
        self.supported.iter()
    }

    /// Versions declared by route mappings, in ascending order
    pub fn detected_versions(&self) -> impl Iterator<Item = &V> {
        self.detected.iter()
    }

    /// Number of registered resolvers
    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }
}

#[async_trait]
impl<V, P> ApiVersionStrategy for DefaultApiVersionStrategy<V, P>
where
    V: Version,
    P: ApiVersionParser<V>,
{
    type Version = V;

    async fn resolve_version(&self, parts: &Parts) -> Option<String> {
        for resolver in &self.resolvers {
            if let Some(token) = resolver.resolve(parts).await {
                tracing::trace!(version = %token, "resolved API version token");
                return Some(token);
            }
        }
        None
    }

    fn parse_version(&self, token: &str) -> Result<V, VersionParseError> {
        self.parser.parse_version(token)
    }

    fn validate_version(&self, version: Option<&V>, _parts: &Parts) -> Result<(), ApiVersionError> {
        match version {
            None if self.is_version_required() => Err(ApiVersionError::Missing),
            None => Ok(()),
            Some(version) if self.is_supported_version(version) => Ok(()),
            Some(version) => {
                tracing::debug!(%version, "unsupported API version requested");
                Err(ApiVersionError::unsupported(version))
            }
        }
    }

    fn default_version(&self) -> Option<&V> {
        self.default_version.as_ref()
    }

    fn handle_deprecations(
        &self,
        version: &V,
        handler: &dyn Any,
        parts: &Parts,
        response_headers: &mut HeaderMap,
    ) {
        if let Some(deprecation_handler) = &self.deprecation_handler {
            deprecation_handler.handle_version(version, handler, parts, response_headers);
        }
    }
}

impl<V: Version, P> fmt::Debug for DefaultApiVersionStrategy<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultApiVersionStrategy")
            .field("resolvers", &self.resolvers.len())
            .field("required", &self.required)
            .field("default_version", &self.default_version)
            .field("supported", &self.supported)
            .field("detect_supported", &self.detect_supported)
            .field("detected", &self.detected)
            .field("deprecation_handler", &self.deprecation_handler.is_some())
            .finish()
    }
}
