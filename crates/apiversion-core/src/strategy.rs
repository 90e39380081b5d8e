//! The version resolution strategy
//!
//! [`ApiVersionStrategy`] bundles the four pluggable stages of version
//! handling (resolve, default, parse, validate) and the deprecation hook.
//! Its provided [`resolve_parse_and_validate`] method fixes the order in
//! which the stages run and which error wins:
//!
//! 1. resolve the raw token;
//! 2. without a token, fall back to the default version's string form;
//! 3. parse; a parse failure is [`ApiVersionError::Invalid`] and validation
//!    does not run;
//! 4. validate the value, or its absence;
//! 5. an absent value that passed validation is still
//!    [`ApiVersionError::Missing`].
//!
//! [`resolve_parse_and_validate`]: ApiVersionStrategy::resolve_parse_and_validate

use crate::error::{ApiVersionError, VersionParseError};
use crate::version::Version;
use async_trait::async_trait;
use http::request::Parts;
use http::HeaderMap;
use std::any::Any;

/// Configuration and stages of API version handling for an application
#[async_trait]
pub trait ApiVersionStrategy: Send + Sync {
    /// Parsed version type
    type Version: Version;

    /// Resolve the raw version token from the request
    async fn resolve_version(&self, parts: &Parts) -> Option<String>;

    /// Parse a raw token into a version value
    fn parse_version(&self, token: &str) -> Result<Self::Version, VersionParseError>;

    /// Check the required and supported version policies
    ///
    /// # Errors
    ///
    /// [`ApiVersionError::Missing`] when a version is required but `version`
    /// is `None`; [`ApiVersionError::Unsupported`] when the version is not
    /// supported.
    fn validate_version(
        &self,
        version: Option<&Self::Version>,
        parts: &Parts,
    ) -> Result<(), ApiVersionError>;

    /// Version to use for requests that don't specify one
    fn default_version(&self) -> Option<&Self::Version>;

    /// Resolve, parse and validate the version of a request
    ///
    /// Dropping the returned future before it completes cancels the pipeline;
    /// no later stage runs.
    async fn resolve_parse_and_validate(
        &self,
        parts: &Parts,
    ) -> Result<Self::Version, ApiVersionError> {
        let token = match self.resolve_version(parts).await {
            Some(token) => Some(token),
            None => self.default_version().map(ToString::to_string),
        };

        let version = match token {
            Some(token) => match self.parse_version(&token) {
                Ok(version) => Some(version),
                Err(source) => {
                    tracing::debug!(version = %token, error = %source, "failed to parse API version");
                    return Err(ApiVersionError::invalid(token, source));
                }
            },
            None => None,
        };

        self.validate_version(version.as_ref(), parts)?;
        version.ok_or(ApiVersionError::Missing)
    }

    /// Signal deprecation of `version` on the response, if it applies
    ///
    /// `handler` is the downstream handler chosen for the request and is
    /// passed through untouched.
    fn handle_deprecations(
        &self,
        version: &Self::Version,
        handler: &dyn Any,
        parts: &Parts,
        response_headers: &mut HeaderMap,
    );
}
