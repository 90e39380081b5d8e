//! Configuration from environment variables
//!
//! [`VersioningConfig`] is read with `envy` from variables prefixed with
//! `API_VERSION_` (field names in SCREAMING_SNAKE_CASE). Call
//! [`load_dotenv`] first to pick up a `.env` file.
//!
//! ```text
//! API_VERSION_HEADER=X-API-Version
//! API_VERSION_DEFAULT_VERSION=1.0
//! API_VERSION_SUPPORTED_VERSIONS=1.0,1.1,2.0
//! ```
//!
//! ```rust,ignore
//! use apiversion_core::{config, DefaultApiVersionStrategy, SemanticApiVersionParser, VersioningConfig};
//!
//! config::load_dotenv();
//! let config = VersioningConfig::from_env()?;
//! let strategy = DefaultApiVersionStrategy::from_config(&config, SemanticApiVersionParser)?;
//! ```

use crate::default_strategy::DefaultApiVersionStrategy;
use crate::error::VersionParseError;
use crate::parser::ApiVersionParser;
use crate::resolver::{
    HeaderResolver, InvalidPathPattern, MediaTypeParamResolver, PathPatternResolver,
    PathSegmentResolver, QueryParamResolver,
};
use crate::version::Version;
use serde::Deserialize;
use thiserror::Error;

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "API_VERSION";

/// Error type for configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed
    #[error("configuration error: {0}")]
    Env(#[from] envy::Error),

    /// A configured version token does not parse
    #[error("invalid version '{value}' in {key}: {source}")]
    InvalidVersion {
        key: &'static str,
        value: String,
        #[source]
        source: VersionParseError,
    },

    /// The configured header name is not a valid HTTP header name
    #[error("invalid header name '{0}'")]
    InvalidHeader(String),

    /// The configured path pattern has no `{version}` placeholder
    #[error(transparent)]
    InvalidPattern(#[from] InvalidPathPattern),

    /// No version source was configured
    #[error("at least one version resolver must be configured")]
    NoResolvers,
}

/// Versioning settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersioningConfig {
    /// Require a version; unset means "required unless a default exists"
    #[serde(default)]
    pub required: Option<bool>,
    /// Version used when the request carries none
    #[serde(default)]
    pub default_version: Option<String>,
    /// Explicitly supported versions
    #[serde(default)]
    pub supported_versions: Vec<String>,
    /// Accept versions declared by route mappings
    #[serde(default = "default_detect")]
    pub detect_supported_versions: bool,
    /// Header carrying the version
    #[serde(default)]
    pub header: Option<String>,
    /// Query parameter carrying the version
    #[serde(default)]
    pub query_param: Option<String>,
    /// Zero-based path segment carrying the version
    #[serde(default)]
    pub path_segment: Option<usize>,
    /// Path pattern with a `{version}` placeholder, e.g. `/v{version}/`
    #[serde(default)]
    pub path_pattern: Option<String>,
    /// Media type whose parameter carries the version
    #[serde(default)]
    pub media_type: Option<String>,
    /// Media type parameter name (defaults to `version`)
    #[serde(default)]
    pub media_type_param: Option<String>,
}

fn default_detect() -> bool {
    true
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            required: None,
            default_version: None,
            supported_versions: Vec::new(),
            detect_supported_versions: default_detect(),
            header: None,
            query_param: None,
            path_segment: None,
            path_pattern: None,
            media_type: None,
            media_type_param: None,
        }
    }
}

impl VersioningConfig {
    /// Load from `API_VERSION_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_prefixed(ENV_PREFIX)
    }

    /// Load from environment variables starting with `<prefix>_`
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, ConfigError> {
        envy::prefixed(format!("{}_", prefix))
            .from_env::<Self>()
            .map_err(ConfigError::from)
    }

    fn has_resolver(&self) -> bool {
        self.header.is_some()
            || self.query_param.is_some()
            || self.path_segment.is_some()
            || self.path_pattern.is_some()
            || self.media_type.is_some()
    }
}

/// Load environment variables from a `.env` file, if present
///
/// Existing variables take precedence.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Load environment variables from a specific file, if present
pub fn load_dotenv_from<P: AsRef<std::path::Path>>(path: P) {
    let _ = dotenvy::from_path(path);
}

fn parse_setting<V, P>(parser: &P, key: &'static str, value: &str) -> Result<V, ConfigError>
where
    V: Version,
    P: ApiVersionParser<V>,
{
    parser
        .parse_version(value)
        .map_err(|source| ConfigError::InvalidVersion {
            key,
            value: value.to_string(),
            source,
        })
}

impl<V, P> DefaultApiVersionStrategy<V, P>
where
    V: Version,
    P: ApiVersionParser<V>,
{
    /// Build a strategy from configuration
    ///
    /// Resolvers are registered in the order header, query parameter, path
    /// segment, path pattern, media type. Every configured version must parse.
    pub fn from_config(config: &VersioningConfig, parser: P) -> Result<Self, ConfigError> {
        if !config.has_resolver() {
            return Err(ConfigError::NoResolvers);
        }

        let default_version = config
            .default_version
            .as_deref()
            .map(|value| parse_setting(&parser, "default_version", value))
            .transpose()?;
        let supported = config
            .supported_versions
            .iter()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(|value| parse_setting(&parser, "supported_versions", value))
            .collect::<Result<Vec<V>, _>>()?;

        let mut strategy = Self::new(parser)
            .supported_versions(supported)
            .detect_supported_versions(config.detect_supported_versions);

        if let Some(version) = default_version {
            strategy = strategy.default_version(version);
        }
        if let Some(required) = config.required {
            strategy = strategy.required(required);
        }
        if let Some(header) = &config.header {
            let resolver = HeaderResolver::try_new(header)
                .map_err(|_| ConfigError::InvalidHeader(header.clone()))?;
            strategy = strategy.resolver(resolver);
        }
        if let Some(param) = &config.query_param {
            strategy = strategy.resolver(QueryParamResolver::new(param.clone()));
        }
        if let Some(index) = config.path_segment {
            strategy = strategy.resolver(PathSegmentResolver::new(index));
        }
        if let Some(pattern) = &config.path_pattern {
            strategy = strategy.resolver(PathPatternResolver::try_new(pattern)?);
        }
        if let Some(media_type) = &config.media_type {
            let param = config.media_type_param.as_deref().unwrap_or("version");
            strategy = strategy.resolver(MediaTypeParamResolver::new(media_type.clone(), param));
        }

        tracing::debug!(
            resolvers = strategy.resolver_count(),
            required = strategy.is_version_required(),
            "API versioning configured"
        );
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SemanticApiVersionParser;
    use crate::version::ApiVersion;
    use serial_test::serial;
    use std::io::Write;

    const VARS: &[&str] = &[
        "API_VERSION_REQUIRED",
        "API_VERSION_DEFAULT_VERSION",
        "API_VERSION_SUPPORTED_VERSIONS",
        "API_VERSION_DETECT_SUPPORTED_VERSIONS",
        "API_VERSION_HEADER",
        "API_VERSION_QUERY_PARAM",
        "API_VERSION_PATH_SEGMENT",
        "API_VERSION_PATH_PATTERN",
        "API_VERSION_MEDIA_TYPE",
        "API_VERSION_MEDIA_TYPE_PARAM",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        clear_env();
        std::env::set_var("API_VERSION_HEADER", "X-API-Version");
        std::env::set_var("API_VERSION_DEFAULT_VERSION", "1.0");
        std::env::set_var("API_VERSION_SUPPORTED_VERSIONS", "1.0,1.1,2.0");
        std::env::set_var("API_VERSION_REQUIRED", "true");

        let config = VersioningConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.header.as_deref(), Some("X-API-Version"));
        assert_eq!(config.default_version.as_deref(), Some("1.0"));
        assert_eq!(config.supported_versions, vec!["1.0", "1.1", "2.0"]);
        assert_eq!(config.required, Some(true));
        assert!(config.detect_supported_versions);
        assert_eq!(config.query_param, None);
    }

    #[test]
    #[serial]
    fn test_config_from_env_prefixed() {
        clear_env();
        std::env::set_var("MYAPP_QUERY_PARAM", "api-version");
        std::env::set_var("MYAPP_DETECT_SUPPORTED_VERSIONS", "false");

        let config = VersioningConfig::from_env_prefixed("MYAPP").unwrap();
        std::env::remove_var("MYAPP_QUERY_PARAM");
        std::env::remove_var("MYAPP_DETECT_SUPPORTED_VERSIONS");

        assert_eq!(config.query_param.as_deref(), Some("api-version"));
        assert!(!config.detect_supported_versions);
    }

    #[test]
    #[serial]
    fn test_config_bad_value() {
        clear_env();
        std::env::set_var("API_VERSION_PATH_SEGMENT", "first");

        let result = VersioningConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(ConfigError::Env(_))));
    }

    #[test]
    #[serial]
    fn test_load_dotenv_from_file() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "API_VERSION_HEADER=X-Version").unwrap();
        writeln!(file, "API_VERSION_DEFAULT_VERSION=2").unwrap();

        load_dotenv_from(file.path());
        let config = VersioningConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.header.as_deref(), Some("X-Version"));
        assert_eq!(config.default_version.as_deref(), Some("2"));
    }

    #[test]
    fn test_strategy_from_config() {
        let config = VersioningConfig {
            header: Some("X-API-Version".to_string()),
            query_param: Some("version".to_string()),
            default_version: Some("1".to_string()),
            supported_versions: vec!["1.1".to_string(), " ".to_string(), "2".to_string()],
            ..VersioningConfig::default()
        };

        let strategy = DefaultApiVersionStrategy::<ApiVersion, _>::from_config(&config, SemanticApiVersionParser)
            .unwrap();

        assert_eq!(strategy.resolver_count(), 2);

        let with_pattern = VersioningConfig {
            path_pattern: Some("/api/{version}/".to_string()),
            ..config
        };
        let strategy =
            DefaultApiVersionStrategy::<ApiVersion, _>::from_config(&with_pattern, SemanticApiVersionParser)
                .unwrap();
        assert_eq!(strategy.resolver_count(), 3);
        assert!(!strategy.is_version_required());
        assert_eq!(
            strategy.supported().copied().collect::<Vec<_>>(),
            vec![ApiVersion::v1(), ApiVersion::new(1, 1, 0), ApiVersion::v2()]
        );
    }

    #[test]
    fn test_strategy_from_config_errors() {
        let no_resolvers = DefaultApiVersionStrategy::<ApiVersion, _>::from_config(
            &VersioningConfig::default(),
            SemanticApiVersionParser,
        );
        assert!(matches!(no_resolvers, Err(ConfigError::NoResolvers)));

        let bad_default = VersioningConfig {
            header: Some("X-API-Version".to_string()),
            default_version: Some("one".to_string()),
            ..VersioningConfig::default()
        };
        let err = DefaultApiVersionStrategy::<ApiVersion, _>::from_config(&bad_default, SemanticApiVersionParser)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVersion { key: "default_version", .. }
        ));

        let bad_pattern = VersioningConfig {
            path_pattern: Some("/api/version/".to_string()),
            ..VersioningConfig::default()
        };
        assert!(matches!(
            DefaultApiVersionStrategy::<ApiVersion, _>::from_config(&bad_pattern, SemanticApiVersionParser),
            Err(ConfigError::InvalidPattern(_))
        ));

        let bad_header = VersioningConfig {
            header: Some("X API Version".to_string()),
            ..VersioningConfig::default()
        };
        assert!(matches!(
            DefaultApiVersionStrategy::<ApiVersion, _>::from_config(&bad_header, SemanticApiVersionParser),
            Err(ConfigError::InvalidHeader(_))
        ));
    }
}
