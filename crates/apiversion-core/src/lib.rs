//! # apiversion-core
//!
//! Resolves, parses and validates the API version of an incoming request and
//! signals when the version is deprecated.
//!
//! The entry point is [`ApiVersionStrategy`]. Its provided
//! [`resolve_parse_and_validate`](ApiVersionStrategy::resolve_parse_and_validate)
//! method runs the pipeline:
//!
//! ```text
//! resolve token ──none──▶ default version ──none──▶ validate(None) ──▶ Missing
//!      │                        │
//!      └──────────┬─────────────┘
//!                 ▼
//!               parse ──error──▶ Invalid
//!                 ▼
//!            validate ──error──▶ Missing / Unsupported
//!                 ▼
//!              version
//! ```
//!
//! [`DefaultApiVersionStrategy`] is the stock implementation, built from
//! [resolvers](resolver), a [parser](ApiVersionParser), version policies and
//! an optional [deprecation handler](ApiVersionDeprecationHandler).
//!
//! # Example
//!
//! ```rust,ignore
//! use apiversion_core::*;
//!
//! let strategy = DefaultApiVersionStrategy::new(SemanticApiVersionParser)
//!     .resolver(HeaderResolver::new("X-API-Version"))
//!     .resolver(QueryParamResolver::new("version"))
//!     .default_version(ApiVersion::v1())
//!     .supported_version(ApiVersion::v2());
//!
//! let version = strategy.resolve_parse_and_validate(&parts).await?;
//! ```

pub mod config;
mod default_strategy;
mod deprecation;
mod error;
mod parser;
pub mod resolver;
mod strategy;
mod version;

pub use config::{ConfigError, VersioningConfig};
pub use default_strategy::DefaultApiVersionStrategy;
pub use deprecation::{ApiVersionDeprecationHandler, DeprecationInfo, StandardDeprecationHandler};
pub use error::{ApiVersionError, BoxError, Response, VersionParseError};
pub use parser::{ApiVersionParser, SemanticApiVersionParser};
pub use resolver::{
    ApiVersionResolver, HeaderResolver, InvalidPathPattern, MediaTypeParamResolver,
    PathPatternResolver, PathSegmentResolver, QueryParamResolver, SyncApiVersionResolver,
};
pub use strategy::ApiVersionStrategy;
pub use version::{ApiVersion, Version, VersionRange};
