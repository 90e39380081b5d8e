//! Version parsing
//!
//! A parser turns a raw token into an ordered [`Version`] value. Parsing must
//! be deterministic: equal tokens always produce equal values.

use crate::error::VersionParseError;
use crate::version::{ApiVersion, Version};

/// Parse a raw version token into a version value
pub trait ApiVersionParser<V: Version>: Send + Sync {
    /// Parse `token`, failing when it does not follow the version grammar
    fn parse_version(&self, token: &str) -> Result<V, VersionParseError>;
}

impl<V, F> ApiVersionParser<V> for F
where
    V: Version,
    F: Fn(&str) -> Result<V, VersionParseError> + Send + Sync,
{
    fn parse_version(&self, token: &str) -> Result<V, VersionParseError> {
        self(token)
    }
}

/// Parser for semantic `major[.minor[.patch]]` versions
///
/// Accepts an optional `v`/`V` prefix and surrounding whitespace. Missing
/// minor and patch numbers default to zero, so `"2"`, `"v2.0"` and `"2.0.0"`
/// all parse to the same value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticApiVersionParser;

impl ApiVersionParser<ApiVersion> for SemanticApiVersionParser {
    fn parse_version(&self, token: &str) -> Result<ApiVersion, VersionParseError> {
        token.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn semantic_parser_normalizes_short_forms() {
        let parser = SemanticApiVersionParser;
        let expected = ApiVersion::new(2, 0, 0);

        for token in ["2", "v2", "2.0", "V2.0.0"] {
            assert_eq!(parser.parse_version(token).unwrap(), expected, "{token}");
        }
    }

    #[test]
    fn closures_are_parsers() {
        let parser = |token: &str| -> Result<u32, VersionParseError> {
            token.parse().map_err(VersionParseError::other)
        };

        assert_eq!(parser.parse_version("7").unwrap(), 7);
        assert!(matches!(
            parser.parse_version("seven"),
            Err(VersionParseError::Other(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_parsing_is_deterministic(
            major in 0u32..1000,
            minor in proptest::option::of(0u32..1000),
            patch in 0u32..1000,
            prefix in prop::sample::select(vec!["", "v", "V"]),
        ) {
            let token = match minor {
                Some(minor) => format!("{prefix}{major}.{minor}.{patch}"),
                None => format!("{prefix}{major}"),
            };
            let parser = SemanticApiVersionParser;

            let first = parser.parse_version(&token).unwrap();
            let second = parser.parse_version(&token).unwrap();
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.major, major);
        }

        #[test]
        fn prop_garbage_never_panics(token in "\\PC{0,16}") {
            let parser = SemanticApiVersionParser;
            let _ = parser.parse_version(&token);
        }
    }
}
