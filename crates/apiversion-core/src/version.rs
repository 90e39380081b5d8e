//! Version values
//!
//! [`Version`] is the bound every parsed version satisfies. [`ApiVersion`] is
//! the semantic `major.minor.patch` implementation shipped with the crate and
//! [`VersionRange`] describes a set of them.

use crate::error::VersionParseError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// An ordered, parsed API version.
///
/// The `Display` output must be accepted again by the parser that produced
/// the value: the pipeline feeds the default version back through the parser
/// in string form.
pub trait Version: Ord + Clone + fmt::Display + fmt::Debug + Send + Sync + 'static {}

impl<T> Version for T where T: Ord + Clone + fmt::Display + fmt::Debug + Send + Sync + 'static {}

/// Semantic `major.minor.patch` version
///
/// Parses from `2`, `v2.1` or `2.1.3`; omitted numbers are zero. Displays
/// in full (`2.1.0`), which is also what [`SemanticApiVersionParser`]
/// accepts back.
///
/// [`SemanticApiVersionParser`]: crate::SemanticApiVersionParser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// `major.0.0`
    pub fn major(major: u32) -> Self {
        Self::new(major, 0, 0)
    }

    pub fn v1() -> Self {
        Self::major(1)
    }

    pub fn v2() -> Self {
        Self::major(2)
    }

    /// Versions sharing a major number are compatible
    pub fn is_compatible_with(&self, other: &ApiVersion) -> bool {
        self.major == other.major
    }

    pub fn satisfies(&self, range: &VersionRange) -> bool {
        range.contains(self)
    }

    /// Shortest `v`-prefixed form: `v1`, `v1.2`, `v1.2.3`
    pub fn as_path_segment(&self) -> String {
        match (self.minor, self.patch) {
            (0, 0) => format!("v{}", self.major),
            (minor, 0) => format!("v{}.{minor}", self.major),
            (minor, patch) => format!("v{}.{minor}.{patch}", self.major),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ApiVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let mut numbers = [0u32; 3];
        let mut count = 0;
        for segment in digits.split('.') {
            if count == numbers.len() {
                return Err(VersionParseError::InvalidFormat {
                    version: s.to_string(),
                });
            }
            numbers[count] = segment
                .parse()
                .map_err(|_| VersionParseError::InvalidNumber {
                    segment: segment.to_string(),
                })?;
            count += 1;
        }

        Ok(ApiVersion::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

/// Set of [`ApiVersion`]s between optional inclusive bounds
///
/// Excluded versions are outside the range even when within the bounds.
/// Usable as a supported-version predicate:
///
/// ```rust,ignore
/// let range = VersionRange::from(ApiVersion::v2()).exclude(ApiVersion::new(2, 3, 0));
/// strategy.supported_if(move |version| range.contains(version))
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<ApiVersion>,
    pub max: Option<ApiVersion>,
    pub excluded: Vec<ApiVersion>,
}

impl VersionRange {
    /// A range with no constraints
    pub fn any() -> Self {
        Self::default()
    }

    /// Every version sharing the given major number
    pub fn major(major: u32) -> Self {
        Self::between(
            ApiVersion::major(major),
            ApiVersion::new(major, u32::MAX, u32::MAX),
        )
    }

    /// Everything from `version` upwards
    pub fn from(version: ApiVersion) -> Self {
        Self {
            min: Some(version),
            ..Self::default()
        }
    }

    /// Everything up to and including `version`
    pub fn until(version: ApiVersion) -> Self {
        Self {
            max: Some(version),
            ..Self::default()
        }
    }

    pub fn between(min: ApiVersion, max: ApiVersion) -> Self {
        Self {
            min: Some(min),
            ..Self::until(max)
        }
    }

    pub fn exclude(mut self, version: ApiVersion) -> Self {
        self.excluded.push(version);
        self
    }

    pub fn contains(&self, version: &ApiVersion) -> bool {
        if self.excluded.contains(version) {
            return false;
        }
        if self.min.as_ref().is_some_and(|min| version < min) {
            return false;
        }
        if self.max.as_ref().is_some_and(|max| version > max) {
            return false;
        }
        true
    }
}
