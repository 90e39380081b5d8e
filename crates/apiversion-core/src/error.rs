//! Error types for API version resolution

use bytes::Bytes;
use http::{header, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use thiserror::Error;

/// HTTP response type produced by [`ApiVersionError::into_response`]
pub type Response = http::Response<Full<Bytes>>;

/// Boxed error carried by custom parsers
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to turn a raw token into a version value
#[derive(Debug, Error)]
pub enum VersionParseError {
    /// Empty version string
    #[error("empty version string")]
    Empty,
    /// A segment that should be a number is not
    #[error("invalid number '{segment}' in version")]
    InvalidNumber { segment: String },
    /// The token does not follow the version grammar
    #[error("invalid version format '{version}'")]
    InvalidFormat { version: String },
    /// Error raised by a custom parser
    #[error(transparent)]
    Other(BoxError),
}

impl VersionParseError {
    /// Wrap an arbitrary parser error
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }
}

/// Failure of the resolve, parse and validate pipeline
///
/// Each variant is terminal: the pipeline never recovers from it and the
/// caller is expected to turn it into a client error.
#[derive(Debug, Error)]
pub enum ApiVersionError {
    /// A version is required and none was resolved or defaulted
    #[error("API version is required")]
    Missing,

    /// The resolved token does not conform to the version grammar
    #[error("invalid API version '{version}': {source}")]
    Invalid {
        version: String,
        #[source]
        source: VersionParseError,
    },

    /// The version parsed but is not one the application serves
    #[error("unsupported API version '{version}'")]
    Unsupported { version: String },
}

impl ApiVersionError {
    /// Build an `Invalid` error for `version`
    pub fn invalid(version: impl Into<String>, source: VersionParseError) -> Self {
        Self::Invalid {
            version: version.into(),
            source,
        }
    }

    /// Build an `Unsupported` error for `version`
    pub fn unsupported(version: impl ToString) -> Self {
        Self::Unsupported {
            version: version.to_string(),
        }
    }

    /// HTTP status for this error. All variants are client errors.
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Stable error type identifier used in the response body
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Missing => "missing_api_version",
            Self::Invalid { .. } => "invalid_api_version",
            Self::Unsupported { .. } => "unsupported_api_version",
        }
    }

    /// The offending token, when there is one
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Missing => None,
            Self::Invalid { version, .. } | Self::Unsupported { version } => Some(version),
        }
    }

    /// Render the error as a JSON response
    pub fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::to_vec(&ErrorResponse::from(&self)).unwrap_or_else(|_| {
            br#"{"error":{"type":"internal_error","message":"Failed to serialize error"}}"#.to_vec()
        });

        let mut response = http::Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        response
    }
}

/// JSON representation of an error response
#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    error_type: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl From<&ApiVersionError> for ErrorResponse {
    fn from(err: &ApiVersionError) -> Self {
        Self {
            error: ErrorBody {
                error_type: err.error_type(),
                message: err.to_string(),
                version: err.version().map(str::to_string),
            },
        }
    }
}
