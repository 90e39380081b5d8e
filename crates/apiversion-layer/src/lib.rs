//! # apiversion-layer
//!
//! Tower middleware for [`apiversion_core`] strategies.
//!
//! [`ApiVersionLayer`] rejects requests whose version is missing, malformed or
//! unsupported with a `400 Bad Request` JSON body, exposes the accepted
//! version to downstream services as [`RequestedVersion`], and adds the
//! deprecation headers produced by the strategy to the response.

mod layer;

pub use layer::{ApiVersionLayer, ApiVersionService, RequestedVersion};
