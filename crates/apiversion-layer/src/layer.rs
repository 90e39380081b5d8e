//! Tower layer running the version pipeline in front of a service
//!
//! For every request the service resolves, parses and validates the version
//! with the configured [`ApiVersionStrategy`]. Failures are answered with the
//! error's JSON response and the inner service is never called. On success the
//! deprecation hook runs, the version is stored in the request extensions as
//! [`RequestedVersion`], and the headers written by the hook are merged into
//! the inner service's response.

use apiversion_core::{ApiVersionStrategy, Response};
use futures_util::future::BoxFuture;
use http::header::LINK;
use http::{HeaderMap, Request};
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{field, info_span, Instrument, Span};

/// Version resolved for the current request
///
/// Inserted into the request extensions by [`ApiVersionService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedVersion<V>(pub V);

impl<V: Clone + Send + Sync + 'static> RequestedVersion<V> {
    /// Version stored on `req`, if the request went through the layer
    pub fn from_request<B>(req: &Request<B>) -> Option<&V> {
        req.extensions().get::<Self>().map(|requested| &requested.0)
    }

    pub fn version(&self) -> &V {
        &self.0
    }

    pub fn into_inner(self) -> V {
        self.0
    }
}

/// Layer applying an [`ApiVersionStrategy`] to a service
///
/// # Example
///
/// ```rust,ignore
/// use apiversion_core::*;
/// use apiversion_layer::ApiVersionLayer;
/// use tower::ServiceBuilder;
///
/// let strategy = DefaultApiVersionStrategy::new(SemanticApiVersionParser)
///     .resolver(HeaderResolver::default())
///     .supported_versions([ApiVersion::v1(), ApiVersion::v2()]);
///
/// let service = ServiceBuilder::new()
///     .layer(ApiVersionLayer::new(strategy))
///     .service(app);
/// ```
pub struct ApiVersionLayer<T> {
    strategy: Arc<T>,
}

impl<T> ApiVersionLayer<T> {
    pub fn new(strategy: T) -> Self {
        Self::from_shared(Arc::new(strategy))
    }

    /// Build the layer around a strategy that is shared elsewhere
    pub fn from_shared(strategy: Arc<T>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &T {
        &self.strategy
    }
}

impl<T> Clone for ApiVersionLayer<T> {
    fn clone(&self) -> Self {
        Self {
            strategy: Arc::clone(&self.strategy),
        }
    }
}

impl<T> fmt::Debug for ApiVersionLayer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiVersionLayer").finish_non_exhaustive()
    }
}

impl<S, T> Layer<S> for ApiVersionLayer<T> {
    type Service = ApiVersionService<S, T>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiVersionService {
            inner,
            strategy: Arc::clone(&self.strategy),
        }
    }
}

/// Service produced by [`ApiVersionLayer`]
pub struct ApiVersionService<S, T> {
    inner: S,
    strategy: Arc<T>,
}

impl<S: Clone, T> Clone for ApiVersionService<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            strategy: Arc::clone(&self.strategy),
        }
    }
}

impl<S, T, B> Service<Request<B>> for ApiVersionService<S, T>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    T: ApiVersionStrategy + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        // Use the instance that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let strategy = Arc::clone(&self.strategy);

        let span = info_span!(
            "api_version",
            method = %req.method(),
            path = %req.uri().path(),
            version = field::Empty,
        );

        Box::pin(
            async move {
                let (mut parts, body) = req.into_parts();

                let version = match strategy.resolve_parse_and_validate(&parts).await {
                    Ok(version) => version,
                    Err(err) => {
                        tracing::info!(
                            error = %err,
                            error_type = err.error_type(),
                            "request rejected"
                        );
                        return Ok(err.into_response());
                    }
                };
                Span::current().record("version", field::display(&version));

                let mut deprecation_headers = HeaderMap::new();
                strategy.handle_deprecations(&version, &inner, &parts, &mut deprecation_headers);
                if !deprecation_headers.is_empty() {
                    tracing::debug!("deprecated API version requested");
                }

                parts.extensions.insert(RequestedVersion(version));

                let mut response = inner.call(Request::from_parts(parts, body)).await?;
                merge_deprecation_headers(response.headers_mut(), deprecation_headers);
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Add deprecation headers to a response
///
/// `Link` values are appended next to the service's own links. Other names
/// replace what the service set.
fn merge_deprecation_headers(target: &mut HeaderMap, headers: HeaderMap) {
    let mut current = None;
    for (name, value) in headers {
        if let Some(name) = name {
            if name != LINK {
                target.remove(&name);
            }
            current = Some(name);
        }
        if let Some(name) = &current {
            target.append(name.clone(), value);
        }
    }
}

impl<S: fmt::Debug, T> fmt::Debug for ApiVersionService<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiVersionService")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
