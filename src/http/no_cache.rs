//! No-cache header decorator
//!
//! Wraps any response-producing service and stamps the three cache-disabling
//! headers onto every response it returns, whatever the status.

use hyper::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use hyper::service::Service;
use hyper::{Request, Response};
use std::future::Future;
use std::pin::Pin;

pub const CACHE_CONTROL_VALUE: &str = "no-cache, no-store, must-revalidate";
pub const PRAGMA_VALUE: &str = "no-cache";
pub const EXPIRES_VALUE: &str = "0";

/// Set the no-cache headers, each exactly once.
///
/// Existing values are dropped first so the three headers always end up last,
/// in this order: `Cache-Control`, `Pragma`, `Expires`.
pub fn apply(headers: &mut HeaderMap) {
    headers.remove(CACHE_CONTROL);
    headers.remove(PRAGMA);
    headers.remove(EXPIRES);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers.insert(PRAGMA, HeaderValue::from_static(PRAGMA_VALUE));
    headers.insert(EXPIRES, HeaderValue::from_static(EXPIRES_VALUE));
}

/// Service wrapper applying [`apply`] after the inner service has finalized
/// its response
#[derive(Debug, Clone)]
pub struct NoCache<S> {
    inner: S,
}

impl<S> NoCache<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for NoCache<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<ReqBody>) -> Self::Future {
        let fut = self.inner.call(req);
        Box::pin(async move {
            let mut response = fut.await?;
            apply(response.headers_mut());
            Ok(response)
        })
    }
}
