//! Request dispatch module
//!
//! Entry point for HTTP request processing: method check, conditional
//! headers, static file dispatch and access logging.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, REFERER, SERVER,
    USER_AGENT,
};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    /// Raw (still percent-encoded) URI path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    /// Only set when the client did not also send `If-None-Match`
    pub if_modified_since: Option<&'a str>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    // The request body is never read
    let (parts, _) = req.into_parts();

    let mut response = match parts.method {
        Method::GET | Method::HEAD => {
            let ctx = RequestContext {
                path: parts.uri.path(),
                query: parts.uri.query(),
                is_head: parts.method == Method::HEAD,
                if_modified_since: if_modified_since(&parts.headers),
            };
            static_files::serve_path(&ctx, &state).await
        }
        _ => {
            logger::log_warning(&format!("Method not implemented: {}", parts.method));
            http::build_error_response(StatusCode::NOT_IMPLEMENTED, None)
        }
    };

    if let Ok(server) = HeaderValue::from_str(&state.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if state.access_log {
        log_access(&parts, &response, peer_addr, started, &state.access_log_format);
    }

    Ok(response)
}

/// `If-Modified-Since` is ignored when `If-None-Match` is present
fn if_modified_since(headers: &HeaderMap) -> Option<&str> {
    if headers.contains_key(IF_NONE_MATCH) {
        return None;
    }
    headers.get(IF_MODIFIED_SINCE)?.to_str().ok()
}

fn log_access(
    parts: &Parts,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
    format: &str,
) {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    entry.referer = header_string(&parts.headers, &REFERER);
    entry.user_agent = header_string(&parts.headers, &USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, format);
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
