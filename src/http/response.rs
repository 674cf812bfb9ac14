//! HTTP response building module
//!
//! Builders for every status the server emits. None of them sets caching
//! headers; those are stamped on afterwards by [`super::NoCache`].

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED, LOCATION};
use hyper::{Response, StatusCode};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Methods the server implements
pub const ALLOWED_METHODS: &str = "GET, HEAD";

/// Build 200 response for a file.
///
/// `content_length` is the file size; for HEAD requests `data` is empty but
/// the length still describes the file.
pub fn build_file_response(
    data: Bytes,
    content_length: u64,
    content_type: &str,
    last_modified: Option<&str>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length);

    if let Some(date) = last_modified {
        builder = builder.header(LAST_MODIFIED, date);
    }

    builder.body(Full::new(data)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        fallback(StatusCode::INTERNAL_SERVER_ERROR)
    })
}

/// Build 200 HTML response (directory listings)
pub fn build_html_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, TEXT_HTML)
        .header(CONTENT_LENGTH, content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Build 304 Not Modified response
pub fn build_304_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            fallback(StatusCode::NOT_MODIFIED)
        })
}

/// Build 301 redirect response (directory requested without trailing slash)
pub fn build_redirect_response(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header(CONTENT_LENGTH, 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Build an error response with a short plain-text body.
///
/// `detail` replaces the canonical reason phrase in the body.
/// 501 responses also advertise the implemented methods.
pub fn build_error_response(status: StatusCode, detail: Option<&str>) -> Response<Full<Bytes>> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let message = format!("{} {}", status.as_u16(), detail.unwrap_or(reason));

    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .header(CONTENT_LENGTH, message.len());

    if status == StatusCode::NOT_IMPLEMENTED || status == StatusCode::METHOD_NOT_ALLOWED {
        builder = builder.header(ALLOW, ALLOWED_METHODS);
    }

    builder.body(Full::new(Bytes::from(message))).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        fallback(status)
    })
}

/// Bare response used when a builder rejects its input
fn fallback(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
