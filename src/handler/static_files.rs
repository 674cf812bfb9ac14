//! Static file serving module
//!
//! Maps request paths onto the root directory and builds file, redirect,
//! listing and error responses.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, date, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Why a request path could not be mapped under the root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// A segment tried to leave the root (`..`, embedded separators)
    Traversal,
    /// A segment is not valid UTF-8 or contains a NUL byte
    Invalid,
}

/// Map a request path onto the root directory.
///
/// The path is split on `/` before percent-decoding, so `%2F` can never
/// introduce a new path component. Empty and `.` segments are skipped.
pub fn resolve_path(root: &Path, uri_path: &str) -> Result<PathBuf, PathError> {
    let mut resolved = root.to_path_buf();

    for raw in uri_path.split('/') {
        let segment = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| PathError::Invalid)?;

        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment.contains('\0') {
            return Err(PathError::Invalid);
        }
        if segment.contains(|c| c == '/' || c == '\\') {
            return Err(PathError::Traversal);
        }

        let mut components = Path::new(segment.as_ref()).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => resolved.push(part),
            _ => return Err(PathError::Traversal),
        }
    }

    Ok(resolved)
}

/// Serve whatever the request path points at under the root
pub async fn serve_path(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    let candidate = match resolve_path(&state.root, ctx.path) {
        Ok(p) => p,
        Err(PathError::Traversal) => {
            logger::log_warning(&format!("Path traversal attempt blocked: {}", ctx.path));
            return http::build_error_response(StatusCode::FORBIDDEN, None);
        }
        Err(PathError::Invalid) => {
            return http::build_error_response(StatusCode::NOT_FOUND, None);
        }
    };

    // File not found is common (404), no need to log it
    let metadata = match fs::metadata(&candidate).await {
        Ok(m) => m,
        Err(e) => return lookup_error_response(&e),
    };

    if let Some(response) = escape_response(ctx, state, &candidate).await {
        return response;
    }

    if metadata.is_dir() {
        serve_directory(ctx, state, &candidate).await
    } else if ctx.path.ends_with('/') {
        // A file addressed like a directory
        http::build_error_response(StatusCode::NOT_FOUND, None)
    } else {
        serve_file(ctx, &candidate, &metadata).await
    }
}

/// Error response when `path` cannot be served from under the root.
///
/// Symlinks may point anywhere; the canonical target must still live under
/// root or the request is refused with 403.
async fn escape_response(
    ctx: &RequestContext<'_>,
    state: &AppState,
    path: &Path,
) -> Option<Response<Full<Bytes>>> {
    match fs::canonicalize(path).await {
        Ok(real) if real.starts_with(&state.root) => None,
        Ok(real) => {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {} -> {}",
                ctx.path,
                real.display()
            ));
            Some(http::build_error_response(StatusCode::FORBIDDEN, None))
        }
        Err(e) => Some(lookup_error_response(&e)),
    }
}

/// Serve a directory: redirect to the slash form, then index file, then listing
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    dir: &Path,
) -> Response<Full<Bytes>> {
    if !ctx.path.ends_with('/') {
        let location = match ctx.query {
            Some(q) => format!("{}/?{q}", ctx.path),
            None => format!("{}/", ctx.path),
        };
        return http::build_redirect_response(&location);
    }

    for index_file in &state.http.index_files {
        let index_path = dir.join(index_file);
        if let Ok(m) = fs::metadata(&index_path).await {
            if m.is_file() {
                if let Some(response) = escape_response(ctx, state, &index_path).await {
                    return response;
                }
                return serve_file(ctx, &index_path, &m).await;
            }
        }
    }

    if state.http.directory_listing {
        listing::serve_listing(ctx, dir).await
    } else {
        http::build_error_response(StatusCode::NOT_FOUND, None)
    }
}

/// Serve a single regular file
async fn serve_file(
    ctx: &RequestContext<'_>,
    path: &Path,
    metadata: &Metadata,
) -> Response<Full<Bytes>> {
    let modified = metadata.modified().ok();

    if let (Some(mtime), Some(since)) = (modified, ctx.if_modified_since) {
        if date::not_modified_since(mtime, since) {
            return http::build_304_response();
        }
    }

    let (data, content_length) = if ctx.is_head {
        // Still open the file so HEAD reports the same errors as GET
        if let Err(e) = fs::File::open(path).await {
            return read_error_response(path, &e);
        }
        (Bytes::new(), metadata.len())
    } else {
        match fs::read(path).await {
            Ok(c) => {
                let len = c.len() as u64;
                (Bytes::from(c), len)
            }
            Err(e) => return read_error_response(path, &e),
        }
    };

    let last_modified = modified.map(date::format_http_date);
    http::build_file_response(
        data,
        content_length,
        mime::content_type_for(path),
        last_modified.as_deref(),
    )
}

/// Status for a failed metadata lookup
fn lookup_error_response(e: &io::Error) -> Response<Full<Bytes>> {
    if e.kind() == io::ErrorKind::PermissionDenied {
        http::build_error_response(StatusCode::FORBIDDEN, None)
    } else {
        http::build_error_response(StatusCode::NOT_FOUND, None)
    }
}

/// Status for a failure while opening or reading a file that exists
fn read_error_response(path: &Path, e: &io::Error) -> Response<Full<Bytes>> {
    match e.kind() {
        io::ErrorKind::NotFound => http::build_error_response(StatusCode::NOT_FOUND, None),
        io::ErrorKind::PermissionDenied => {
            http::build_error_response(StatusCode::FORBIDDEN, None)
        }
        _ => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            http::build_error_response(StatusCode::INTERNAL_SERVER_ERROR, None)
        }
    }
}
