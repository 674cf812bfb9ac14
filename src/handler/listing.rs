//! Directory listing for directories without an index file

use crate::handler::router::RequestContext;
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use tokio::fs;

/// Characters left as-is in listing hrefs
const HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// One row of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// Serve an HTML listing of `dir`
pub async fn serve_listing(ctx: &RequestContext<'_>, dir: &Path) -> Response<Full<Bytes>> {
    match read_entries(dir).await {
        Ok(entries) => {
            let display_path = percent_decode_str(ctx.path).decode_utf8_lossy();
            http::build_html_response(render_listing(&display_path, &entries), ctx.is_head)
        }
        Err(e) => {
            logger::log_warning(&format!(
                "Failed to list directory '{}': {e}",
                dir.display()
            ));
            http::build_error_response(
                StatusCode::NOT_FOUND,
                Some("No permission to list directory"),
            )
        }
    }
}

/// Read directory entries, sorted case-insensitively
async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let is_symlink = entry
            .file_type()
            .await
            .is_ok_and(|t| t.is_symlink());
        // Follows symlinks, so a link to a directory lists as one
        let is_dir = fs::metadata(entry.path())
            .await
            .is_ok_and(|m| m.is_dir());

        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink,
        });
    }

    entries.sort_by_key(|e| e.name.to_lowercase());
    Ok(entries)
}

/// Render the listing page
pub fn render_listing(display_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));
    let mut html = String::new();

    let _ = writeln!(html, "<!DOCTYPE HTML>");
    let _ = writeln!(html, "<html lang=\"en\">");
    let _ = writeln!(html, "<head>");
    let _ = writeln!(html, "<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>{title}</title>");
    let _ = writeln!(html, "</head>");
    let _ = writeln!(html, "<body>");
    let _ = writeln!(html, "<h1>{title}</h1>");
    let _ = writeln!(html, "<hr>");
    let _ = writeln!(html, "<ul>");

    for entry in entries {
        let mut display_name = entry.name.clone();
        let mut link_name = entry.name.clone();
        if entry.is_dir {
            display_name.push('/');
            link_name.push('/');
        }
        if entry.is_symlink {
            display_name = format!("{}@", entry.name);
        }
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            utf8_percent_encode(&link_name, HREF),
            escape_html(&display_name)
        );
    }

    let _ = writeln!(html, "</ul>");
    let _ = writeln!(html, "<hr>");
    let _ = writeln!(html, "</body>");
    let _ = writeln!(html, "</html>");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
