//! HTTP protocol layer module
//!
//! Response builders, MIME detection, HTTP dates and the no-cache header
//! decorator. Nothing here touches the filesystem.

pub mod date;
pub mod mime;
pub mod no_cache;
pub mod response;

// Re-export commonly used types
pub use no_cache::NoCache;
pub use response::{
    build_304_response, build_error_response, build_file_response, build_html_response,
    build_redirect_response,
};
