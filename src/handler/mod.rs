//! Request handler module
//!
//! Maps requests onto the root directory: files, index files, directory
//! listings and the error statuses in between.

pub mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
