//! Static web bundle server with caching disabled.
//!
//! Serves a pre-built web application directory over HTTP/1.x. Every
//! response, errors included, carries
//!
//! ```text
//! Cache-Control: no-cache, no-store, must-revalidate
//! Pragma: no-cache
//! Expires: 0
//! ```
//!
//! so browsers always refetch the bundle.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
