//! Artifact download and archive extraction
//!
//! ## Module Organization
//!
//! - `core` - streaming HTTP download with timeouts and progress events
//! - `extract` - zip extraction into an installation directory

mod core;
mod extract;

pub use self::core::{Fetch, HttpFetcher};
pub use self::extract::extract_zip;
