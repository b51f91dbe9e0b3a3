//! Web discovery and acquisition utilities.
//!
//! - Serper (Google) search client (`serper`) for discovery
//! - Page fetcher trait and HTTP-backed implementation (`fetch`)
//! - HTML to visible-text extraction (`extract`)

pub mod extract;
pub mod fetch;
pub mod serper;
