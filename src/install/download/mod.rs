//! Package discovery and download
//!
//! ## Module Organization
//!
//! - `platform` - Platform detection and OS/arch keywords
//! - `listing` - Anchor scraping of directory-listing pages
//! - `core` - HTTP fetch of the listing and the package itself

pub mod platform;
mod listing;
mod core;

// Re-export public API
pub use core::{discover_package_url, download_package, fetch_links, package_file_name};
pub use listing::{anchor_hrefs, resolve_links};
pub use platform::{Arch, OsKind, Platform};
