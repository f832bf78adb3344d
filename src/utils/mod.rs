pub mod config;
pub mod logger;
pub(crate) mod settings_toml;

pub use config::*;
pub use logger::setup_logging;

/// Canonical path form used for hashing and lookup: upper case on Windows
/// (case-insensitive filesystem), untouched elsewhere.
#[cfg(windows)]
pub fn canonical_case(path: &str) -> String {
    path.to_uppercase()
}

#[cfg(not(windows))]
pub fn canonical_case(path: &str) -> String {
    path.to_string()
}

/// Generic path form for equality checks: forward slashes only.
pub fn generic_form(path: &str) -> String {
    path.replace('\\', "/")
}
