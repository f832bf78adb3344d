//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived paths: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    db_filename: String,
    settings_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache paths from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                db_filename: format!(".{pkg}"),
                settings_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Default work-list database filename (in the working directory).
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }
}

// ---- Random mask ----

/// Random mask buffer tuning.
pub struct MaskConsts;

impl MaskConsts {
    /// Size of the per-drive random mask buffer (bytes).
    pub const BUFFER_SIZE: usize = 0xFFFF;
}

// ---- Overwrite strategies ----

/// Single-file eraser tuning.
pub struct EraseConsts;

impl EraseConsts {
    /// Sentinel byte written at anchor points before the main overwrite.
    pub const ANCHOR_BYTE: u8 = 0xEF;
    /// Distance between anchor writes on SSD drives (bytes).
    pub const ANCHOR_STRIDE: u64 = 0xFFFF;
    /// Files below this size are always erased in full (bytes).
    pub const MEGABYTE: u64 = 1024 * 1024;
    /// Random strategy: one middle write per this many mask lengths of file.
    pub const RANDOM_AREA_DIVISOR: u64 = 5;
}

// ---- Entropy classification ----

/// Entropy classifier I/O and progress tuning.
pub struct EntropyConsts;

impl EntropyConsts {
    /// Chunk size for streaming file reads (bytes). 64 KiB.
    pub const READ_CHUNK_SIZE: usize = 64 * 1024;
    /// Progress callbacks fire at most once per 1% of the file, with this floor (bytes).
    pub const PROGRESS_FLOOR: u64 = 1024;
}

// ---- Name obfuscation ----

/// Rename-chain obfuscation constants.
pub struct ObfuscateConsts;

impl ObfuscateConsts {
    /// One rename per pattern character, to that character repeated name-length times.
    pub const RENAME_PATTERN: &'static str = "abc";
    /// Stem of the final pre-unlink rename target.
    pub const TRASH_STEM: &'static str = "892F575F-DE37-4A0F-8A3E-427618C7D64C.tmp";
    /// Trash area under the volume root on Windows.
    pub const RECYCLE_BIN: &'static str = "$Recycle.Bin";
}

// ---- Worker pool ----

/// Entropy pool drain tuning.
pub struct PoolConsts;

impl PoolConsts {
    /// Sleep between idle polls while draining the pool (milliseconds).
    pub const IDLE_POLL_MS: u64 = 100;
}
