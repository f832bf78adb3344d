//! Public and internal types for the shredkit API and pipeline.

use clap::ValueEnum;

/// Entropy sentinel: not yet computed, or the calculation was interrupted.
pub const ENTROPY_UNKNOWN: f64 = -1.0;

/// Properties of a shredded file, composed in a 64-bit flags value.
///
/// The raw value is what lands in the `flags` column of the work list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileFlags(i64);

impl FileFlags {
    /// Entry was enqueued by an automated component, not by the user.
    pub const SYSTEM_ADDED: i64 = 0x1;
    /// Path was a regular file (not a directory) at insertion time.
    pub const IS_FILE: i64 = 0x2;
    pub const RESERVED1: i64 = 0x4;
    pub const RESERVED2: i64 = 0x8;

    /// Rebuild flags from a stored `flags` column value.
    pub fn from_bits(bits: i64) -> Self {
        FileFlags(bits)
    }

    /// Raw bitmask for storage.
    pub fn bits(&self) -> i64 {
        self.0
    }

    pub fn set_system_added(&mut self, on: bool) {
        self.set(Self::SYSTEM_ADDED, on);
    }

    pub fn is_system_added(&self) -> bool {
        self.0 & Self::SYSTEM_ADDED != 0
    }

    pub fn set_is_file(&mut self, on: bool) {
        self.set(Self::IS_FILE, on);
    }

    pub fn is_file(&self) -> bool {
        self.0 & Self::IS_FILE != 0
    }

    fn set(&mut self, bit: i64, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

/// One row of the persistent work list.
///
/// `key` is the digest of the UTF-8 path and the sole primary key; a path
/// existing as neither a regular file nor a directory is never inserted.
#[derive(Clone, Debug)]
pub struct WorkRecord {
    pub key: String,
    pub path: String,
    /// Shannon entropy in `[0, 8]`, or [`ENTROPY_UNKNOWN`].
    pub entropy: f64,
    pub flags: FileFlags,
}

/// One partition as reported by the partition capability.
///
/// `root` is the shortest drive-root string usable as a prefix match
/// (e.g. `C:\` on Windows, a mount point elsewhere).
#[derive(Clone, Debug)]
pub struct PortablePartition {
    pub root: String,
    pub filesystem: String,
    pub drive_index: usize,
}

/// Overwrite strategy applied to each file of a drive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ErasureMethod {
    /// Pick per file from entropy class, size and disk type.
    #[default]
    Smart,
    /// Overwrite every byte.
    Full,
    /// Overwrite begin, end and randomly chosen areas in the middle.
    Random,
    /// Overwrite only the first and last mask-length bytes.
    BeginEnd,
}

/// Single-file eraser lifecycle. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EraserState {
    New,
    Opened,
    Prepared,
    Erased,
    Closed,
}

/// Engine-wide configuration, fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct ShredderSettings {
    /// Entropy worker threads. 0 means hardware concurrency.
    pub thread_number: usize,
    /// Fan file erasures out to a task pool on SSD drives.
    pub multithreaded_erase: bool,
    /// Purge the NTFS change journal of affected volumes after a shred.
    pub ntfs_erase: bool,
    /// Overwrite strategy for every drive eraser.
    pub method: ErasureMethod,
}

impl Default for ShredderSettings {
    fn default() -> Self {
        Self {
            thread_number: 0,
            multithreaded_erase: false,
            ntfs_erase: true,
            method: ErasureMethod::Smart,
        }
    }
}
