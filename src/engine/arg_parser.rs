use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::ErasureMethod;
use crate::utils::config::PackagePaths;

/// Secure file shredding: overwrite, rename into oblivion, unlink.
#[derive(Clone, Parser)]
#[command(name = "shredkit")]
#[command(about = "Manage the shred list and trigger secure erasure.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the work-list database. Default: `.shredkit` in the current directory.
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Overwrite strategy. Default: smart (per-file from entropy and size).
    #[arg(long, short = 'M', value_enum)]
    pub method: Option<ErasureMethod>,

    /// Entropy worker threads. 0 (default) uses hardware concurrency.
    #[arg(long, short = 't')]
    pub threads: Option<usize>,

    /// Erase files of one SSD in parallel instead of serially.
    #[arg(long)]
    pub parallel_erase: bool,

    /// Skip the NTFS change-journal purge after shredding.
    #[arg(long)]
    pub no_ntfs_erase: bool,

    /// Verbose output. Default: false.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Add files or directories to the shred list.
    Submit {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Mark the entries as added by an automated component, not the user.
        #[arg(long)]
        system: bool,
    },
    /// Remove paths from the shred list.
    Remove {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show files and directories currently prepared for erasure.
    List,
    /// Drop entries from the shred list without erasing anything.
    Clean {
        /// Drop only user-added entries; keep system-added ones.
        #[arg(long)]
        user_only: bool,
    },
    /// Overwrite, rename and unlink everything in the shred list.
    Erase,
}

impl Cli {
    /// Get the database path, defaulting to the package db filename in the
    /// current directory.
    pub fn db_path(&self) -> PathBuf {
        self.db
            .clone()
            .unwrap_or_else(|| PathBuf::from(PackagePaths::get().db_filename()))
    }
}
