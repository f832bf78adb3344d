//! Shredkit: secure file shredding with entropy-aware overwrite strategies

pub mod disk_detect;
pub mod engine;
pub mod entropy;
pub mod eraser;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;
pub mod volume;

/// Re-export types for API
pub use types::*;

pub use engine::{ShredEngine, SqliteWorkList, WorkListStore, file_key};
pub use entropy::{EntropyClass, ProgressSink, ShannonChecker};
pub use error::{Result, ShredError};

/// Single entry point for one-shot shredding: submit every path, wait for
/// entropy classification, then erase.
///
/// Builds a throwaway engine over an in-memory work list with the default
/// partition and volume capabilities. Paths that are neither regular files
/// nor directories are skipped with a warning. For incremental submission or
/// a persistent list, use [`ShredEngine`] directly.
pub fn shred_paths<I, S>(paths: I, settings: &ShredderSettings) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let store = SqliteWorkList::open_in_memory()?;
    let provider = disk_detect::SysinfoPartitions::new();
    let engine = ShredEngine::assemble(
        *settings,
        Box::new(store),
        &provider,
        volume::default_volume_ops(),
    )?;

    for path in paths {
        if let Err(err) = engine.submit(path.as_ref(), false, false, None) {
            log::warn!("skipping {}: {}", path.as_ref(), err);
        }
    }
    engine.wait_for_checks();
    engine.erase_files()
}
