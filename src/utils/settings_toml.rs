//! Load `.shredkit.toml` from the working directory (CLI only). Lib callers
//! inject configuration directly via [`ShredderSettings`](crate::ShredderSettings).

use serde::Deserialize;
use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::types::{ErasureMethod, ShredderSettings};
use crate::utils::config::PackagePaths;

#[derive(Debug, Deserialize)]
pub(crate) struct ShredkitToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    db: Option<String>,
    threads: Option<usize>,
    parallel_erase: Option<bool>,
    ntfs_erase: Option<bool>,
    method: Option<String>,
}

/// Load `.shredkit.toml` from `dir` if present. Returns None if file missing or unreadable.
pub(crate) fn load_settings_toml(dir: &Path) -> Option<ShredkitToml> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite settings fields from the file when present. Returns the file's
/// db path, if any, for the CLI to use as a fallback.
pub(crate) fn apply_file_to_settings(
    file: &ShredkitToml,
    settings: &mut ShredderSettings,
) -> Option<PathBuf> {
    let section = &file.settings;
    if let Some(threads) = section.threads {
        settings.thread_number = threads;
    }
    if let Some(parallel) = section.parallel_erase {
        settings.multithreaded_erase = parallel;
    }
    if let Some(ntfs) = section.ntfs_erase {
        settings.ntfs_erase = ntfs;
    }
    if let Some(method) = &section.method {
        match ErasureMethod::from_str(method, true) {
            Ok(m) => settings.method = m,
            Err(_) => log::warn!("unknown erasure method in settings file: {}", method),
        }
    }
    section.db.as_ref().map(PathBuf::from)
}
