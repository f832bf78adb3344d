//! Rename-chain name obfuscation and final unlink.
//!
//! Successive renames in a journaled filesystem bury the original
//! directory-entry name under fresh records; the final move confines the last
//! entry to a fixed well-known path that later shreds overwrite again.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::utils::config::ObfuscateConsts;

/// Replace the node's name with a chain of single-character names, move it
/// into the trash area under a fixed stem, then unlink it. Any rename error
/// aborts the sequence with `false`.
pub fn obfuscate_file_node(path: &Path) -> bool {
    let directory = match path.parent() {
        Some(dir) => dir,
        None => return false,
    };
    let name_length = match path.file_name() {
        Some(name) => name.to_string_lossy().chars().count(),
        None => return false,
    };

    let mut current = path.to_path_buf();
    for c in ObfuscateConsts::RENAME_PATTERN.chars() {
        let new_name: String = std::iter::repeat(c).take(name_length).collect();
        let next = directory.join(new_name);
        if let Err(err) = fs::rename(&current, &next) {
            debug!("rename {} -> {} failed: {}", current.display(), next.display(), err);
            return false;
        }
        current = next;
    }

    let final_path = trash_path(&current);
    if let Err(err) = fs::rename(&current, &final_path) {
        debug!(
            "rename {} -> {} failed: {}; unlinking in place",
            current.display(),
            final_path.display(),
            err
        );
        // Trash may sit on another filesystem; the name chain already ran.
        return match fs::remove_file(&current) {
            Ok(()) => true,
            Err(err) => {
                debug!("remove {} failed: {}", current.display(), err);
                false
            }
        };
    }

    match fs::remove_file(&final_path) {
        Ok(()) => true,
        // Every shred funnels through the same trash stem; a concurrent task
        // may have renamed over and unlinked this node already.
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
        Err(err) => {
            debug!("remove {} failed: {}", final_path.display(), err);
            false
        }
    }
}

/// Final rename target before unlink: `<root>/$Recycle.Bin/<stem>` on
/// Windows, the per-user trash elsewhere (temp dir when no trash exists).
fn trash_path(original: &Path) -> PathBuf {
    trash_dir(original).join(ObfuscateConsts::TRASH_STEM)
}

#[cfg(windows)]
fn trash_dir(original: &Path) -> PathBuf {
    let mut root = original.to_path_buf();
    while let Some(parent) = root.parent() {
        root = parent.to_path_buf();
    }
    root.join(ObfuscateConsts::RECYCLE_BIN)
}

#[cfg(not(windows))]
fn trash_dir(_original: &Path) -> PathBuf {
    let user_trash = directories::BaseDirs::new()
        .map(|dirs| dirs.data_dir().join("Trash").join("files"));
    match user_trash {
        Some(dir) if dir.is_dir() => dir,
        _ => std::env::temp_dir(),
    }
}
