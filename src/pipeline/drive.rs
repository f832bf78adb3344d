//! Erasure list and shred loop for one physical drive.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use log::debug;

use crate::disk_detect::DriveType;
use crate::entropy;
use crate::eraser::{FileEraser, MaskSource, obfuscate_file_node};
use crate::types::{ErasureMethod, PortablePartition};
use crate::utils::generic_form;
use crate::volume::VolumeOps;

#[derive(Clone)]
struct FileEntry {
    path: String,
    entropy: f64,
}

#[derive(Default)]
struct EraseLists {
    /// root → submitted files, insertion-ordered within each root group.
    files: BTreeMap<String, Vec<FileEntry>>,
    /// root → submitted directories. Not overwritten, only removed whole.
    dirs: BTreeMap<String, Vec<String>>,
}

/// Eraser for one physical drive. All mutating operations serialize on a
/// single lock; the shred loop holds it for the whole pass.
pub struct DriveEraser {
    method: ErasureMethod,
    disk_type: DriveType,
    partitions: Vec<PortablePartition>,
    multithreaded: bool,
    ntfs_erase: bool,
    lists: Mutex<EraseLists>,
    mask: MaskSource,
}

impl DriveEraser {
    pub fn new(
        method: ErasureMethod,
        disk_type: DriveType,
        partitions: Vec<PortablePartition>,
        multithreaded: bool,
        ntfs_erase: bool,
    ) -> Self {
        Self {
            method,
            disk_type,
            partitions,
            multithreaded,
            ntfs_erase,
            lists: Mutex::new(EraseLists::default()),
            mask: MaskSource::new(),
        }
    }

    pub fn disk_type(&self) -> DriveType {
        self.disk_type
    }

    /// Queue a path for erasure. Directories go to the directory list; paths
    /// that are neither regular files nor directories are silently ignored.
    /// Duplicates are dropped.
    pub fn submit(&self, root: &str, file_path: &str, entropy: f64) {
        let mut lists = self.lists.lock().unwrap();

        let fs_path = Path::new(file_path);
        if fs_path.is_dir() {
            let dirs = lists.dirs.entry(root.to_string()).or_default();
            if !dirs.iter().any(|d| d == file_path) {
                dirs.push(file_path.to_string());
            }
            return;
        }
        if !fs_path.is_file() {
            return;
        }

        let generic = generic_form(file_path);
        let files = lists.files.entry(root.to_string()).or_default();
        if files.iter().any(|e| generic_form(&e.path) == generic) {
            return;
        }
        files.push(FileEntry {
            path: file_path.to_string(),
            entropy,
        });
    }

    /// Drop one submission. Removing an absent path is a no-op.
    pub fn remove(&self, root: &str, file_path: &str) {
        let mut lists = self.lists.lock().unwrap();

        if let Some(dirs) = lists.dirs.get_mut(root) {
            dirs.retain(|d| d != file_path);
        }
        if let Some(files) = lists.files.get_mut(root) {
            if let Some(pos) = files.iter().position(|e| e.path == file_path) {
                files.remove(pos);
            }
        }
    }

    pub fn already_exist(&self, root: &str, file_path: &str) -> bool {
        let lists = self.lists.lock().unwrap();

        let fs_path = Path::new(file_path);
        if fs_path.is_file() {
            let generic = generic_form(file_path);
            if lists
                .files
                .get(root)
                .is_some_and(|files| files.iter().any(|e| generic_form(&e.path) == generic))
            {
                return true;
            }
        }
        if fs_path.is_dir() {
            return lists
                .dirs
                .get(root)
                .is_some_and(|dirs| dirs.iter().any(|d| d == file_path));
        }
        false
    }

    /// Drop both lists.
    pub fn clean(&self) {
        let mut lists = self.lists.lock().unwrap();
        lists.files.clear();
        lists.dirs.clear();
    }

    pub fn files_prepared(&self) -> BTreeMap<String, f64> {
        let lists = self.lists.lock().unwrap();
        lists
            .files
            .values()
            .flatten()
            .map(|e| (e.path.clone(), e.entropy))
            .collect()
    }

    pub fn directories_prepared(&self) -> Vec<String> {
        let lists = self.lists.lock().unwrap();
        lists.dirs.values().flatten().cloned().collect()
    }

    /// Shred everything queued on this drive: files first (overwrite +
    /// rename-chain), then directories (recursive delete), then the NTFS
    /// journal purge for affected NTFS roots. Per-path errors are logged and
    /// swallowed; the pass is best-effort.
    pub fn shred_files(&self, volume_ops: &dyn VolumeOps) {
        let mut lists = self.lists.lock().unwrap();
        // Parallel writes on a spinning disk thrash the head; fan out on SSD only.
        let parallel = self.multithreaded && self.disk_type == DriveType::Ssd;

        if parallel {
            rayon::scope(|scope| {
                for entry in lists.files.values().flatten() {
                    let entry = entry.clone();
                    scope.spawn(move |_| self.erase_file(&entry.path, entry.entropy));
                }
            });
            rayon::scope(|scope| {
                for dir in lists.dirs.values().flatten() {
                    scope.spawn(move |_| remove_dir_tree(dir));
                }
            });
        } else {
            for entry in lists.files.values().flatten() {
                self.erase_file(&entry.path, entry.entropy);
            }
            for dir in lists.dirs.values().flatten() {
                remove_dir_tree(dir);
            }
        }

        if self.ntfs_erase {
            for root in self.affected_ntfs_roots(&lists.files) {
                debug!("clean NTFS journal on {}", root);
                volume_ops.clean_ntfs_journal(&root);
            }
        }

        lists.files.clear();
        lists.dirs.clear();
    }

    /// Overwrite one file with the configured strategy, then bury its name.
    /// Zero-length files skip straight to name obfuscation.
    fn erase_file(&self, file_path: &str, entropy: f64) {
        let size = match fs::metadata(file_path) {
            Ok(meta) => meta.len(),
            Err(err) => {
                debug!("skip {}: {}", file_path, err);
                return;
            }
        };

        if size == 0 {
            // Nothing to hide in a zero-sized file, but the name still leaks.
            obfuscate_file_node(Path::new(file_path));
            return;
        }

        let estimation = entropy::estimate(entropy, size);
        let mut eraser = FileEraser::new(file_path, estimation, self.disk_type);
        if let Err(err) = eraser.open() {
            debug!("cannot open {}: {}", file_path, err);
            return;
        }
        match eraser.erase_with(self.method, self.mask.sequence()) {
            Ok(true) => {}
            Ok(false) => debug!("overwrite refused for {}", file_path),
            Err(err) => debug!("overwrite failed for {}: {}", file_path, err),
        }
        eraser.close();

        obfuscate_file_node(Path::new(file_path));
    }

    /// Roots with queued files whose partition filesystem is NTFS.
    fn affected_ntfs_roots(&self, files: &BTreeMap<String, Vec<FileEntry>>) -> BTreeSet<String> {
        files
            .keys()
            .filter(|root| {
                self.partitions
                    .iter()
                    .any(|p| p.root == **root && p.filesystem == "NTFS")
            })
            .cloned()
            .collect()
    }
}

fn remove_dir_tree(dir: &str) {
    if let Err(err) = fs::remove_dir_all(dir) {
        debug!("remove_dir_all {} failed: {}", dir, err);
    }
}
