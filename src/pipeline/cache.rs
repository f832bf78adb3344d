//! Drive-partitioned cache: routes submissions to the owning drive eraser.
//!
//! Not thread-safe internally; the engine holds the outer lock. Only
//! `cache_ready` is shared lock-free.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::disk_detect::PartitionProvider;
use crate::pipeline::DriveEraser;
use crate::types::{PortablePartition, ShredderSettings};
use crate::volume::VolumeOps;

pub struct ShredderCache {
    /// partition root → drive index.
    partition_to_drive: BTreeMap<String, usize>,
    /// drive index → its eraser.
    drives: BTreeMap<usize, DriveEraser>,
    /// False whenever the persistent list may be ahead of this cache.
    cache_ready: AtomicBool,
}

impl ShredderCache {
    pub fn new(provider: &dyn PartitionProvider, settings: &ShredderSettings) -> Self {
        let mut partition_to_drive = BTreeMap::new();
        let mut per_drive: BTreeMap<usize, Vec<PortablePartition>> = BTreeMap::new();
        for partition in provider.partitions() {
            partition_to_drive.insert(partition.root.clone(), partition.drive_index);
            per_drive
                .entry(partition.drive_index)
                .or_default()
                .push(partition);
        }

        let drives = per_drive
            .into_iter()
            .map(|(drive_index, partitions)| {
                let eraser = DriveEraser::new(
                    settings.method,
                    provider.drive_type(drive_index),
                    partitions,
                    settings.multithreaded_erase,
                    settings.ntfs_erase,
                );
                (drive_index, eraser)
            })
            .collect();

        Self {
            partition_to_drive,
            drives,
            cache_ready: AtomicBool::new(false),
        }
    }

    /// Route a path to its drive eraser by longest partition-root prefix.
    /// Paths on media the engine does not manage are dropped.
    fn route(&self, file_path: &str) -> Option<(&str, &DriveEraser)> {
        let (root, drive_index) = self
            .partition_to_drive
            .iter()
            .filter(|(root, _)| file_path.starts_with(root.as_str()))
            .max_by_key(|(root, _)| root.len())?;
        let drive = self.drives.get(drive_index)?;
        Some((root.as_str(), drive))
    }

    pub fn submit(&self, file_path: &str, entropy: f64) {
        match self.route(file_path) {
            Some((root, drive)) => drive.submit(root, file_path, entropy),
            None => debug!("no managed drive for {}", file_path),
        }
    }

    pub fn remove(&self, file_path: &str) {
        if let Some((root, drive)) = self.route(file_path) {
            drive.remove(root, file_path);
        }
    }

    pub fn already_exist(&self, file_path: &str) -> bool {
        match self.route(file_path) {
            Some((root, drive)) => drive.already_exist(root, file_path),
            None => false,
        }
    }

    /// Drop every drive's lists and mark the cache stale.
    pub fn clean(&self) {
        self.cache_ready.store(false, Ordering::SeqCst);
        for drive in self.drives.values() {
            drive.clean();
        }
    }

    /// Shred every drive. Across drives no ordering is guaranteed; within one
    /// drive the eraser's ordering holds.
    pub fn erase_files(&self, volume_ops: &dyn VolumeOps) {
        for (drive_index, drive) in &self.drives {
            debug!("shred files on drive {}", drive_index);
            drive.shred_files(volume_ops);
        }
        self.cache_ready.store(false, Ordering::SeqCst);
    }

    pub fn set_cache_ready(&self, ready: bool) {
        self.cache_ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_cache_ready(&self) -> bool {
        self.cache_ready.load(Ordering::SeqCst)
    }

    pub fn files_prepared(&self) -> BTreeMap<String, f64> {
        let mut files = BTreeMap::new();
        for drive in self.drives.values() {
            files.extend(drive.files_prepared());
        }
        files
    }

    pub fn directories_prepared(&self) -> Vec<String> {
        self.drives
            .values()
            .flat_map(|drive| drive.directories_prepared())
            .collect()
    }

    /// True when no drive holds file or directory entries.
    pub fn is_empty(&self) -> bool {
        self.drives
            .values()
            .all(|d| d.files_prepared().is_empty() && d.directories_prepared().is_empty())
    }
}
