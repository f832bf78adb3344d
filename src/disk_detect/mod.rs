//! Partition enumeration and drive-type detection for erasure tuning.

use log::debug;
use sysinfo::Disks;

use crate::types::PortablePartition;
use crate::utils::canonical_case;

/// Drive type for erasure tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveType {
    Ssd,
    Hdd,
    Unknown,
}

impl DriveType {
    pub fn is_ssd(&self) -> bool {
        matches!(self, DriveType::Ssd)
    }

    pub fn is_hdd(&self) -> bool {
        matches!(self, DriveType::Hdd)
    }
}

/// Capability the engine consumes for physical-drive and partition layout.
///
/// Roots are the shortest prefix-matchable drive-root strings (`C:\` on
/// Windows, mount points elsewhere), already in canonical case.
pub trait PartitionProvider {
    fn partitions(&self) -> Vec<PortablePartition>;
    fn drive_type(&self, drive_index: usize) -> DriveType;
}

/// Default provider backed by sysinfo's disk list. Each mounted disk is
/// treated as one erasable drive.
pub struct SysinfoPartitions {
    partitions: Vec<PortablePartition>,
    kinds: Vec<DriveType>,
}

impl SysinfoPartitions {
    pub fn new() -> Self {
        let disks = Disks::new_with_refreshed_list();

        let mut partitions = Vec::new();
        let mut kinds = Vec::new();
        for (drive_index, disk) in disks.iter().enumerate() {
            let root = canonical_case(&disk.mount_point().to_string_lossy());
            let filesystem = disk.file_system().to_string_lossy().to_string();
            let kind = match disk.kind() {
                sysinfo::DiskKind::HDD => DriveType::Hdd,
                sysinfo::DiskKind::SSD => DriveType::Ssd,
                // Detection can fail or report Unknown for removable/virtual
                // media; erase serially in that case.
                sysinfo::DiskKind::Unknown(_) => DriveType::Unknown,
            };
            debug!(
                "partition: root={}, fs={}, kind={:?}, drive={}",
                root, filesystem, kind, drive_index
            );
            partitions.push(PortablePartition {
                root,
                filesystem,
                drive_index,
            });
            kinds.push(kind);
        }

        Self { partitions, kinds }
    }
}

impl Default for SysinfoPartitions {
    fn default() -> Self {
        Self::new()
    }
}

impl PartitionProvider for SysinfoPartitions {
    fn partitions(&self) -> Vec<PortablePartition> {
        self.partitions.clone()
    }

    fn drive_type(&self, drive_index: usize) -> DriveType {
        self.kinds
            .get(drive_index)
            .copied()
            .unwrap_or(DriveType::Unknown)
    }
}
