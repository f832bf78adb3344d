//! Strategy-driven overwrite of one open file.
//!
//! A [`FileEraser`] walks `New → Opened → Prepared → Erased → Closed`; it is
//! created per shred task and never shared across threads.

mod mask;
pub mod obfuscate;

pub use mask::MaskSource;
pub use obfuscate::obfuscate_file_node;

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;
use rand::Rng;

use crate::disk_detect::DriveType;
use crate::entropy::EntropyClass;
use crate::error::{Result, ShredError};
use crate::types::{EraserState, ErasureMethod};
use crate::utils::config::EraseConsts;

pub struct FileEraser {
    path: PathBuf,
    handle: Option<File>,
    size: u64,
    big_file: bool,
    special_attributes: bool,
    prepared: bool,
    state: EraserState,
    estimation: EntropyClass,
    disk_type: DriveType,
}

impl FileEraser {
    pub fn new(path: impl Into<PathBuf>, estimation: EntropyClass, disk_type: DriveType) -> Self {
        Self {
            path: path.into(),
            handle: None,
            size: 0,
            big_file: false,
            special_attributes: false,
            prepared: false,
            state: EraserState::New,
            estimation,
            disk_type,
        }
    }

    /// Open the file for raw write: clear the read-only bit, open write-only
    /// with share-read+share-write and write-through, retrying once. Records
    /// the size and whether the file needs special treatment.
    pub fn open(&mut self) -> Result<()> {
        if self.state != EraserState::New {
            return Err(ShredError::InvalidState(self.state));
        }

        let meta = std::fs::metadata(&self.path).map_err(|_| ShredError::Open {
            path: self.path.display().to_string(),
        })?;
        if !meta.is_file() {
            return Err(ShredError::Open {
                path: self.path.display().to_string(),
            });
        }

        clear_readonly(&self.path, &meta);
        self.special_attributes = has_special_attributes(&meta);

        let file = match try_open(&self.path) {
            Ok(f) => f,
            Err(first) => match try_open(&self.path) {
                Ok(f) => f,
                Err(second) => {
                    debug!(
                        "open {} failed twice: {}; {}",
                        self.path.display(),
                        first,
                        second
                    );
                    return Err(ShredError::Open {
                        path: self.path.display().to_string(),
                    });
                }
            },
        };

        self.size = file.metadata()?.len();
        // Full overwrite is off the table past the 32-bit size boundary.
        self.big_file = (self.size >> 32) != 0;
        self.handle = Some(file);
        self.state = EraserState::Opened;
        Ok(())
    }

    /// Anchor writes: one sentinel byte at `size − 1`, plus one at every
    /// 64 KiB offset on SSD drives. Touching each to-be-overwritten block
    /// once raises the odds that the main overwrite lands on the same
    /// logical blocks.
    pub fn prepare(&mut self) -> Result<bool> {
        self.ensure_erasable()?;
        if self.size == 0 {
            return Ok(false);
        }

        let size = self.size;
        let Some(file) = self.handle.as_mut() else {
            return Err(ShredError::InvalidState(self.state));
        };

        file.seek(SeekFrom::Start(size - 1))?;
        file.write_all(&[EraseConsts::ANCHOR_BYTE])?;

        if self.disk_type == DriveType::Ssd {
            let mut point = EraseConsts::ANCHOR_STRIDE;
            while point <= size {
                file.seek(SeekFrom::Start(point))?;
                file.write_all(&[EraseConsts::ANCHOR_BYTE])?;
                point += EraseConsts::ANCHOR_STRIDE;
            }
        }

        self.prepared = true;
        if self.state == EraserState::Opened {
            self.state = EraserState::Prepared;
        }
        Ok(true)
    }

    /// Overwrite every byte with the mask, in mask-length chunks. Refuses
    /// big files with `Ok(false)`.
    pub fn erase_full(&mut self, mask: &[u8]) -> Result<bool> {
        self.ensure_erasable()?;
        if self.size == 0 || mask.is_empty() {
            return Ok(false);
        }
        if self.big_file {
            return Ok(false);
        }
        if !self.prepared {
            self.prepare()?;
        }

        let size = self.size;
        let Some(file) = self.handle.as_mut() else {
            return Err(ShredError::InvalidState(self.state));
        };

        file.seek(SeekFrom::Start(0))?;
        let mut bytes_erased: u64 = 0;
        while bytes_erased < size {
            let stride = (size - bytes_erased).min(mask.len() as u64) as usize;
            file.write_all(&mask[..stride])?;
            bytes_erased += stride as u64;
        }

        self.state = EraserState::Erased;
        Ok(true)
    }

    /// Overwrite begin, end and randomly chosen areas in the middle. Files
    /// under one megabyte are erased in full instead.
    pub fn erase_random(&mut self, mask: &[u8]) -> Result<bool> {
        self.ensure_erasable()?;
        if EraseConsts::MEGABYTE > self.size {
            return self.erase_full(mask);
        }
        if mask.is_empty() || mask.len() as u64 > self.size {
            return Ok(false);
        }
        if !self.prepared {
            self.prepare()?;
        }

        let mut rng = rand::thread_rng();
        let offsets = random_offsets(self.size, mask.len() as u64, &mut rng);

        let size = self.size;
        let Some(file) = self.handle.as_mut() else {
            return Err(ShredError::InvalidState(self.state));
        };
        for offset in offsets {
            debug_assert!(offset + mask.len() as u64 <= size);
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(mask)?;
        }

        self.state = EraserState::Erased;
        Ok(true)
    }

    /// Overwrite only the first and last mask-length bytes. Files under one
    /// megabyte are erased in full instead.
    pub fn erase_begin_end(&mut self, mask: &[u8]) -> Result<bool> {
        self.ensure_erasable()?;
        if EraseConsts::MEGABYTE > self.size {
            return self.erase_full(mask);
        }
        if mask.is_empty() || mask.len() as u64 > self.size {
            return Ok(false);
        }
        if !self.prepared {
            self.prepare()?;
        }

        let size = self.size;
        let Some(file) = self.handle.as_mut() else {
            return Err(ShredError::InvalidState(self.state));
        };

        file.seek(SeekFrom::Start(0))?;
        file.write_all(mask)?;
        file.seek(SeekFrom::Start(size - mask.len() as u64))?;
        file.write_all(mask)?;

        self.state = EraserState::Erased;
        Ok(true)
    }

    /// Entropy- and size-driven strategy choice. Big files and encrypted
    /// payloads get begin-end (format metadata is what matters there);
    /// everything else is overwritten in full.
    pub fn erase_smart(&mut self, mask: &[u8]) -> Result<bool> {
        if self.big_file {
            return self.erase_begin_end(mask);
        }
        match self.estimation {
            EntropyClass::Encrypted => self.erase_begin_end(mask),
            EntropyClass::Binary | EntropyClass::Plain | EntropyClass::Unknown => {
                self.erase_full(mask)
            }
        }
    }

    /// Tagged-variant strategy dispatch.
    pub fn erase_with(&mut self, method: ErasureMethod, mask: &[u8]) -> Result<bool> {
        match method {
            ErasureMethod::Smart => self.erase_smart(mask),
            ErasureMethod::Full => self.erase_full(mask),
            ErasureMethod::Random => self.erase_random(mask),
            ErasureMethod::BeginEnd => self.erase_begin_end(mask),
        }
    }

    /// Release the handle. Idempotent.
    pub fn close(&mut self) {
        self.handle = None;
        self.state = EraserState::Closed;
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_big_file(&self) -> bool {
        self.big_file
    }

    /// Compressed, encrypted or sparse: overwrites may not land on the
    /// original physical blocks.
    pub fn has_special_attributes(&self) -> bool {
        self.special_attributes
    }

    pub fn state(&self) -> EraserState {
        self.state
    }

    fn ensure_erasable(&self) -> Result<()> {
        match self.state {
            EraserState::Opened | EraserState::Prepared | EraserState::Erased => Ok(()),
            other => Err(ShredError::InvalidState(other)),
        }
    }
}

/// Ordered write offsets for the random strategy: begin, `size / (5·mask_len)`
/// uniformly drawn middle points, end. Every offset satisfies
/// `offset + mask_len ≤ size`.
pub fn random_offsets(size: u64, mask_len: u64, rng: &mut impl Rng) -> Vec<u64> {
    let end_offset = size - mask_len;
    let areas = size / (mask_len * EraseConsts::RANDOM_AREA_DIVISOR);

    let mut points = Vec::with_capacity(areas as usize + 2);
    points.push(0);
    if end_offset >= 2 * mask_len {
        for _ in 0..areas {
            points.push(rng.gen_range(mask_len..=end_offset - mask_len));
        }
    }
    points.push(end_offset);
    points.sort_unstable();
    points
}

fn try_open(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        use windows_sys::Win32::Storage::FileSystem::{
            FILE_FLAG_WRITE_THROUGH, FILE_SHARE_READ, FILE_SHARE_WRITE,
        };
        options.custom_flags(FILE_FLAG_WRITE_THROUGH);
        options.share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_SYNC);
    }
    options.open(path)
}

#[cfg(unix)]
fn clear_readonly(path: &Path, meta: &std::fs::Metadata) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = meta.permissions();
    if perms.readonly() {
        perms.set_mode(perms.mode() | 0o200);
        let _ = std::fs::set_permissions(path, perms);
    }
}

#[cfg(windows)]
fn clear_readonly(path: &Path, meta: &std::fs::Metadata) {
    let mut perms = meta.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        let _ = std::fs::set_permissions(path, perms);
    }
}

#[cfg(windows)]
fn has_special_attributes(meta: &std::fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    use windows_sys::Win32::Storage::FileSystem::{
        FILE_ATTRIBUTE_COMPRESSED, FILE_ATTRIBUTE_ENCRYPTED, FILE_ATTRIBUTE_SPARSE_FILE,
    };
    meta.file_attributes()
        & (FILE_ATTRIBUTE_COMPRESSED | FILE_ATTRIBUTE_ENCRYPTED | FILE_ATTRIBUTE_SPARSE_FILE)
        != 0
}

#[cfg(not(windows))]
fn has_special_attributes(_meta: &std::fs::Metadata) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn temp_file_with(bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("victim.bin");
        std::fs::write(&path, bytes).unwrap();
        (dir, path)
    }

    fn read_back(path: &Path) -> Vec<u8> {
        let mut buf = Vec::new();
        File::open(path).unwrap().read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn erase_before_open_is_invalid_state() {
        let mut eraser = FileEraser::new("nowhere.bin", EntropyClass::Plain, DriveType::Hdd);
        let err = eraser.erase_full(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, ShredError::InvalidState(EraserState::New)));
    }

    #[test]
    fn full_erase_overwrites_every_byte() {
        let (_dir, path) = temp_file_with(&[b'x'; 1000]);
        let mut eraser = FileEraser::new(&path, EntropyClass::Plain, DriveType::Hdd);
        eraser.open().unwrap();
        let mask = [0xABu8; 64];
        assert!(eraser.erase_full(&mask).unwrap());
        assert_eq!(eraser.state(), EraserState::Erased);
        eraser.close();
        assert!(read_back(&path).iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn smart_on_big_file_picks_begin_end_regardless_of_entropy() {
        let size = 2 * EraseConsts::MEGABYTE as usize;
        let (_dir, path) = temp_file_with(&vec![0u8; size]);
        for class in [
            EntropyClass::Plain,
            EntropyClass::Binary,
            EntropyClass::Encrypted,
            EntropyClass::Unknown,
        ] {
            std::fs::write(&path, vec![0u8; size]).unwrap();
            let mut eraser = FileEraser::new(&path, class, DriveType::Hdd);
            eraser.open().unwrap();
            eraser.big_file = true;
            let mask = vec![0xCDu8; 128];
            assert!(eraser.erase_smart(&mask).unwrap());
            eraser.close();
            let bytes = read_back(&path);
            assert!(bytes[..128].iter().all(|&b| b == 0xCD));
            assert!(bytes[size - 128..].iter().all(|&b| b == 0xCD));
            // middle untouched: begin-end, not full
            assert_eq!(bytes[size / 2], 0);
        }
    }

    #[test]
    fn prepare_writes_anchor_at_last_byte() {
        let (_dir, path) = temp_file_with(&[0u8; 4096]);
        let mut eraser = FileEraser::new(&path, EntropyClass::Plain, DriveType::Hdd);
        eraser.open().unwrap();
        assert!(eraser.prepare().unwrap());
        assert_eq!(eraser.state(), EraserState::Prepared);
        eraser.close();
        let bytes = read_back(&path);
        assert_eq!(bytes[4095], EraseConsts::ANCHOR_BYTE);
        assert_eq!(bytes[0], 0);
    }

    #[test]
    fn prepare_on_ssd_writes_anchor_every_stride() {
        let size = 3 * EraseConsts::ANCHOR_STRIDE as usize + 10;
        let (_dir, path) = temp_file_with(&vec![0u8; size]);
        let mut eraser = FileEraser::new(&path, EntropyClass::Plain, DriveType::Ssd);
        eraser.open().unwrap();
        assert!(eraser.prepare().unwrap());
        eraser.close();
        let bytes = read_back(&path);
        for i in 1..=3 {
            assert_eq!(
                bytes[i * EraseConsts::ANCHOR_STRIDE as usize],
                EraseConsts::ANCHOR_BYTE
            );
        }
        assert_eq!(bytes[size - 1], EraseConsts::ANCHOR_BYTE);
    }

    #[test]
    fn random_offsets_shape_for_five_masks_plus_one() {
        let mask_len = 65_535u64;
        let size = 5 * mask_len + 1;
        let mut rng = rand::thread_rng();
        let offsets = random_offsets(size, mask_len, &mut rng);
        assert_eq!(offsets.len(), 3);
        assert_eq!(offsets[0], 0);
        assert_eq!(offsets[2], size - mask_len);
        assert!(offsets[1] >= mask_len && offsets[1] <= size - 2 * mask_len);
        assert!(offsets.iter().all(|&o| o + mask_len <= size));
    }

    #[test]
    fn random_offsets_are_sorted_and_bounded() {
        let mask_len = 4096u64;
        let size = 40 * mask_len;
        let mut rng = rand::thread_rng();
        let offsets = random_offsets(size, mask_len, &mut rng);
        assert_eq!(offsets.len(), 8 + 2);
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        assert!(offsets.iter().all(|&o| o + mask_len <= size));
    }
}
