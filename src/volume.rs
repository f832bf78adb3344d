//! Volume-level operations: NTFS change-journal purge.
//!
//! The USN journal preserves the names of erased files; purging it after a
//! shred closes that leak. The engine consumes this as a capability so tests
//! and non-Windows builds can substitute a recorder or a no-op.

use log::debug;

/// Capability for per-volume journal cleanup.
pub trait VolumeOps: Send + Sync {
    /// Delete and re-create the USN change journal of the volume mounted at
    /// `root`. Returns false on any failure, including non-NTFS volumes.
    fn clean_ntfs_journal(&self, root: &str) -> bool;
}

/// No-op implementation for platforms without an NTFS journal, and for tests.
pub struct NullVolumeOps;

impl VolumeOps for NullVolumeOps {
    fn clean_ntfs_journal(&self, root: &str) -> bool {
        debug!("no journal to clean on {}", root);
        false
    }
}

/// Platform default: the real NTFS purge on Windows, a no-op elsewhere.
#[cfg(windows)]
pub fn default_volume_ops() -> Box<dyn VolumeOps> {
    Box::new(NtfsVolumeOps)
}

#[cfg(not(windows))]
pub fn default_volume_ops() -> Box<dyn VolumeOps> {
    Box::new(NullVolumeOps)
}

/// Real journal purge through the FSCTL_*_USN_JOURNAL ioctls.
#[cfg(windows)]
pub struct NtfsVolumeOps;

#[cfg(windows)]
impl VolumeOps for NtfsVolumeOps {
    fn clean_ntfs_journal(&self, root: &str) -> bool {
        match root.chars().next() {
            Some(letter) if letter.is_ascii_alphabetic() => ntfs::purge_journal(letter),
            _ => {
                debug!("not a drive root: {}", root);
                false
            }
        }
    }
}

#[cfg(windows)]
mod ntfs {
    use log::debug;
    use std::ffi::c_void;
    use std::mem;
    use std::ptr;

    use windows_sys::Win32::Foundation::{
        CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE,
    };
    use windows_sys::Win32::Storage::FileSystem::{
        CreateFileW, FILE_ATTRIBUTE_READONLY, FILE_SHARE_READ, FILE_SHARE_WRITE,
        GetVolumeInformationW, OPEN_EXISTING,
    };
    use windows_sys::Win32::System::IO::{DeviceIoControl, OVERLAPPED};
    use windows_sys::Win32::System::Ioctl::{
        CREATE_USN_JOURNAL_DATA, DELETE_USN_JOURNAL_DATA, FSCTL_CREATE_USN_JOURNAL,
        FSCTL_DELETE_USN_JOURNAL, FSCTL_QUERY_USN_JOURNAL, USN_DELETE_FLAG_DELETE,
        USN_DELETE_FLAG_NOTIFY, USN_JOURNAL_DATA_V0,
    };
    use windows_sys::Win32::System::Threading::{CreateEventW, INFINITE, WaitForSingleObject};

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Volume handle for `\\.\X:`, or None when the volume is not NTFS.
    fn volume_handle(drive_letter: char) -> Option<HANDLE> {
        let letter = drive_letter.to_ascii_uppercase();
        let root_path = wide(&format!("{letter}:\\"));
        let volume_name = wide(&format!("\\\\.\\{letter}:"));

        let mut filesystem_name = [0u16; 261];
        let status = unsafe {
            GetVolumeInformationW(
                root_path.as_ptr(),
                ptr::null_mut(),
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                filesystem_name.as_mut_ptr(),
                filesystem_name.len() as u32,
            )
        };
        let end = filesystem_name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(filesystem_name.len());
        if status == 0 || String::from_utf16_lossy(&filesystem_name[..end]) != "NTFS" {
            debug!("volume {}: not NTFS or no volume information", letter);
            return None;
        }

        let handle = unsafe {
            CreateFileW(
                volume_name.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                ptr::null(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_READONLY,
                ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            debug!("volume {}: cannot open volume handle", letter);
            return None;
        }
        Some(handle)
    }

    /// Create → query → delete(DELETE|NOTIFY) the USN journal, waiting on the
    /// delete's event before reporting success.
    pub(super) fn purge_journal(drive_letter: char) -> bool {
        let Some(handle) = volume_handle(drive_letter) else {
            return false;
        };
        let ok = purge_journal_on(handle);
        unsafe { CloseHandle(handle) };
        ok
    }

    fn purge_journal_on(handle: HANDLE) -> bool {
        let mut bytes_returned = 0u32;

        let create = CREATE_USN_JOURNAL_DATA {
            MaximumSize: 0,
            AllocationDelta: 0,
        };
        let ok = unsafe {
            DeviceIoControl(
                handle,
                FSCTL_CREATE_USN_JOURNAL,
                &create as *const _ as *const c_void,
                mem::size_of::<CREATE_USN_JOURNAL_DATA>() as u32,
                ptr::null_mut(),
                0,
                &mut bytes_returned,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            debug!("FSCTL_CREATE_USN_JOURNAL failed");
            return false;
        }

        let mut journal: USN_JOURNAL_DATA_V0 = unsafe { mem::zeroed() };
        let ok = unsafe {
            DeviceIoControl(
                handle,
                FSCTL_QUERY_USN_JOURNAL,
                ptr::null(),
                0,
                &mut journal as *mut _ as *mut c_void,
                mem::size_of::<USN_JOURNAL_DATA_V0>() as u32,
                &mut bytes_returned,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            debug!("FSCTL_QUERY_USN_JOURNAL failed");
            return false;
        }

        let delete = DELETE_USN_JOURNAL_DATA {
            UsnJournalID: journal.UsnJournalID,
            DeleteFlags: USN_DELETE_FLAG_DELETE | USN_DELETE_FLAG_NOTIFY,
        };
        let mut overlapped: OVERLAPPED = unsafe { mem::zeroed() };
        overlapped.hEvent = unsafe { CreateEventW(ptr::null(), 1, 0, ptr::null()) };
        let ok = unsafe {
            DeviceIoControl(
                handle,
                FSCTL_DELETE_USN_JOURNAL,
                &delete as *const _ as *const c_void,
                mem::size_of::<DELETE_USN_JOURNAL_DATA>() as u32,
                ptr::null_mut(),
                0,
                ptr::null_mut(),
                &mut overlapped,
            )
        };
        if ok != 0 && !overlapped.hEvent.is_null() {
            unsafe { WaitForSingleObject(overlapped.hEvent, INFINITE) };
        }
        if !overlapped.hEvent.is_null() {
            unsafe { CloseHandle(overlapped.hEvent) };
        }
        ok != 0
    }
}
