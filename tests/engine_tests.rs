//! End-to-end engine tests over tempdir fixtures, with a test partition
//! provider and a recording journal capability.
//!
//! The entropy interrupt flag is process-global, so every test serializes on
//! one lock.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use shredkit::disk_detect::{DriveType, PartitionProvider};
use shredkit::engine::{ShredEngine, SqliteWorkList};
use shredkit::types::{ENTROPY_UNKNOWN, ErasureMethod, PortablePartition, ShredderSettings};
use shredkit::volume::VolumeOps;
use shredkit::{ShredError, entropy, file_key};

fn serial() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

struct TestPartitions {
    partitions: Vec<PortablePartition>,
    kind: DriveType,
}

impl TestPartitions {
    /// One drive, one partition rooted at `dir`.
    fn single(dir: &Path, filesystem: &str, kind: DriveType) -> Self {
        let mut root = dir.display().to_string();
        if !root.ends_with(std::path::MAIN_SEPARATOR) {
            root.push(std::path::MAIN_SEPARATOR);
        }
        Self {
            partitions: vec![PortablePartition {
                root,
                filesystem: filesystem.to_string(),
                drive_index: 0,
            }],
            kind,
        }
    }

    fn root(&self) -> &str {
        &self.partitions[0].root
    }
}

impl PartitionProvider for TestPartitions {
    fn partitions(&self) -> Vec<PortablePartition> {
        self.partitions.clone()
    }

    fn drive_type(&self, _drive_index: usize) -> DriveType {
        self.kind
    }
}

struct JournalRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl VolumeOps for JournalRecorder {
    fn clean_ntfs_journal(&self, root: &str) -> bool {
        self.calls.lock().unwrap().push(root.to_string());
        true
    }
}

struct Fixture {
    engine: ShredEngine,
    journal_calls: Arc<Mutex<Vec<String>>>,
    root: String,
}

fn engine_for(
    dir: &Path,
    settings: ShredderSettings,
    filesystem: &str,
    kind: DriveType,
) -> Fixture {
    let store = SqliteWorkList::open_in_memory().unwrap();
    let provider = TestPartitions::single(dir, filesystem, kind);
    let journal_calls = Arc::new(Mutex::new(Vec::new()));
    let recorder = JournalRecorder {
        calls: Arc::clone(&journal_calls),
    };
    let engine = ShredEngine::assemble(
        settings,
        Box::new(store),
        &provider,
        Box::new(recorder),
    )
    .unwrap();
    Fixture {
        engine,
        journal_calls,
        root: provider.root().to_string(),
    }
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

// --- submit / entropy ---

#[test]
fn test_submit_inserts_then_entropy_follows() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "a.txt", b"hello world\n");
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    // Freeze entropy checks so the freshly inserted row keeps its sentinel.
    entropy::set_interrupted(true);
    fx.engine.submit(&path_str(&path), false, false, None).unwrap();
    fx.engine.wait_for_checks();

    let rows = fx.engine.read_table().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].key, file_key(&path_str(&path)));
    assert!(rows[0].flags.is_file());
    assert!(!rows[0].flags.is_system_added());
    assert_eq!(rows[0].entropy, ENTROPY_UNKNOWN);

    // Replay without insert: entropy only.
    entropy::set_interrupted(false);
    fx.engine.submit(&path_str(&path), false, true, None).unwrap();
    fx.engine.wait_for_checks();

    let rows = fx.engine.read_table().unwrap();
    assert_eq!(rows.len(), 1);
    assert!(
        (rows[0].entropy - 3.022055).abs() < 1e-3,
        "entropy = {}",
        rows[0].entropy
    );
}

#[test]
fn test_submit_rejects_nonexistent_path() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    let ghost = path_str(&dir.path().join("ghost.txt"));
    assert!(matches!(
        fx.engine.submit(&ghost, false, false, None),
        Err(ShredError::InvalidPath(_))
    ));
    assert!(matches!(
        fx.engine.submit("", false, false, None),
        Err(ShredError::InvalidPath(_))
    ));
}

#[test]
fn test_duplicate_submit_fails_when_cache_coherent() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "dup.txt", b"data");
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    fx.engine.submit(&path_str(&path), false, false, None).unwrap();
    fx.engine.wait_for_checks();

    // A read brings the cache in line with the store.
    let files = fx.engine.files_prepared().unwrap();
    assert!(files.contains_key(&path_str(&path)));
    assert!(fx.engine.cache_is_ready());

    assert!(matches!(
        fx.engine.submit(&path_str(&path), false, false, None),
        Err(ShredError::AlreadyPresent(_))
    ));
}

#[test]
fn test_entropy_update_marks_cache_stale() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let first = write_file(dir.path(), "one.bin", &[1u8; 512]);
    let second = write_file(dir.path(), "two.bin", &[2u8; 512]);
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    fx.engine.submit(&path_str(&first), false, false, None).unwrap();
    fx.engine.wait_for_checks();
    fx.engine.files_prepared().unwrap();
    assert!(fx.engine.cache_is_ready());

    fx.engine.submit(&path_str(&second), false, false, None).unwrap();
    fx.engine.wait_for_checks();
    assert!(!fx.engine.cache_is_ready());

    // a fresh table read restores coherence
    fx.engine.read_table().unwrap();
    assert!(fx.engine.cache_is_ready());
}

// --- remove / clean ---

#[test]
fn test_remove_is_idempotent() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "rm.txt", b"bye");
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    fx.engine.submit(&path_str(&path), false, false, None).unwrap();
    fx.engine.wait_for_checks();

    assert!(fx.engine.remove(&path_str(&path)).unwrap());
    assert!(!fx.engine.remove(&path_str(&path)).unwrap());
    assert!(fx.engine.files_prepared().unwrap().is_empty());
    // the file itself is untouched by remove
    assert!(path.exists());
}

#[test]
fn test_clean_user_files_keeps_system_rows() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let user_a = write_file(dir.path(), "ua.txt", b"u");
    let user_b = write_file(dir.path(), "ub.txt", b"u");
    let sys_a = write_file(dir.path(), "sa.txt", b"s");
    let sys_b = write_file(dir.path(), "sb.txt", b"s");
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    for p in [&user_a, &user_b] {
        fx.engine.submit(&path_str(p), false, false, None).unwrap();
    }
    for p in [&sys_a, &sys_b] {
        fx.engine.submit(&path_str(p), true, false, None).unwrap();
    }
    fx.engine.wait_for_checks();

    fx.engine.clean_user_files().unwrap();
    assert!(!fx.engine.cache_is_ready());

    let rows = fx.engine.read_table().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.flags.is_system_added()));

    let files = fx.engine.files_prepared().unwrap();
    assert!(files.contains_key(&path_str(&sys_a)));
    assert!(!files.contains_key(&path_str(&user_a)));
}

#[test]
fn test_clean_drops_everything() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "all.txt", b"x");
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    fx.engine.submit(&path_str(&path), true, false, None).unwrap();
    fx.engine.wait_for_checks();
    fx.engine.clean().unwrap();

    assert!(fx.engine.read_table().unwrap().is_empty());
    assert!(fx.engine.files_prepared().unwrap().is_empty());
    assert!(path.exists());
}

// --- routing ---

#[test]
fn test_unmanaged_path_is_dropped_from_cache_only() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let path = write_file(outside.path(), "elsewhere.txt", b"o");
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    // insert succeeds, but no managed drive claims the path
    fx.engine.submit(&path_str(&path), false, false, None).unwrap();
    fx.engine.wait_for_checks();

    assert_eq!(fx.engine.read_table().unwrap().len(), 1);
    assert!(fx.engine.files_prepared().unwrap().is_empty());
}

#[test]
fn test_directory_submissions_deduplicate() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("subdir");
    std::fs::create_dir(&sub).unwrap();
    write_file(&sub, "inner.txt", b"i");
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    fx.engine.submit(&path_str(&sub), false, false, None).unwrap();
    // duplicate lands in the store error path or the cache dedup; the
    // prepared list must stay single either way
    let _ = fx.engine.submit(&path_str(&sub), false, false, None);
    fx.engine.wait_for_checks();

    let dirs = fx.engine.directories_prepared().unwrap();
    assert_eq!(dirs, vec![path_str(&sub)]);
    assert!(fx.engine.files_prepared().unwrap().is_empty());
}

// --- erase_files ---

#[test]
fn test_erase_files_end_to_end() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let plain = write_file(dir.path(), "plain.txt", b"top secret notes\n");
    let zero = write_file(dir.path(), "zero.bin", b"");
    let blob = write_file(dir.path(), "blob.bin", &[0xA5u8; 300_000]);
    let sub = dir.path().join("folder");
    std::fs::create_dir(&sub).unwrap();
    write_file(&sub, "nested.txt", b"nested");

    let settings = ShredderSettings {
        method: ErasureMethod::Full,
        ..Default::default()
    };
    let fx = engine_for(dir.path(), settings, "NTFS", DriveType::Hdd);

    for p in [&plain, &zero, &blob] {
        fx.engine.submit(&path_str(p), false, false, None).unwrap();
    }
    fx.engine.submit(&path_str(&sub), false, false, None).unwrap();
    fx.engine.wait_for_checks();

    fx.engine.erase_files().unwrap();

    assert!(!plain.exists());
    assert!(!zero.exists());
    assert!(!blob.exists());
    assert!(!sub.exists());

    // table dropped, cache empty
    assert!(fx.engine.read_table().unwrap().is_empty());
    assert!(fx.engine.cache_is_empty());

    // journal purge for the affected NTFS root
    assert_eq!(*fx.journal_calls.lock().unwrap(), vec![fx.root.clone()]);
}

#[test]
fn test_erase_files_skips_journal_when_disabled() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "f.txt", b"f");
    let settings = ShredderSettings {
        ntfs_erase: false,
        ..Default::default()
    };
    let fx = engine_for(dir.path(), settings, "NTFS", DriveType::Hdd);

    fx.engine.submit(&path_str(&path), false, false, None).unwrap();
    fx.engine.wait_for_checks();
    fx.engine.erase_files().unwrap();

    assert!(!path.exists());
    assert!(fx.journal_calls.lock().unwrap().is_empty());
}

#[test]
fn test_erase_files_skips_journal_on_non_ntfs() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "g.txt", b"g");
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    fx.engine.submit(&path_str(&path), false, false, None).unwrap();
    fx.engine.wait_for_checks();
    fx.engine.erase_files().unwrap();

    assert!(!path.exists());
    assert!(fx.journal_calls.lock().unwrap().is_empty());
}

#[test]
fn test_parallel_ssd_erase_shreds_every_file() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = (0..8)
        .map(|i| write_file(dir.path(), &format!("f{i}.bin"), &[i as u8; 2048]))
        .collect();
    let settings = ShredderSettings {
        multithreaded_erase: true,
        ..Default::default()
    };
    let fx = engine_for(dir.path(), settings, "ext4", DriveType::Ssd);

    for p in &paths {
        fx.engine.submit(&path_str(p), false, false, None).unwrap();
    }
    fx.engine.wait_for_checks();
    fx.engine.erase_files().unwrap();

    for p in &paths {
        assert!(!p.exists(), "{} survived the shred", p.display());
    }
    assert!(fx.engine.read_table().unwrap().is_empty());
}

#[test]
fn test_erase_files_rebuilds_stale_cache_from_store() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "stale.txt", b"stale");
    let fx = engine_for(
        dir.path(),
        ShredderSettings::default(),
        "ext4",
        DriveType::Hdd,
    );

    fx.engine.submit(&path_str(&path), false, false, None).unwrap();
    fx.engine.wait_for_checks();
    // entropy write-back left the cache stale; erase must refill and still
    // find the file
    assert!(!fx.engine.cache_is_ready());
    fx.engine.erase_files().unwrap();
    assert!(!path.exists());
}

// --- persistence across engine lifecycles ---

#[test]
fn test_work_list_survives_engine_restart() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let db_path = db_dir.path().join(".shredkit");
    let path = write_file(dir.path(), "keep.txt", b"keep me");

    let provider = TestPartitions::single(dir.path(), "ext4", DriveType::Hdd);
    {
        let store = SqliteWorkList::open(&db_path).unwrap();
        let engine = ShredEngine::assemble(
            ShredderSettings::default(),
            Box::new(store),
            &provider,
            Box::new(shredkit::volume::NullVolumeOps),
        )
        .unwrap();
        engine.submit(&path_str(&path), false, false, None).unwrap();
        engine.wait_for_checks();
    }

    let store = SqliteWorkList::open(&db_path).unwrap();
    let engine = ShredEngine::assemble(
        ShredderSettings::default(),
        Box::new(store),
        &provider,
        Box::new(shredkit::volume::NullVolumeOps),
    )
    .unwrap();
    let files = engine.files_prepared().unwrap();
    assert!(files.contains_key(&path_str(&path)));
}
