//! Engine module: the coordinator owning the work-list store, the
//! drive-partitioned cache and the entropy worker pool.

pub mod arg_parser;
pub mod db_ops;
pub mod handlers;
pub mod pool;

pub use arg_parser::{Cli, Commands};
pub use db_ops::{SqliteWorkList, WorkListStore};
pub use handlers::handle_command;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::disk_detect::{PartitionProvider, SysinfoPartitions};
use crate::entropy::{self, ProgressSink, ShannonChecker};
use crate::error::{Result, ShredError};
use crate::pipeline::ShredderCache;
use crate::types::{ENTROPY_UNKNOWN, FileFlags, ShredderSettings, WorkRecord};
use crate::utils::canonical_case;
use crate::volume::VolumeOps;
use pool::EntropyPool;

/// Stable record key: short blake3 digest of the UTF-8 path.
pub fn file_key(path: &str) -> String {
    blake3::hash(path.as_bytes()).to_hex()[..32].to_string()
}

struct EngineState {
    store: Box<dyn WorkListStore>,
    cache: ShredderCache,
}

struct EngineInner {
    state: Mutex<EngineState>,
    pool: EntropyPool,
    volume_ops: Box<dyn VolumeOps>,
}

/// The shredding engine. One value per process is typical, but nothing
/// enforces it; tests build one per case. Cloning shares the same engine.
///
/// Submissions land in the persistent work list and the drive cache, entropy
/// is computed on the worker pool, and `erase_files` runs the per-drive
/// shred loops.
#[derive(Clone)]
pub struct ShredEngine {
    inner: Arc<EngineInner>,
}

impl ShredEngine {
    /// Engine over the on-disk work list at `db_path`, with the default
    /// partition and volume capabilities. Fails when the store cannot be
    /// opened.
    pub fn new(settings: ShredderSettings, db_path: &Path) -> Result<Self> {
        let store = SqliteWorkList::open(db_path)?;
        let provider = SysinfoPartitions::new();
        Self::assemble(
            settings,
            Box::new(store),
            &provider,
            crate::volume::default_volume_ops(),
        )
    }

    /// Engine from explicit capabilities. This is the constructor tests use.
    pub fn assemble(
        settings: ShredderSettings,
        store: Box<dyn WorkListStore>,
        provider: &dyn PartitionProvider,
        volume_ops: Box<dyn VolumeOps>,
    ) -> Result<Self> {
        // New coordinator lifecycle: pending interrupts belong to the old one.
        entropy::set_interrupted(false);

        let cache = ShredderCache::new(provider, &settings);
        let pool = EntropyPool::new(settings.thread_number);
        debug!(
            "engine up: {} entropy workers, method {:?}, ntfs_erase={}",
            pool.threads_number(),
            settings.method,
            settings.ntfs_erase
        );

        Ok(Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(EngineState { store, cache }),
                pool,
                volume_ops,
            }),
        })
    }

    /// Submit a path for erasure.
    ///
    /// With `no_insert` the store and cache are left alone and only the
    /// entropy calculation is (re-)enqueued; used to replay records that are
    /// already persisted.
    pub fn submit(
        &self,
        path: &str,
        system_added: bool,
        no_insert: bool,
        callback: Option<Arc<dyn ProgressSink>>,
    ) -> Result<()> {
        let file_path = canonical_case(path);
        if file_path.is_empty() {
            return Err(ShredError::InvalidPath(path.to_string()));
        }
        let is_file = Path::new(&file_path).is_file();
        if !is_file && !Path::new(&file_path).is_dir() {
            return Err(ShredError::InvalidPath(file_path));
        }

        let key = file_key(&file_path);

        let state = self.inner.state.lock().unwrap();
        if !no_insert {
            if state.cache.is_cache_ready() && state.cache.already_exist(&file_path) {
                debug!("already submitted: {}", file_path);
                return Err(ShredError::AlreadyPresent(file_path));
            }

            let mut flags = FileFlags::default();
            flags.set_system_added(system_added);
            flags.set_is_file(is_file);

            // The cache only learns about the path once the store took it.
            state.store.insert(&key, &file_path, flags)?;
            state.cache.submit(&file_path, ENTROPY_UNKNOWN);
        }
        drop(state);

        let inner = Arc::clone(&self.inner);
        self.inner
            .pool
            .enqueue(move || update_entropy(&inner, &key, &file_path, callback));
        Ok(())
    }

    /// Remove a path from the work list and the cache. Returns false when
    /// the path was not present; repeated calls are harmless.
    pub fn remove(&self, path: &str) -> Result<bool> {
        let file_path = canonical_case(path);
        if file_path.is_empty() {
            return Err(ShredError::InvalidPath(path.to_string()));
        }
        let key = file_key(&file_path);

        let state = self.inner.state.lock().unwrap();
        let removed = state.store.delete(&key)?;
        state.cache.remove(&file_path);
        Ok(removed)
    }

    /// True when the cache already holds the path. Cheap; does not refill a
    /// stale cache.
    pub fn already_exist(&self, path: &str) -> bool {
        let file_path = canonical_case(path);
        let state = self.inner.state.lock().unwrap();
        state.cache.already_exist(&file_path)
    }

    /// Drop the whole work list, user- and system-added entries alike.
    pub fn clean(&self) -> Result<()> {
        let state = self.inner.state.lock().unwrap();
        state.store.drop_table()?;
        state.cache.clean();
        Ok(())
    }

    /// Drop only user-added entries; system-added rows survive. The cache is
    /// marked stale and refills from the store on the next read.
    pub fn clean_user_files(&self) -> Result<()> {
        let state = self.inner.state.lock().unwrap();
        state.store.delete_user_rows()?;
        state.cache.set_cache_ready(false);
        Ok(())
    }

    /// Shred everything: interrupt pending entropy checks, bring the cache
    /// in line with the store, run every drive's shred loop, then drop the
    /// table.
    pub fn erase_files(&self) -> Result<()> {
        debug!("interrupt current checks");
        self.interrupt_checks();

        let mut state = self.inner.state.lock().unwrap();
        if !state.cache.is_cache_ready() {
            debug!("cache refill before shred");
            Self::reset_cache(&mut state)?;
        }
        state.cache.erase_files(self.inner.volume_ops.as_ref());
        state.store.drop_table()?;
        Ok(())
    }

    /// Set the global entropy interrupt, drop queued checks and wait for the
    /// in-flight ones to abort. The flag stays set until a new engine
    /// lifecycle begins.
    pub fn interrupt_checks(&self) {
        entropy::set_interrupted(true);
        self.inner.pool.clear();
        while !self.inner.pool.stopped() {
            thread::sleep(Duration::from_millis(
                crate::utils::config::PoolConsts::IDLE_POLL_MS,
            ));
        }
    }

    /// Read the whole table and rebuild the cache from it.
    pub fn read_table(&self) -> Result<Vec<WorkRecord>> {
        let mut state = self.inner.state.lock().unwrap();
        Self::read_table_locked(&mut state)
    }

    /// Files currently prepared for erasure, path → entropy. Refills a stale
    /// cache first.
    pub fn files_prepared(&self) -> Result<BTreeMap<String, f64>> {
        let mut state = self.inner.state.lock().unwrap();
        if !state.cache.is_cache_ready() {
            debug!("cache refill [files_prepared]");
            Self::reset_cache(&mut state)?;
        }
        Ok(state.cache.files_prepared())
    }

    /// Directories currently prepared for erasure. Refills a stale cache
    /// first.
    pub fn directories_prepared(&self) -> Result<Vec<String>> {
        let mut state = self.inner.state.lock().unwrap();
        if !state.cache.is_cache_ready() {
            debug!("cache refill [directories_prepared]");
            Self::reset_cache(&mut state)?;
        }
        Ok(state.cache.directories_prepared())
    }

    /// True when no drive eraser holds entries (coherent cache only).
    pub fn cache_is_empty(&self) -> bool {
        self.inner.state.lock().unwrap().cache.is_empty()
    }

    pub fn cache_is_ready(&self) -> bool {
        self.inner.state.lock().unwrap().cache.is_cache_ready()
    }

    /// Workers in the entropy pool.
    pub fn threads_number(&self) -> usize {
        self.inner.pool.threads_number()
    }

    /// Block until the entropy pool has drained, without interrupting.
    /// Test and CLI convenience.
    pub fn wait_for_checks(&self) {
        while !self.inner.pool.stopped() {
            thread::sleep(Duration::from_millis(
                crate::utils::config::PoolConsts::IDLE_POLL_MS,
            ));
        }
    }

    fn read_table_locked(state: &mut EngineState) -> Result<Vec<WorkRecord>> {
        let records = state.store.read_all()?;
        for record in &records {
            state.cache.submit(&canonical_case(&record.path), record.entropy);
        }
        state.cache.set_cache_ready(true);
        Ok(records)
    }

    fn reset_cache(state: &mut EngineState) -> Result<()> {
        debug!("reset cache");
        state.cache.clean();
        Self::read_table_locked(state)?;
        Ok(())
    }
}

/// Entropy worker body: classify the file, write the result back, let the
/// caller's sink clean up, and mark the cache stale. The store is
/// authoritative; on store failure the cache is still marked stale.
fn update_entropy(
    inner: &EngineInner,
    key: &str,
    file_path: &str,
    callback: Option<Arc<dyn ProgressSink>>,
) {
    let checker = match &callback {
        Some(cb) => ShannonChecker::with_callback(Arc::clone(cb)),
        None => ShannonChecker::new(),
    };
    let entropy = checker.file_entropy(Path::new(file_path));

    let state = inner.state.lock().unwrap();
    if let Err(err) = state.store.update_entropy(key, entropy) {
        warn!("unable to store entropy for {}: {}", file_path, err);
    }
    if let Some(cb) = &callback {
        cb.cleanup();
    }
    state.cache.set_cache_ready(false);
}
