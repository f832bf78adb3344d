//! Random mask buffer written over file bytes during a shred.

use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::utils::config::MaskConsts;

/// 64 KiB buffer of uniform random bytes, filled asynchronously on
/// construction and published once. Safe to read concurrently; contents are
/// stable for the life of the source.
pub struct MaskSource {
    buffer: Arc<OnceLock<Vec<u8>>>,
}

impl MaskSource {
    /// Start the background fill. The buffer becomes readable once the fill
    /// thread publishes it; [`Self::sequence`] blocks until then.
    pub fn new() -> Self {
        let buffer = Arc::new(OnceLock::new());
        let cell = Arc::clone(&buffer);
        thread::spawn(move || {
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut bytes = vec![0u8; MaskConsts::BUFFER_SIZE];
            rng.fill(&mut bytes[..]);
            let _ = cell.set(bytes);
        });
        Self { buffer }
    }

    /// The mask bytes. Blocks until the background fill has published them.
    pub fn sequence(&self) -> &[u8] {
        self.buffer.wait().as_slice()
    }

    pub fn len(&self) -> usize {
        MaskConsts::BUFFER_SIZE
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for MaskSource {
    fn default() -> Self {
        Self::new()
    }
}
