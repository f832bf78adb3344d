//! Shannon entropy estimation over byte frequencies, and the mapping from
//! entropy + size to an encryption-likelihood class.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::types::ENTROPY_UNKNOWN;
use crate::utils::config::EntropyConsts;

/// Process-wide interrupt for every running entropy calculation. Read with
/// relaxed ordering inside the tight loops; a stale read only delays the
/// abort by one buffer of work.
static INTERRUPT_ALL: AtomicBool = AtomicBool::new(false);

/// Set or clear the global interrupt. Cleared when a new engine lifecycle
/// begins; tests may toggle it directly.
pub fn set_interrupted(flag: bool) {
    INTERRUPT_ALL.store(flag, Ordering::Relaxed);
}

pub fn is_interrupted() -> bool {
    INTERRUPT_ALL.load(Ordering::Relaxed)
}

/// Progress observer for a single entropy calculation.
///
/// `init` fires once with the total byte count, `set_value` at each 1%-of-file
/// boundary. `cleanup` is invoked by the engine after the result has been
/// stored, never by the checker itself.
pub trait ProgressSink: Send + Sync {
    fn init(&self, total_bytes: u64);
    fn set_value(&self, bytes_done: u64);
    fn cleanup(&self);
}

/// Information-entropy class of a byte sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntropyClass {
    Plain,
    Binary,
    Encrypted,
    Unknown,
}

impl EntropyClass {
    pub fn description(&self) -> &'static str {
        match self {
            EntropyClass::Plain => "Plain",
            EntropyClass::Binary => "Binary",
            EntropyClass::Encrypted => "Encrypted",
            EntropyClass::Unknown => "Unknown",
        }
    }
}

/// Shannon entropy checker for files and in-memory sequences.
#[derive(Default)]
pub struct ShannonChecker {
    callback: Option<Arc<dyn ProgressSink>>,
}

impl ShannonChecker {
    pub fn new() -> Self {
        Self { callback: None }
    }

    pub fn with_callback(callback: Arc<dyn ProgressSink>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Entropy of the file at `path` in `[0, 8]`.
    ///
    /// Returns [`ENTROPY_UNKNOWN`] iff the file cannot be opened or the
    /// calculation was interrupted. A zero-length file has entropy `0.0`.
    pub fn file_entropy(&self, path: &Path) -> f64 {
        let file_size = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(err) => {
                debug!("entropy: cannot stat {}: {}", path.display(), err);
                return ENTROPY_UNKNOWN;
            }
        };
        if file_size == 0 {
            return 0.0;
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(err) => {
                debug!("entropy: cannot open {}: {}", path.display(), err);
                return ENTROPY_UNKNOWN;
            }
        };

        if let Some(cb) = &self.callback {
            cb.init(file_size);
        }
        let report_step = progress_step(file_size);
        let mut next_report = report_step;

        let mut reader = BufReader::with_capacity(EntropyConsts::READ_CHUNK_SIZE, file);
        let mut buffer = vec![0u8; EntropyConsts::READ_CHUNK_SIZE];
        let mut counts = [0u64; 256];
        let mut bytes_done: u64 = 0;

        loop {
            if is_interrupted() {
                return ENTROPY_UNKNOWN;
            }
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) => {
                    debug!("entropy: read error on {}: {}", path.display(), err);
                    return ENTROPY_UNKNOWN;
                }
            };
            for &b in &buffer[..n] {
                counts[b as usize] += 1;
            }
            bytes_done += n as u64;
            if let Some(cb) = &self.callback {
                while bytes_done >= next_report {
                    cb.set_value(bytes_done);
                    next_report += report_step;
                }
            }
        }

        shannon_entropy(&counts, bytes_done)
    }

    /// Entropy of an in-memory byte sequence; same formula as [`Self::file_entropy`].
    pub fn sequence_entropy(&self, bytes: &[u8]) -> f64 {
        if bytes.is_empty() {
            return 0.0;
        }

        if let Some(cb) = &self.callback {
            cb.init(bytes.len() as u64);
        }
        let report_step = progress_step(bytes.len() as u64);
        let mut next_report = report_step;

        let mut counts = [0u64; 256];
        let mut bytes_done: u64 = 0;
        for chunk in bytes.chunks(EntropyConsts::READ_CHUNK_SIZE) {
            if is_interrupted() {
                return ENTROPY_UNKNOWN;
            }
            for &b in chunk {
                counts[b as usize] += 1;
            }
            bytes_done += chunk.len() as u64;
            if let Some(cb) = &self.callback {
                while bytes_done >= next_report {
                    cb.set_value(bytes_done);
                    next_report += report_step;
                }
            }
        }

        shannon_entropy(&counts, bytes.len() as u64)
    }
}

/// Callback cadence: once per 1% of the sequence, floored at 1 KiB.
fn progress_step(total: u64) -> u64 {
    (total / 100).max(EntropyConsts::PROGRESS_FLOOR)
}

/// `H = −Σ p_i·log2(p_i)` over the non-zero byte probabilities.
fn shannon_entropy(counts: &[u64; 256], total: u64) -> f64 {
    let mut entropy = 0.0;
    for &count in counts.iter().filter(|&&c| c > 0) {
        let p = count as f64 / total as f64;
        entropy -= p * p.log2();
    }
    entropy
}

/// Map entropy and sample size to a class.
///
/// Encrypted or highly compressed payloads have entropy arbitrarily close to
/// 8.0; the tolerance shrinks with the sample size as the estimator variance
/// does.
pub fn estimate(entropy: f64, size: u64) -> EntropyClass {
    if entropy == ENTROPY_UNKNOWN {
        return EntropyClass::Unknown;
    }
    if (8.0 - entropy) < estimated_epsilon(size) {
        return EntropyClass::Encrypted;
    }
    if entropy > 6.0 {
        return EntropyClass::Binary;
    }
    if (0.0..=6.0).contains(&entropy) {
        return EntropyClass::Plain;
    }
    debug!("entropy out of range: {}", entropy);
    EntropyClass::Unknown
}

/// Size-dependent tolerance distinguishing encrypted data from merely
/// high-entropy binary data.
pub fn estimated_epsilon(sample_size: u64) -> f64 {
    if sample_size < 1024 * 1024 {
        1e-3
    } else if sample_size < 1024 * 1024 * 64 {
        1e-4
    } else if sample_size < 1024 * 1024 * 512 {
        1e-5
    } else {
        1e-6
    }
}

/// Lower bound on the losslessly compressed size of a sequence.
pub fn min_compressed_size(entropy: f64, sequence_size: u64) -> u64 {
    ((entropy * sequence_size as f64) / 8.0) as u64
}
