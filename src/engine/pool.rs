//! Worker pool for entropy calculation tasks.
//!
//! A fixed set of threads drains a task channel; `clear` drops everything
//! still queued, and `stopped` reports whether the pool has gone idle.
//! In-flight tasks are never killed, they abort themselves through the
//! global entropy interrupt.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;

type Task = Box<dyn FnOnce() + Send + 'static>;

pub struct EntropyPool {
    tx: Option<Sender<Task>>,
    rx: Receiver<Task>,
    workers: Vec<JoinHandle<()>>,
    /// Tasks queued or running. Zero means idle.
    pending: Arc<AtomicUsize>,
    threads: usize,
}

impl EntropyPool {
    /// Spawn `thread_number` workers; 0 means hardware concurrency.
    pub fn new(thread_number: usize) -> Self {
        let threads = if thread_number == 0 {
            rayon::current_num_threads()
        } else {
            thread_number
        };

        let (tx, rx) = unbounded::<Task>();
        let pending = Arc::new(AtomicUsize::new(0));

        let workers = (0..threads)
            .map(|_| {
                let rx = rx.clone();
                let pending = Arc::clone(&pending);
                thread::spawn(move || {
                    while let Ok(task) = rx.recv() {
                        task();
                        pending.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        Self {
            tx: Some(tx),
            rx,
            workers,
            pending,
            threads,
        }
    }

    pub fn enqueue(&self, task: impl FnOnce() + Send + 'static) {
        if let Some(tx) = &self.tx {
            self.pending.fetch_add(1, Ordering::SeqCst);
            if tx.send(Box::new(task)).is_err() {
                self.pending.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Drop queued tasks that no worker has picked up yet.
    pub fn clear(&self) {
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            dropped += 1;
        }
        if dropped > 0 {
            debug!("dropped {} queued entropy tasks", dropped);
        }
    }

    /// True when nothing is queued or running.
    pub fn stopped(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0
    }

    pub fn threads_number(&self) -> usize {
        self.threads
    }
}

impl Drop for EntropyPool {
    fn drop(&mut self) {
        self.clear();
        // Closing the channel lets the workers run off the end of recv().
        self.tx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
