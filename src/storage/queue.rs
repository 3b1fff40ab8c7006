//! Background save queue
//!
//! Saves triggered by value changes are fire-and-forget: the caller encodes the
//! value and hands the bytes to a single worker thread, which applies jobs in
//! submission order. One worker per queue means two saves of the same key can
//! never land out of order, so a stale value never overwrites a newer one.
//!
//! The process-wide queue ([`SaveQueue::global`]) lives until exit. Call
//! [`SaveQueue::flush`] before exiting if pending writes must reach the disk.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use super::PersistenceStore;
use crate::domain::Key;

static GLOBAL: OnceLock<SaveQueue> = OnceLock::new();

enum Job {
    Save {
        store: Arc<PersistenceStore>,
        key: Key,
        bytes: Vec<u8>,
    },
    Delete {
        store: Arc<PersistenceStore>,
        key: Key,
        done: Option<Sender<()>>,
    },
    Flush(Sender<()>),
}

impl Job {
    fn run(self) {
        match self {
            Job::Save { store, key, bytes } => store.save(&key, &bytes),
            Job::Delete { store, key, done } => {
                store.delete(&key);
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

struct Worker {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is left and exit
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("save worker panicked");
            }
        }
    }
}

/// Handle to a FIFO background writer
#[derive(Clone)]
pub struct SaveQueue {
    worker: Arc<Worker>,
}

impl SaveQueue {
    /// Spawns a new worker thread
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || run_worker(rx));

        Self {
            worker: Arc::new(Worker {
                tx: Some(tx),
                handle: Some(handle),
            }),
        }
    }

    /// Returns the process-wide queue
    pub fn global() -> Self {
        GLOBAL.get_or_init(Self::new).clone()
    }

    /// Schedules a write of `bytes` for `key`
    pub fn save(&self, store: &Arc<PersistenceStore>, key: Key, bytes: Vec<u8>) {
        tracing::trace!(%key, len = bytes.len(), "save queued");
        self.submit(Job::Save {
            store: store.clone(),
            key,
            bytes,
        });
    }

    /// Schedules a delete of the record for `key`
    pub fn delete(&self, store: &Arc<PersistenceStore>, key: Key) {
        self.submit(Job::Delete {
            store: store.clone(),
            key,
            done: None,
        });
    }

    /// Deletes the record for `key` after every job queued before it, and
    /// waits for the delete to happen
    pub fn delete_and_wait(&self, store: &Arc<PersistenceStore>, key: Key) {
        let _ = self.delete_acked(store, key).recv();
    }

    /// Schedules a delete and returns a receiver signalled once it has run
    pub fn delete_acked(&self, store: &Arc<PersistenceStore>, key: Key) -> Receiver<()> {
        let (done, finished) = mpsc::channel();
        self.submit(Job::Delete {
            store: store.clone(),
            key,
            done: Some(done),
        });
        finished
    }

    /// Blocks until every job submitted so far has been applied
    pub fn flush(&self) {
        let (done, finished) = mpsc::channel();
        self.submit(Job::Flush(done));
        let _ = finished.recv();
    }

    fn submit(&self, job: Job) {
        let rejected = match &self.worker.tx {
            Some(tx) => tx.send(job).err().map(|e| e.0),
            None => Some(job),
        };

        // The worker is gone; do the work here rather than lose it
        if let Some(job) = rejected {
            tracing::warn!("save worker unavailable, running job inline");
            job.run();
        }
    }
}

impl Default for SaveQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SaveQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveQueue").finish_non_exhaustive()
    }
}

fn run_worker(rx: Receiver<Job>) {
    for job in rx {
        job.run();
    }
    tracing::trace!("save worker stopped");
}
