//! Background write-back of eviction batches
//!
//! A bounded queue drained by one dedicated worker thread. Dropping the
//! worker closes the queue and joins the thread, so every batch accepted
//! before shutdown reaches the store; batches are only lost if the process
//! dies first, which is the documented trade of asynchronous write-back.

use crossbeam::channel::{self, Sender, TrySendError};
use omnicache_core::{BackingStore, Result, WriteBatch, WriteOptions};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Batches the queue holds before submitters degrade to inline writes
const QUEUE_CAPACITY: usize = 32;

/// Owns the write-back thread and its submission queue
pub struct WriteBackWorker {
    tx: Option<Sender<(WriteOptions, WriteBatch)>>,
    handle: Option<JoinHandle<()>>,
    store: Arc<dyn BackingStore>,
}

impl WriteBackWorker {
    pub fn spawn(store: Arc<dyn BackingStore>) -> Result<Self> {
        let (tx, rx) = channel::bounded::<(WriteOptions, WriteBatch)>(QUEUE_CAPACITY);
        let worker_store = Arc::clone(&store);
        let handle = std::thread::Builder::new()
            .name("omnicache-writeback".to_string())
            .spawn(move || {
                for (options, batch) in rx {
                    let count = batch.len();
                    if let Err(err) = worker_store.write(&options, batch) {
                        log::warn!("write-back of {} evicted entries failed: {}", count, err);
                    }
                }
            })?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            store,
        })
    }

    /// Hands a batch to the worker.
    ///
    /// A full or closed queue degrades to inline single-key writes rather
    /// than blocking the eviction cycle on I/O.
    pub fn submit(&self, options: WriteOptions, batch: WriteBatch) {
        let tx = match &self.tx {
            Some(tx) => tx,
            None => return,
        };
        match tx.try_send((options, batch)) {
            Ok(()) => {}
            Err(TrySendError::Full((_, batch))) | Err(TrySendError::Disconnected((_, batch))) => {
                log::warn!(
                    "write-back queue unavailable, writing {} puts inline",
                    batch.len()
                );
                for put in batch.puts() {
                    if let Err(err) = self.store.put_evicted(&put.key, &put.value) {
                        log::warn!("inline write-back failed: {}", err);
                    }
                }
            }
        }
    }
}

impl Drop for WriteBackWorker {
    fn drop(&mut self) {
        // Close the queue, then wait for the worker to drain it.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("write-back worker panicked during drain");
            }
        }
    }
}
