// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Background sample delivery.
//!
//! A [`DeliveryWorker`] is bound to one reader and drains its incoming-sample
//! queue, invoking the registered callbacks. The lifecycle layer consumes it
//! only through the control surface `start` / `stop` / `set_source` / `poll`:
//! the queuing strategy behind the runtime's `take_samples` is not its
//! concern. `stop` blocks until the run loop has observed the stop flag,
//! which is what makes it safe to tear entities down afterwards.
//!
//! The [`WorkerPool`] fans work out for two users: asynchronous callback
//! dispatch and bulk topic teardown.

use crate::runtime::{ParticipantRuntime, ReaderHandle, Sample};
use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Poll interval of the worker's run loop.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Samples drained per poll.
const DRAIN_BATCH: usize = 64;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size thread pool fed by a crossbeam channel.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` worker threads (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let (sender, receiver) = channel::unbounded::<Job>();
        let mut threads = Vec::with_capacity(size.max(1));
        for index in 0..size.max(1) {
            let receiver = receiver.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("steward-pool-{}", index))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job();
                    }
                });
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(e) => log::error!("[WorkerPool] Failed to spawn worker {}: {}", index, e),
            }
        }
        Self {
            sender: Some(sender),
            threads,
        }
    }

    /// Submit a job for execution on the pool.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(sender) = &self.sender {
            if sender.send(Box::new(job)).is_err() {
                log::error!("[WorkerPool] Job submitted after shutdown, dropped");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets each worker drain and exit.
        self.sender.take();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads.len())
            .finish()
    }
}

/// Callback invoked for each drained sample payload.
pub type SampleCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Background consumer bound to one reader.
pub struct DeliveryWorker {
    runtime: Arc<dyn ParticipantRuntime>,
    pool: Arc<WorkerPool>,
    source: Arc<Mutex<ReaderHandle>>,
    callbacks: Arc<Mutex<Vec<SampleCallback>>>,
    asynchronous: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryWorker {
    /// New stopped worker bound to `reader`.
    pub fn new(
        runtime: Arc<dyn ParticipantRuntime>,
        pool: Arc<WorkerPool>,
        reader: ReaderHandle,
    ) -> Self {
        Self {
            runtime,
            pool,
            source: Arc::new(Mutex::new(reader)),
            callbacks: Arc::new(Mutex::new(Vec::new())),
            asynchronous: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
    }

    /// Register a callback for drained samples.
    pub fn add_callback(&self, callback: SampleCallback) {
        self.callbacks.lock().push(callback);
    }

    /// Dispatch callbacks onto the pool instead of the worker thread.
    pub fn set_async(&self, asynchronous: bool) {
        self.asynchronous.store(asynchronous, Ordering::Release);
    }

    /// Whether the run loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Rebind the worker to a new reader handle.
    ///
    /// Only valid while stopped; the filter-replacement protocol stops the
    /// worker before the old reader is deleted and rebinds before restart.
    pub fn set_source(&self, reader: ReaderHandle) {
        *self.source.lock() = reader;
    }

    /// Start the run loop. Idempotent while running.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }

        let runtime = Arc::clone(&self.runtime);
        let pool = Arc::clone(&self.pool);
        let source = Arc::clone(&self.source);
        let callbacks = Arc::clone(&self.callbacks);
        let asynchronous = Arc::clone(&self.asynchronous);
        let running = Arc::clone(&self.running);

        let spawned = std::thread::Builder::new()
            .name("steward-delivery".to_string())
            .spawn(move || {
                while running.load(Ordering::Acquire) {
                    let reader = *source.lock();
                    match runtime.take_samples(reader, DRAIN_BATCH) {
                        Ok(samples) if !samples.is_empty() => {
                            dispatch(&pool, &callbacks, &asynchronous, samples);
                        }
                        Ok(_) => std::thread::sleep(POLL_INTERVAL),
                        Err(code) => {
                            log::debug!(
                                "[DeliveryWorker] take_samples rejected: {}",
                                code.name()
                            );
                            std::thread::sleep(POLL_INTERVAL);
                        }
                    }
                }
            });

        match spawned {
            Ok(handle) => *self.thread.lock() = Some(handle),
            Err(e) => {
                log::error!("[DeliveryWorker] Failed to spawn run loop: {}", e);
                self.running.store(false, Ordering::Release);
            }
        }
    }

    /// Stop the run loop, blocking until it has observed the flag.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }

    /// Drain the queue now, invoking callbacks inline.
    ///
    /// Used in queued mode where the caller decides when delivery happens.
    pub fn poll(&self) {
        let reader = *self.source.lock();
        match self.runtime.take_samples(reader, usize::MAX) {
            Ok(samples) if !samples.is_empty() => {
                let callbacks = self.callbacks.lock().clone();
                for sample in &samples {
                    for callback in &callbacks {
                        callback(sample);
                    }
                }
            }
            Ok(_) => {}
            Err(code) => {
                log::debug!("[DeliveryWorker] poll rejected: {}", code.name());
            }
        }
    }
}

fn dispatch(
    pool: &Arc<WorkerPool>,
    callbacks: &Arc<Mutex<Vec<SampleCallback>>>,
    asynchronous: &Arc<AtomicBool>,
    samples: Vec<Sample>,
) {
    let callbacks = callbacks.lock().clone();
    if callbacks.is_empty() {
        return;
    }
    if asynchronous.load(Ordering::Acquire) {
        for sample in samples {
            let callbacks = callbacks.clone();
            pool.execute(move || {
                for callback in &callbacks {
                    callback(&sample);
                }
            });
        }
    } else {
        for sample in &samples {
            for callback in &callbacks {
                callback(sample);
            }
        }
    }
}

impl Drop for DeliveryWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for DeliveryWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryWorker")
            .field("reader", &*self.source.lock())
            .field("running", &self.is_running())
            .field("callbacks", &self.callbacks.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::mock::MockRuntime;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn worker_with_reader() -> (Arc<MockRuntime>, DeliveryWorker, ReaderHandle) {
        let runtime = Arc::new(MockRuntime::new());
        let reader = runtime.raw_reader();
        let pool = Arc::new(WorkerPool::new(2));
        let worker = DeliveryWorker::new(
            Arc::clone(&runtime) as Arc<dyn ParticipantRuntime>,
            pool,
            reader,
        );
        (runtime, worker, reader)
    }

    #[test]
    fn test_pool_runs_jobs() {
        let pool = WorkerPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..16 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool); // joins workers after the queue drains
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_poll_drains_pending_samples() {
        let (runtime, worker, reader) = worker_with_reader();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        worker.add_callback(Arc::new(move |_payload| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        }));

        runtime.push_sample(reader, b"one".to_vec());
        runtime.push_sample(reader, b"two".to_vec());
        worker.poll();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_start_stop_blocks_until_loop_exits() {
        let (runtime, worker, reader) = worker_with_reader();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        worker.add_callback(Arc::new(move |_payload| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        }));

        worker.start();
        assert!(worker.is_running());
        runtime.push_sample(reader, b"sample".to_vec());

        let deadline = Instant::now() + Duration::from_secs(2);
        while seen.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        worker.stop();
        assert!(!worker.is_running());
        // A second stop is a no-op.
        worker.stop();
    }
}
