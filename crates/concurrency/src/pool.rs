//! Fixed-size worker pool for conversion tasks.
//!
//! Tasks are executed FIFO by a fixed set of worker threads. The queue has a
//! maximum depth; when it is full, or after the pool has been shut down, the
//! submitting thread runs the task itself. No task is ever rejected, which
//! keeps the fan-in side of a conversion simple: every submitted task
//! completes exactly once.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

/// Default maximum number of queued tasks
pub const DEFAULT_MAX_QUEUE_DEPTH: usize = 4096;

/// Where a submitted task ended up running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to a worker thread
    Queued,
    /// Run on the submitting thread (queue full or pool shut down)
    Inline,
}

/// Pool metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of tasks waiting in the queue.
    pub queue_depth: usize,
    /// Number of tasks currently being executed by workers.
    pub active_tasks: usize,
    /// Tasks completed by workers since pool creation.
    pub tasks_completed: u64,
    /// Tasks the submitting thread ran itself.
    pub tasks_inline: u64,
    /// Number of worker threads.
    pub worker_count: usize,
}

type Work = Box<dyn FnOnce() + Send>;

struct PoolInner {
    queue: Mutex<VecDeque<Work>>,
    work_ready: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    max_queue_depth: usize,
    tasks_completed: AtomicU64,
    tasks_inline: AtomicU64,
}

/// Worker pool running conversion tasks.
///
/// Shared between the one-shot write path and every transaction of a sink,
/// so conversion parallelism is bounded per sink rather than per call.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
}

impl WorkerPool {
    /// Create a pool with `num_threads` workers.
    ///
    /// Workers are named `docsink-convert-0`, `docsink-convert-1`, etc.
    /// A pool with zero workers runs every task inline.
    ///
    /// # Errors
    ///
    /// Returns the OS error if a worker thread cannot be spawned. Workers
    /// spawned before the failure are shut down.
    pub fn new(num_threads: usize, max_queue_depth: usize) -> io::Result<Self> {
        let inner = Arc::new(PoolInner {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            max_queue_depth,
            tasks_completed: AtomicU64::new(0),
            tasks_inline: AtomicU64::new(0),
        });

        let pool = WorkerPool {
            inner,
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            num_threads,
        };

        for i in 0..num_threads {
            let inner = Arc::clone(&pool.inner);
            // On error, dropping `pool` joins the workers already spawned
            let handle = std::thread::Builder::new()
                .name(format!("docsink-convert-{}", i))
                .spawn(move || worker_loop(&inner))?;
            pool.workers.lock().push(handle);
        }

        debug!(
            target: "docsink::convert",
            workers = num_threads,
            max_queue_depth,
            "Conversion pool started"
        );
        Ok(pool)
    }

    /// Create a pool sized to the machine's available parallelism.
    pub fn with_available_parallelism(max_queue_depth: usize) -> io::Result<Self> {
        Self::new(available_parallelism(), max_queue_depth)
    }

    /// Submit a task.
    ///
    /// Runs the task on the calling thread when the queue is at capacity or
    /// the pool has been shut down.
    pub fn execute(&self, work: impl FnOnce() + Send + 'static) -> Dispatch {
        let work: Work = Box::new(work);
        let inline = if self.num_threads == 0 {
            Some(work)
        } else {
            // Workers only exit after seeing `shutdown` with an empty queue
            // while holding this lock, so a task pushed here is never stranded.
            let mut queue = self.inner.queue.lock();
            if self.inner.shutdown.load(AtomicOrdering::Acquire)
                || queue.len() >= self.inner.max_queue_depth
            {
                Some(work)
            } else {
                queue.push_back(work);
                self.inner.queue_depth.fetch_add(1, AtomicOrdering::Release);
                None
            }
        };

        match inline {
            Some(work) => {
                self.inner.tasks_inline.fetch_add(1, AtomicOrdering::Relaxed);
                work();
                Dispatch::Inline
            }
            None => {
                self.inner.work_ready.notify_one();
                Dispatch::Queued
            }
        }
    }

    /// Block until all queued and in-flight tasks have completed.
    ///
    /// Workers remain running after drain completes.
    pub fn drain(&self) {
        let mut queue = self.inner.queue.lock();
        while self.inner.queue_depth.load(AtomicOrdering::Acquire) > 0
            || self.inner.active_tasks.load(AtomicOrdering::Acquire) > 0
        {
            self.inner.drain_cond.wait(&mut queue);
        }
    }

    /// Shut down the pool: signal workers to exit and join all threads.
    ///
    /// Workers finish every queued task before exiting. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, AtomicOrdering::Release);

        // Notify under the queue lock so a worker between its shutdown check
        // and its wait cannot miss the wakeup.
        {
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }

        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// True once [`WorkerPool::shutdown`] has been called
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(AtomicOrdering::Acquire)
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.num_threads
    }

    /// Return a snapshot of pool metrics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queue_depth: self.inner.queue_depth.load(AtomicOrdering::Relaxed),
            active_tasks: self.inner.active_tasks.load(AtomicOrdering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(AtomicOrdering::Relaxed),
            tasks_inline: self.inner.tasks_inline.load(AtomicOrdering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Number of workers to use when none is configured
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Decrements `active_tasks` and wakes drain waiters on drop, including
/// when the task panicked.
struct ActiveTaskGuard<'a> {
    inner: &'a PoolInner,
}

impl Drop for ActiveTaskGuard<'_> {
    fn drop(&mut self) {
        let prev_active = self.inner.active_tasks.fetch_sub(1, AtomicOrdering::Release);
        self.inner
            .tasks_completed
            .fetch_add(1, AtomicOrdering::Relaxed);

        if prev_active == 1 && self.inner.queue_depth.load(AtomicOrdering::Acquire) == 0 {
            let _queue = self.inner.queue.lock();
            self.inner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let work = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(work) = queue.pop_front() {
                    inner.queue_depth.fetch_sub(1, AtomicOrdering::Release);
                    inner.active_tasks.fetch_add(1, AtomicOrdering::Release);
                    break work;
                }
                if inner.shutdown.load(AtomicOrdering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };

        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(work)) {
            error!(
                target: "docsink::convert",
                "conversion task panicked: {}",
                panic_message(e.as_ref())
            );
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(non-string panic)".to_string()
    }
}
