use crate::{handle::Handle, task::Task, worker::Worker, ThreadPoolBuilder};

use crossbeam_channel::{unbounded, Receiver, Sender};

use log::{debug, trace};

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
};

/// A function that used to create a custom thread.
pub type ThreadFactory = dyn Fn() -> thread::Builder + Send + Sync + 'static;

/// An error returned from [`ThreadPool::submit`].
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// The task was not accepted because shutdown of the pool has begun.
    /// The pool never accepts work again once this is returned.
    PoolStopped,
}

impl std::error::Error for SubmitError {}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            SubmitError::PoolStopped => write!(f, "the thread pool is stopped."),
        }
    }
}

/// State shared between the pool and its worker threads.
pub(crate) struct PoolShared {
    /// Intake gate. `Some` while the pool accepts work; taken once at
    /// shutdown, which also disconnects the task channel after the
    /// backlog drains.
    pub(crate) sender: Mutex<Option<Sender<Task>>>,
    /// Workers currently blocked waiting for a task. Always within
    /// `[0, spawned_workers]`.
    pub(crate) idle_workers: AtomicUsize,
    /// Workers ever spawned. Monotonic, bounded by the pool capacity.
    pub(crate) spawned_workers: AtomicUsize,
}

/// A pool of worker threads sharing one task queue.
///
/// Tasks are submitted with [`submit`], which hands back a typed
/// [`Handle`] to the eventual outcome. The queue is unbounded and
/// submission never blocks on execution.
///
/// # Growth
///
/// The pool spawns `initial_workers` threads up front and grows by one
/// worker whenever a task is accepted while no worker is idle, until
/// `capacity` workers exist. The idle check is deliberately not atomic
/// with the spawn decision: two concurrent submitters may both grow the
/// pool, or both leave their tasks queued for the next worker to go
/// idle. Every queued task is still served either way; the race only
/// moves latency around. The pool never shrinks.
///
/// # Shutdown
///
/// [`shutdown`] stops intake; workers keep draining the queue and then
/// terminate. [`wait`] additionally joins every worker thread, and
/// dropping the pool does the same, so tasks accepted before shutdown
/// began are always run to completion.
///
/// [`submit`]: ThreadPool::submit
/// [`shutdown`]: ThreadPool::shutdown
/// [`wait`]: ThreadPool::wait
pub struct ThreadPool {
    pub(crate) receiver: Receiver<Task>,
    pub(crate) shared: Arc<PoolShared>,
    pub(crate) workers: Mutex<Option<Vec<Worker>>>,

    pub(crate) capacity: usize,
    pub(crate) thread_factory: Arc<ThreadFactory>,
}

impl ThreadPool {
    /// Builds a thread pool from a configuration(builder).
    ///
    /// This assumes arguments of the builder are valid.
    pub(crate) fn from_builder(builder: ThreadPoolBuilder) -> Self {
        let (sender, receiver) = unbounded();
        let pool = Self {
            receiver,
            shared: Arc::new(PoolShared {
                sender: Mutex::new(Some(sender)),
                idle_workers: AtomicUsize::new(0),
                spawned_workers: AtomicUsize::new(0),
            }),
            workers: Mutex::new(Some(Vec::default())),
            capacity: builder.capacity,
            thread_factory: builder.thread_factory,
        };
        pool.add_workers(builder.initial_workers);
        debug!(
            "thread pool started: {} initial workers, capacity {}",
            pool.worker_count(),
            pool.capacity
        );
        pool
    }

    /// Creates a thread pool with the default configuration.
    ///
    /// See: [`ThreadPoolBuilder::default`]
    #[must_use]
    pub fn new() -> Self {
        ThreadPoolBuilder::default().build()
    }

    /// Creates a thread pool that starts with `initial` workers.
    ///
    /// A count above the default capacity is clamped to it, so asking
    /// for more workers than the pool may ever hold is not an error.
    #[must_use]
    pub fn with_workers(initial: usize) -> Self {
        let builder = ThreadPoolBuilder::default();
        let initial = usize::min(initial, builder.capacity);
        builder.initial_workers(initial).build()
    }

    /// Submits a closure for execution and returns a [`Handle`] to its
    /// eventual outcome.
    ///
    /// The closure is queued immediately; this never waits for a worker
    /// to pick it up. If no worker is idle and the pool is below
    /// capacity, one additional worker is spawned before returning.
    ///
    /// # Errors
    ///
    /// [`PoolStopped`]: shutdown of the pool has begun; nothing was
    /// queued and no thread was spawned.
    ///
    /// [`PoolStopped`]: SubmitError::PoolStopped
    ///
    /// # Examples
    ///
    /// ```
    /// use taskwell::ThreadPool;
    ///
    /// let pool = ThreadPool::with_workers(2);
    ///
    /// let handle = pool.submit(|| 21 * 2).unwrap();
    /// assert_eq!(42, handle.get());
    /// ```
    pub fn submit<F, R>(&self, f: F) -> Result<Handle<R>, SubmitError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (task, handle) = Task::bind(f);
        {
            let sender = self.shared.sender.lock().unwrap();
            match sender.as_ref() {
                Some(sender) => sender.send(task).map_err(|_| SubmitError::PoolStopped)?,
                None => return Err(SubmitError::PoolStopped),
            }
        }
        self.grow_if_starved();
        Ok(handle)
    }

    /// The number of workers currently waiting for a task.
    ///
    /// Advisory: the value may be stale by the time it is read.
    #[must_use]
    pub fn idle_worker_count(&self) -> usize {
        self.shared.idle_workers.load(Ordering::SeqCst)
    }

    /// The number of worker threads ever spawned by this pool.
    ///
    /// Non-decreasing over the pool's lifetime and never above its
    /// capacity. Advisory, like [`idle_worker_count`].
    ///
    /// [`idle_worker_count`]: ThreadPool::idle_worker_count
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.shared.spawned_workers.load(Ordering::SeqCst)
    }

    /// Returns `true` if shutdown of the pool has begun.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.sender.lock().unwrap().is_none()
    }

    /// Stops intake of new tasks.
    ///
    /// A stopped thread pool will not accept any tasks, but its workers
    /// still process every task already in the queue.
    ///
    /// # Examples
    ///
    /// ```
    /// use taskwell::ThreadPool;
    ///
    /// let pool = ThreadPool::with_workers(2);
    /// pool.shutdown();
    ///
    /// assert!(pool.submit(|| println!("Hello")).is_err());
    /// ```
    pub fn shutdown(&self) {
        if self.shared.sender.lock().unwrap().take().is_some() {
            debug!("thread pool shutdown: intake stopped, draining the queue");
        }
    }

    /// Stops the pool and waits for all worker threads to finish.
    ///
    /// Workers drain the queue before terminating, so every task
    /// accepted before this call has run to completion by the time it
    /// returns. Dropping the pool performs the same sequence.
    ///
    /// If this is called in a worker thread, then the worker thread
    /// will not be joined.
    ///
    /// # Errors
    ///
    /// An error is returned if a worker thread panics.
    ///
    /// # Examples
    ///
    /// ```
    /// use taskwell::ThreadPool;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let pool = ThreadPool::with_workers(4);
    ///
    /// let sum = Arc::new(AtomicUsize::new(0));
    /// for _ in 0..10 {
    ///     let sum = sum.clone();
    ///     pool.submit(move || {
    ///         sum.fetch_add(1, Ordering::SeqCst);
    ///     })
    ///     .unwrap();
    /// }
    ///
    /// // Block the current thread until all worker threads are finished.
    /// pool.wait().unwrap();
    /// assert_eq!(10, sum.load(Ordering::Relaxed));
    /// ```
    pub fn wait(&self) -> thread::Result<()> {
        self.shutdown();
        Self::join_workers(self.workers.lock().unwrap().take())
    }

    fn join_workers(workers: Option<Vec<Worker>>) -> thread::Result<()> {
        if let Some(workers) = workers {
            for worker in workers {
                worker.join()?;
            }
        }
        Ok(())
    }

    /// Lazy growth, run after each accepted task: spawn one worker if
    /// nobody is idle and the pool is below capacity.
    fn grow_if_starved(&self) {
        if self.shared.idle_workers.load(Ordering::SeqCst) < 1
            && self.shared.spawned_workers.load(Ordering::SeqCst) < self.capacity
        {
            trace!(
                "no idle worker, growing the pool ({} spawned)",
                self.worker_count()
            );
            self.add_workers(1);
        }
    }

    /// Spawns up to `count` workers, stopping at the pool capacity.
    fn add_workers(&self, count: usize) {
        let mut workers = self.workers.lock().unwrap();
        if let Some(workers) = workers.as_mut() {
            for _ in 0..count {
                if self.shared.spawned_workers.load(Ordering::SeqCst) >= self.capacity {
                    break;
                }
                workers.push(Worker::spawn(
                    &*self.thread_factory,
                    self.receiver.clone(),
                    self.shared.clone(),
                ));
            }
        }
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadPool {
    /// Tears the pool down: stop intake, let workers drain the queue,
    /// join them all.
    fn drop(&mut self) {
        let _ = self.wait();
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        SubmitError, ThreadPool, ThreadPoolBuilder, DEFAULT_CAPACITY, DEFAULT_INITIAL_WORKERS,
    };
    use std::{
        panic,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn small_pool(initial: usize, capacity: usize) -> ThreadPool {
        ThreadPoolBuilder::default()
            .initial_workers(initial)
            .capacity(capacity)
            .build()
    }

    #[test]
    fn test_new_pool_uses_defaults() {
        let pool = ThreadPool::new();
        assert!(!pool.is_stopped());
        assert!(pool.worker_count() >= 1);
        assert!(pool.worker_count() <= DEFAULT_INITIAL_WORKERS);
        pool.wait().unwrap();
    }

    #[test]
    fn test_submit_returns_value() {
        fn add(a: i32, b: i32) -> i32 {
            a + b
        }

        let pool = small_pool(2, 4);
        let handle = pool.submit(|| add(2, 3)).unwrap();
        assert_eq!(5, handle.get());
    }

    #[test]
    fn test_heterogeneous_result_types() {
        let pool = small_pool(2, 4);

        let unit = pool.submit(|| ()).unwrap();
        let answer = pool.submit(|| 42).unwrap();
        let n = 42;
        let greeting = pool.submit(move || format!("hello, {}", n)).unwrap();

        unit.get();
        assert_eq!(42, answer.get());
        assert_eq!("hello, 42", greeting.get());
    }

    #[test]
    fn test_grows_under_load_up_to_capacity() {
        init_logger();
        let pool = small_pool(4, 16);
        assert_eq!(4, pool.worker_count());

        let mut handles = Vec::new();
        for _ in 0..50 {
            handles.push(
                pool.submit(|| thread::sleep(Duration::from_millis(10)))
                    .unwrap(),
            );
            assert!(pool.worker_count() <= 16);
            assert!(pool.idle_worker_count() <= pool.worker_count());
        }

        for handle in handles {
            handle.get();
        }

        assert!(pool.worker_count() >= 4);
        assert!(pool.worker_count() <= 16);

        pool.wait().unwrap();
        assert_eq!(0, pool.idle_worker_count());
    }

    #[test]
    fn test_grows_from_zero_workers() {
        let pool = small_pool(0, 2);
        assert_eq!(0, pool.worker_count());

        let handle = pool.submit(|| 21 * 2).unwrap();
        assert_eq!(42, handle.get());
        assert_eq!(1, pool.worker_count());
    }

    #[test]
    fn test_submit_from_multiple_threads() {
        let pool = Arc::new(small_pool(4, 8));
        let sum = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..10 {
            let pool = pool.clone();
            let sum = sum.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    let sum = sum.clone();
                    pool.submit(move || {
                        sum.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        pool.wait().unwrap();
        assert_eq!(100, sum.load(Ordering::Relaxed));
        assert!(pool.worker_count() <= 8);
    }

    #[test]
    fn test_panicking_task_does_not_kill_its_worker() {
        let pool = small_pool(1, 1);

        let failing = pool.submit(|| panic!("boom")).unwrap();
        let payload = failing.join().unwrap_err();
        assert_eq!(Some(&"boom"), payload.downcast_ref::<&str>());

        // The single worker survived and still serves tasks.
        let ok = pool.submit(|| 7).unwrap();
        assert_eq!(7, ok.get());
        assert_eq!(1, pool.worker_count());
    }

    #[test]
    fn test_get_reraises_the_panic() {
        let pool = small_pool(1, 2);
        let handle = pool.submit(|| -> i32 { panic!("task failure") }).unwrap();

        let reraised = panic::catch_unwind(panic::AssertUnwindSafe(|| handle.get()));
        let payload = reraised.unwrap_err();
        assert_eq!(Some(&"task failure"), payload.downcast_ref::<&str>());
    }

    #[test]
    fn test_wait_drains_queued_tasks() {
        init_logger();
        let pool = small_pool(1, 1);
        let ran = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let ran = ran.clone();
            handles.push(
                pool.submit(move || {
                    thread::sleep(Duration::from_millis(10));
                    ran.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap(),
            );
        }

        pool.wait().unwrap();

        // Every task accepted before shutdown ran to completion.
        assert_eq!(5, ran.load(Ordering::SeqCst));
        for handle in handles {
            assert!(handle.is_ready());
            handle.get();
        }
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let pool = small_pool(2, 4);
        pool.shutdown();

        assert!(pool.is_stopped());
        let before = pool.worker_count();
        assert!(matches!(
            pool.submit(|| ()),
            Err(SubmitError::PoolStopped)
        ));
        assert_eq!(before, pool.worker_count());

        pool.wait().unwrap();
    }

    #[test]
    fn test_shutdown_from_multiple_threads() {
        let pool = Arc::new(small_pool(2, 4));
        let mut racers = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            racers.push(thread::spawn(move || {
                if pool.is_stopped() {
                    assert!(pool.submit(|| ()).is_err());
                }
                pool.shutdown();
                assert!(pool.submit(|| ()).is_err());
            }));
        }

        for racer in racers {
            racer.join().unwrap();
        }
        pool.wait().unwrap();
    }

    #[test]
    fn test_handle_readiness() {
        let pool = small_pool(1, 1);

        let slow = pool
            .submit(|| thread::sleep(Duration::from_millis(50)))
            .unwrap();
        let queued = pool.submit(|| 1).unwrap();
        assert!(!queued.is_ready());

        pool.wait().unwrap();
        assert!(queued.is_ready());
        assert_eq!(1, queued.get());
        slow.get();
    }

    #[test]
    fn test_with_workers_clamps_to_capacity() {
        let pool = ThreadPool::with_workers(50);
        assert_eq!(DEFAULT_CAPACITY, pool.worker_count());
        pool.wait().unwrap();
    }

    #[test]
    fn test_thread_factory_names_workers() {
        let pool = ThreadPoolBuilder::default()
            .thread_factory_fn(|| thread::Builder::new().name("pool-worker".into()))
            .initial_workers(2)
            .capacity(4)
            .build();

        let name = pool
            .submit(|| thread::current().name().map(String::from))
            .unwrap();
        assert_eq!(Some(String::from("pool-worker")), name.get());
    }
}
