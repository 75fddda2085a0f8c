use std::{sync::Arc, thread};

use crate::{ThreadFactory, ThreadPool};

/// Workers spawned at construction when the builder is left alone,
/// clamped to the number of CPU cores on smaller machines.
pub const DEFAULT_INITIAL_WORKERS: usize = 4;

/// Upper bound on the workers one pool ever spawns, unless overridden
/// with [`ThreadPoolBuilder::capacity`].
pub const DEFAULT_CAPACITY: usize = 16;

/// A builder of the [`ThreadPool`], which can be used to configure
/// the properties of a new thread pool.
///
/// # Examples
///
/// ```
/// use taskwell::ThreadPoolBuilder;
///
/// let pool = ThreadPoolBuilder::default()
///     .initial_workers(4)
///     .capacity(8)
///     .thread_factory_fn(|| {
///         std::thread::Builder::new().name("worker".into())
///     })
///     .build();
/// ```
pub struct ThreadPoolBuilder {
    pub(crate) initial_workers: usize,
    pub(crate) capacity: usize,
    pub(crate) thread_factory: Arc<ThreadFactory>,
}

impl Default for ThreadPoolBuilder {
    /// Creates a new builder with the default configuration.
    ///
    /// # Default Configuration
    /// - `initial_workers`: 4, or the number of CPU cores if that is
    /// smaller
    /// - `capacity`: 16
    /// - `thread_factory`: `|| thread::Builder::new()`
    fn default() -> Self {
        Self {
            initial_workers: usize::min(DEFAULT_INITIAL_WORKERS, num_cpus::get()),
            capacity: DEFAULT_CAPACITY,
            thread_factory: Arc::new(thread::Builder::new),
        }
    }
}

impl ThreadPoolBuilder {
    /// Creates the base configuration for the new thread pool.
    ///
    /// See: [`ThreadPoolBuilder::default`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of workers spawned when the pool is built.
    ///
    /// Zero is allowed: the pool then spawns its first worker on the
    /// first submission.
    #[must_use]
    pub fn initial_workers(mut self, count: usize) -> Self {
        self.initial_workers = count;
        self
    }

    /// Sets the maximum allowed number of worker threads.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the factory function that is used to create a new custom
    /// thread.
    #[must_use]
    pub fn thread_factory_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> thread::Builder + Send + Sync + 'static,
    {
        self.thread_factory = Arc::new(f);
        self
    }

    /// Creates a thread pool with the arguments.
    ///
    /// # Panics
    ///
    /// Panics if the builder with invalid arguments.
    pub fn build(self) -> ThreadPool {
        self.check_arguments();
        ThreadPool::from_builder(self)
    }

    fn check_arguments(&self) {
        if self.capacity == 0 {
            panic!("capacity can not be 0.");
        }

        if self.initial_workers > self.capacity {
            panic!("initial_workers must not exceed capacity.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ThreadPoolBuilder, DEFAULT_CAPACITY, DEFAULT_INITIAL_WORKERS};

    #[test]
    fn test_default_configuration() {
        let builder = ThreadPoolBuilder::default();
        assert_eq!(DEFAULT_CAPACITY, builder.capacity);
        assert!(builder.initial_workers >= 1);
        assert!(builder.initial_workers <= DEFAULT_INITIAL_WORKERS);
    }

    #[test]
    #[should_panic]
    fn test_builder_args1() {
        ThreadPoolBuilder::default().capacity(0).build();
    }

    #[test]
    #[should_panic]
    fn test_builder_args2() {
        ThreadPoolBuilder::default()
            .capacity(2)
            .initial_workers(3)
            .build();
    }
}
