//! # Taskwell
//!
//! A worker thread pool for heterogeneous tasks. Submitting a closure
//! returns a typed [`Handle`] through which the closure's eventual result
//! (or a panic it raised) is retrieved, so a caller never waits on
//! execution at submission time.
//!
//! The pool starts with a small set of worker threads and lazily spawns
//! more, one at a time, whenever a task arrives while no worker is idle,
//! up to a fixed capacity. Workers are never retired while the pool is
//! alive; dropping the pool stops intake, drains every queued task and
//! joins all worker threads.
//!
//! # Build a thread pool
//!
//! You can use the [`ThreadPoolBuilder`] to build a thread pool with a
//! custom configuration, or [`ThreadPool::with_workers`] to only pick the
//! initial worker count.
//!
//! # Examples
//!
//! ```
//! use taskwell::ThreadPoolBuilder;
//!
//! let pool = ThreadPoolBuilder::default()
//!     .initial_workers(2)
//!     .capacity(8)
//!     .build();
//!
//! let handle = pool.submit(|| 2 + 3).unwrap();
//! assert_eq!(5, handle.get());
//!
//! // Close the thread pool and wait for all worker threads to end.
//! pool.wait().unwrap();
//! ```

mod builder;
mod handle;
mod thread_pool;

pub(crate) mod task;
pub(crate) mod worker;

pub use builder::*;
pub use handle::Handle;
pub use thread_pool::*;
