use std::panic;
use std::thread;

use crossbeam_channel::Receiver;

/// The caller-side view of one submitted task's outcome.
///
/// A handle is bound to exactly one task and yields its outcome exactly
/// once: both [`get`] and [`join`] consume the handle, so a second read is
/// rejected at compile time. A captured panic payload can only be raised
/// once, which makes consumed-once the honest contract here.
///
/// [`get`]: Handle::get
/// [`join`]: Handle::join
pub struct Handle<R> {
    receiver: Receiver<thread::Result<R>>,
}

impl<R> Handle<R> {
    pub(crate) fn new(receiver: Receiver<thread::Result<R>>) -> Self {
        Self { receiver }
    }

    /// Blocks until the task has executed, then returns its value.
    ///
    /// # Panics
    ///
    /// If the task body panicked, the captured payload is re-raised in the
    /// calling thread via [`std::panic::resume_unwind`]. Use [`join`] to
    /// inspect a failure as a value instead.
    ///
    /// [`join`]: Handle::join
    ///
    /// # Examples
    ///
    /// ```
    /// use taskwell::ThreadPool;
    ///
    /// let pool = ThreadPool::with_workers(2);
    /// let handle = pool.submit(|| "hello".to_uppercase()).unwrap();
    /// assert_eq!("HELLO", handle.get());
    /// ```
    pub fn get(self) -> R {
        match self.join() {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Blocks until the task has executed, then returns its value or the
    /// payload of the panic that ended it, without re-raising.
    pub fn join(self) -> thread::Result<R> {
        self.receiver
            .recv()
            .expect("task was dropped before producing an outcome")
    }

    /// Returns `true` if the outcome has already been delivered, without
    /// blocking or consuming it.
    pub fn is_ready(&self) -> bool {
        !self.receiver.is_empty()
    }
}
