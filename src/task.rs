use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::{bounded, Sender};

use log::error;

use crate::handle::Handle;

pub(crate) type TaskFn = Box<dyn FnOnce() + Send + 'static>;

/// A type-erased, zero-argument unit of work.
///
/// The caller's closure, its captured arguments and the producing side of
/// a result channel are bound together here at submission time. A task is
/// consumed by the single worker that runs it.
pub struct Task {
    task_fn: TaskFn,
}

impl Task {
    /// Binds a closure to a fresh one-shot result channel.
    ///
    /// The returned task runs the closure, captures any panic it raises
    /// and delivers the outcome through the channel; the returned handle
    /// is the reading side.
    pub(crate) fn bind<F, R>(f: F) -> (Self, Handle<R>)
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let task = Self {
            task_fn: Box::new(move || deliver(f, &tx)),
        };
        (task, Handle::new(rx))
    }

    /// Runs the task body.
    ///
    /// Never unwinds: the body captures panics and forwards them through
    /// the result channel, so a failing task cannot take its worker down.
    pub(crate) fn run(self) {
        (self.task_fn)();
    }
}

fn deliver<F, R>(f: F, tx: &Sender<thread::Result<R>>)
where
    F: FnOnce() -> R,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    let failed = outcome.is_err();
    if tx.send(outcome).is_err() && failed {
        // The handle is gone, so nobody will ever observe this failure.
        error!("a task panicked after its handle was dropped");
    }
}
