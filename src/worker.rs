use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use log::trace;

use crate::task::Task;
use crate::thread_pool::PoolShared;
use crate::ThreadFactory;

/// A worker holds the handle of one pool thread.
pub(crate) struct Worker {
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawns a worker thread and registers it with the pool.
    ///
    /// Registration (the spawned and idle counters) happens on the calling
    /// thread, so a submitter that just grew the pool observes the new
    /// worker immediately.
    pub(crate) fn spawn(
        thread_factory: &ThreadFactory,
        receiver: Receiver<Task>,
        shared: Arc<PoolShared>,
    ) -> Self {
        shared.spawned_workers.fetch_add(1, Ordering::SeqCst);
        shared.idle_workers.fetch_add(1, Ordering::SeqCst);
        let handle = thread_factory()
            .spawn(move || run_tasks(&receiver, &shared))
            .expect("failed to spawn a thread.");
        Worker { handle }
    }

    /// Joins the worker thread, unless called from that same thread.
    pub(crate) fn join(self) -> thread::Result<()> {
        if self.handle.thread().id() != thread::current().id() {
            self.handle.join()?;
        }
        Ok(())
    }
}

/// The worker loop: idle while blocked in `recv`, running while a task
/// executes. `recv` disconnects only once the pool is stopped and every
/// queued task has been taken, so a waking worker always drains the
/// backlog before it terminates.
fn run_tasks(receiver: &Receiver<Task>, shared: &PoolShared) {
    while let Ok(task) = receiver.recv() {
        shared.idle_workers.fetch_sub(1, Ordering::SeqCst);
        task.run();
        shared.idle_workers.fetch_add(1, Ordering::SeqCst);
    }
    // Leaving the waiting set for good.
    shared.idle_workers.fetch_sub(1, Ordering::SeqCst);
    trace!("worker exits: the pool is stopped and the queue is drained");
}
