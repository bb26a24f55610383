//! The concurrent task queue, interruptible worker threads, and the
//! fixed-size scheduler pool that drives a `dagflow_core::Dag` to
//! completion.

pub mod queue;
pub mod scheduler;
pub mod worker;

pub use queue::ConcurrentTaskQueue;
pub use scheduler::{Scheduler, POOL_SIZE};
pub use worker::Worker;

impl dagflow_core::dag::algorithms::TaskSink for Scheduler {
    fn queue_task(&self, task: dagflow_core::task::Task) {
        Scheduler::queue_task(self, task);
    }
}
