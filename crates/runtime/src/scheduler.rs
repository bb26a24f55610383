//! Polls the task queue and hands work to a fixed-size pool of
//! interruptible workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use dagflow_core::id::Identifier;
use dagflow_core::task::Task;

use crate::queue::ConcurrentTaskQueue;
use crate::worker::Worker;

/// Fixed at compile time rather than a runtime-configurable pool size.
pub const POOL_SIZE: usize = 10;

const REFRESH_INTERVAL: Duration = Duration::from_millis(5);

pub struct Scheduler {
    queue: ConcurrentTaskQueue,
    pause: AtomicBool,
    kill: AtomicBool,
    workers: Mutex<Vec<Worker>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let workers = (0..POOL_SIZE).map(|i| Worker::new(i.to_string())).collect();
        Self {
            queue: ConcurrentTaskQueue::new(),
            pause: AtomicBool::new(true),
            kill: AtomicBool::new(true),
            workers: Mutex::new(workers),
        }
    }

    pub fn queue_task(&self, task: Task) {
        self.queue.push(task);
    }

    pub fn kill_task(&self, task: &Task) -> bool {
        self.kill_task_by_id(task.id())
    }

    /// Removes the task from the queue if it hasn't been dispatched
    /// to a worker yet. A task already handed to a worker is not
    /// touched by this call.
    pub fn kill_task_by_id(&self, id: Identifier) -> bool {
        self.queue.remove_task_from_queue(id).is_some()
    }

    pub fn pause(&self) {
        self.pause.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Acquire)
    }

    pub fn shutdown(&self) {
        self.pause();
        self.kill.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.kill.load(Ordering::Acquire)
    }

    fn first_unused_worker(&self) -> Option<usize> {
        let workers = self.workers.lock().expect("worker pool mutex poisoned");
        workers.iter().position(|w| !w.is_running())
    }

    /// Runs the 5ms-refresh dispatch loop in the calling thread until
    /// `shutdown` is observed. Callers are expected to invoke this
    /// from a thread they spawned themselves; the scheduler owns a
    /// dedicated thread of its own rather than spawning one internally.
    pub fn startup(&self) -> bool {
        self.pause.store(false, Ordering::Release);
        self.kill.store(false, Ordering::Release);

        while !self.kill.load(Ordering::Acquire) {
            if self.pause.load(Ordering::Acquire) {
                std::thread::sleep(REFRESH_INTERVAL);
                continue;
            }

            let Some(mut next_task) = self.queue.wait_for_and_pop(REFRESH_INTERVAL) else {
                continue;
            };
            tracing::debug!(task = %next_task.id(), "next task dequeued");

            loop {
                if self.kill.load(Ordering::Acquire) {
                    next_task.kill();
                    break;
                }
                if self.pause.load(Ordering::Acquire) {
                    std::thread::yield_now();
                    continue;
                }
                let Some(index) = self.first_unused_worker() else {
                    std::thread::yield_now();
                    continue;
                };
                if self.kill.load(Ordering::Acquire) {
                    next_task.kill();
                    break;
                }
                let mut workers = self.workers.lock().expect("worker pool mutex poisoned");
                tracing::debug!(task = %next_task.id(), worker = index, "dispatching task");
                workers[index].set_task_and_run(next_task);
                break;
            }
        }

        true
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagflow_core::stage::FnStage;
    use dagflow_core::stage::TaskStage;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_task(counter: Arc<AtomicUsize>) -> Task {
        let stage: Box<dyn TaskStage> = Box::new(FnStage::new("count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        }));
        Task::new(vec![stage])
    }

    #[test]
    fn queued_tasks_are_dispatched_and_run() {
        let scheduler = Arc::new(Scheduler::new());
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            scheduler.queue_task(counting_task(Arc::clone(&counter)));
        }

        let runner = Arc::clone(&scheduler);
        let handle = std::thread::spawn(move || runner.startup());

        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) == 5 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 5);

        scheduler.shutdown();
        handle.join().unwrap();
    }

    #[test]
    fn kill_task_by_id_removes_only_queued_work() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counting_task(Arc::clone(&counter));
        let id = task.id();
        scheduler.queue_task(task);
        assert!(scheduler.kill_task_by_id(id));
        assert!(!scheduler.kill_task_by_id(id));
    }

    #[test]
    fn pause_prevents_dispatch_until_resume() {
        let scheduler = Arc::new(Scheduler::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let runner = Arc::clone(&scheduler);
        let handle = std::thread::spawn(move || runner.startup());
        std::thread::sleep(Duration::from_millis(20));

        scheduler.pause();
        scheduler.queue_task(counting_task(Arc::clone(&counter)));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 0, "task must not run while paused");

        scheduler.resume();
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        scheduler.shutdown();
        handle.join().unwrap();
    }
}
