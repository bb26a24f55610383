//! A single OS thread that runs at most one task at a time and can be
//! asked to stop between stage boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use dagflow_core::task::Task;

pub struct Worker {
    tag: String,
    task: Arc<Mutex<Option<Task>>>,
    interrupt: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            task: Arc::new(Mutex::new(None)),
            interrupt: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Acquire)
    }

    pub fn has_task(&self) -> bool {
        self.task.lock().expect("task mutex poisoned").is_some()
    }

    /// Stores `task` and spawns a thread to run it to completion (or
    /// until interrupted). Returns whether the thread was actually
    /// started; false if this worker is already running a task.
    pub fn set_task_and_run(&mut self, task: Task) -> bool {
        if self.is_running() {
            tracing::warn!(tag = %self.tag, "refusing to start a task on a busy worker");
            return false;
        }

        {
            let mut slot = self.task.lock().expect("task mutex poisoned");
            *slot = Some(task);
        }

        self.interrupt.store(false, Ordering::Release);

        let task_slot = Arc::clone(&self.task);
        let interrupt = Arc::clone(&self.interrupt);
        let running = Arc::clone(&self.running);
        let tag = self.tag.clone();

        let (start_tx, start_rx) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name(tag.clone())
            .spawn(move || {
                let _span = tracing::info_span!("worker", tag = %tag).entered();
                running.store(true, Ordering::Release);
                start_tx.send(()).expect("start barrier receiver dropped");

                let mut task = task_slot.lock().expect("task mutex poisoned").take().expect(
                    "task slot populated by set_task_and_run before the thread was spawned",
                );

                let all_ran = task.iterate_stages(|stage| {
                    stage.run() && !interrupt.load(Ordering::Acquire)
                });

                task.complete(all_ran);
                running.store(false, Ordering::Release);
            })
            .expect("failed to spawn worker thread");

        start_rx
            .recv()
            .expect("worker thread dropped the start signal before sending it");

        self.handle = Some(handle);
        true
    }

    /// Requests interruption. If a task is currently held, its kill
    /// flag is set too so the next stage boundary observes it even if
    /// the worker's own loop hasn't reached the check yet.
    pub fn set_interrupt(&self, value: bool) {
        if let Some(task) = self.task.lock().expect("task mutex poisoned").as_ref() {
            if value {
                task.kill();
            }
        }
        self.interrupt.store(value, Ordering::Release);
    }

    pub fn shutdown(&mut self) {
        if self.is_running() {
            self.set_interrupt(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagflow_core::stage::FnStage;
    use dagflow_core::stage::TaskStage;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn spin_stage(ticks: Arc<AtomicUsize>) -> Box<dyn TaskStage> {
        Box::new(FnStage::new("spin", move || {
            ticks.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            true
        }))
    }

    #[test]
    fn runs_a_task_to_completion_and_reports_not_running_afterward() {
        let completed = Arc::new(AtomicBool::new(false));
        let completed_flag = Arc::clone(&completed);
        let task = Task::new(vec![Box::new(FnStage::new("s", || true))])
            .with_callback(dagflow_core::task::Callback::Function(Arc::new(move |status| {
                completed_flag.store(status, Ordering::SeqCst);
            })));

        let mut worker = Worker::new("test-worker");
        assert!(worker.set_task_and_run(task));

        for _ in 0..200 {
            if !worker.is_running() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(!worker.is_running());
        assert!(completed.load(Ordering::SeqCst));
    }

    #[test]
    fn interrupt_stops_a_long_running_task_between_stages() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let stages: Vec<Box<dyn TaskStage>> = (0..20).map(|_| spin_stage(Arc::clone(&ticks))).collect();
        let task = Task::new(stages);

        let mut worker = Worker::new("interrupt-worker");
        worker.set_task_and_run(task);
        std::thread::sleep(Duration::from_millis(30));
        worker.set_interrupt(true);

        for _ in 0..200 {
            if !worker.is_running() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(!worker.is_running());
        assert!(ticks.load(Ordering::SeqCst) < 20);
    }

    #[test]
    fn refuses_a_second_task_while_busy() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let stages: Vec<Box<dyn TaskStage>> = (0..5).map(|_| spin_stage(Arc::clone(&ticks))).collect();
        let task = Task::new(stages);

        let mut worker = Worker::new("busy-worker");
        assert!(worker.set_task_and_run(task));
        assert!(!worker.set_task_and_run(Task::new(vec![])));
        worker.shutdown();
    }
}
