//! A task is an ordered sequence of stages executed by a worker, plus
//! an optional completion callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::document::Document;
use crate::id::Identifier;
use crate::stage::TaskStage;

/// Invoked once, with the pass/fail status, when a task terminates.
///
/// A plain function callback or a cloneable plugin object — at most
/// one of these may be attached to a task, enforced at the type level
/// by this being a single enum rather than two optional fields.
pub enum Callback {
    Function(Arc<dyn Fn(bool) + Send + Sync>),
    Plugin(Box<dyn TaskCallbackPlugin>),
}

impl Callback {
    fn invoke(&self, status: bool, task: &Task) {
        match self {
            Callback::Function(f) => f(status),
            Callback::Plugin(p) => p.completed(status, task),
        }
    }

    fn clone_callback(&self) -> Callback {
        match self {
            Callback::Function(f) => Callback::Function(Arc::clone(f)),
            Callback::Plugin(p) => Callback::Plugin(p.clone_plugin()),
        }
    }
}

/// A completion hook implemented as a dynamically loaded plugin
/// object (see `dagflow-registry`'s `TaskCb` section).
pub trait TaskCallbackPlugin: Send {
    fn completed(&self, status: bool, task: &Task);
    fn clone_plugin(&self) -> Box<dyn TaskCallbackPlugin>;
}

pub struct Task {
    id: Identifier,
    label: String,
    stages: Vec<Box<dyn TaskStage>>,
    callback: Option<Callback>,
    config: Document,
    initial_inputs: Document,
    iterating: Arc<AtomicBool>,
    kill: Arc<AtomicBool>,
}

impl Task {
    pub fn new(stages: Vec<Box<dyn TaskStage>>) -> Self {
        let id = Identifier::new();
        Self {
            label: id.to_string(),
            id,
            stages,
            callback: None,
            config: Document::empty(),
            initial_inputs: Document::empty(),
            iterating: Arc::new(AtomicBool::new(false)),
            kill: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_config(mut self, config: Document) -> Self {
        self.config = config;
        self
    }

    pub fn with_initial_inputs(mut self, initial_inputs: Document) -> Self {
        self.initial_inputs = initial_inputs;
        self
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &Document {
        &self.config
    }

    pub fn initial_inputs(&self) -> &Document {
        &self.initial_inputs
    }

    pub fn set_initial_inputs(&mut self, initial_inputs: Document) {
        self.initial_inputs = initial_inputs;
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn is_iterating(&self) -> bool {
        self.iterating.load(Ordering::Acquire)
    }

    pub fn was_killed(&self) -> bool {
        self.kill.load(Ordering::Acquire)
    }

    /// Sets the kill flag. Returns the new value.
    pub fn kill(&self) -> bool {
        self.kill.store(true, Ordering::Release);
        true
    }

    /// Iterates the stages in order, invoking `step` for each one,
    /// then `cleanup`, then `end`. Continues only while `step`
    /// returned true, `end` reported success, and `kill` is still
    /// false. Returns true iff every stage ran to completion.
    ///
    /// Re-entrant calls (while another `iterate_stages` is already in
    /// flight on this task) return false immediately without touching
    /// any stage.
    pub fn iterate_stages(
        &mut self,
        mut step: impl FnMut(&mut dyn TaskStage) -> bool,
    ) -> bool {
        if self
            .iterating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(task = %self.id, "iterate_stages called while already iterating");
            return false;
        }

        let mut all_ran = true;
        for stage in &mut self.stages {
            let step_ok = step(stage.as_mut());
            stage.cleanup();
            let end_ok = stage.end();
            let cont = step_ok && end_ok && !self.kill.load(Ordering::Acquire);
            if cont {
                tracing::debug!(task = %self.id, stage = %stage.label(), "stage completed");
            } else {
                tracing::debug!(task = %self.id, stage = %stage.label(), "stage halted iteration");
                all_ran = false;
                self.iterating.store(false, Ordering::Release);
                return false;
            }
        }

        self.iterating.store(false, Ordering::Release);
        all_ran
    }

    /// Invokes the configured completion callback, if any. A task
    /// with no callback logs and does nothing else.
    pub fn complete(&self, status: bool) {
        match &self.callback {
            Some(callback) => callback.invoke(status, self),
            None => tracing::debug!(task = %self.id, status, "task completed with no callback set"),
        }
    }

    /// Deep-copies stages, documents, and callback; preserves the
    /// identifier.
    pub fn clone_task(&self) -> Task {
        Task {
            id: self.id,
            label: self.label.clone(),
            stages: self.stages.iter().map(|s| s.clone_stage()).collect(),
            callback: self.callback.as_ref().map(Callback::clone_callback),
            config: self.config.clone(),
            initial_inputs: self.initial_inputs.clone(),
            iterating: Arc::new(AtomicBool::new(false)),
            kill: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Task(id={}, label={}, stages={})",
            self.id,
            self.label,
            self.stages.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::FnStage;
    use std::sync::atomic::AtomicUsize;

    fn ok_stage(label: &str) -> Box<dyn TaskStage> {
        Box::new(FnStage::new(label, || true))
    }

    fn fail_stage(label: &str) -> Box<dyn TaskStage> {
        Box::new(FnStage::new(label, || false))
    }

    #[test]
    fn full_success_runs_every_stage_once_and_completes_true() {
        let run_count = Arc::new(AtomicUsize::new(0));
        let stages: Vec<Box<dyn TaskStage>> = (0..3)
            .map(|i| {
                let counter = Arc::clone(&run_count);
                let stage: Box<dyn TaskStage> = Box::new(FnStage::new(
                    format!("stage-{i}"),
                    move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        true
                    },
                ));
                stage
            })
            .collect();
        let mut task = Task::new(stages);

        let completed = Arc::new(AtomicBool::new(false));
        let completed_status = Arc::clone(&completed);
        task = task.with_callback(Callback::Function(Arc::new(move |status| {
            completed_status.store(status, Ordering::SeqCst);
        })));

        let ok = task.iterate_stages(|stage| stage.run());
        assert!(ok);
        assert_eq!(run_count.load(Ordering::SeqCst), 3);

        task.complete(ok);
        assert!(completed.load(Ordering::SeqCst));
    }

    #[test]
    fn failure_at_stage_b_stops_before_c() {
        let c_ran = Arc::new(AtomicBool::new(false));
        let c_flag = Arc::clone(&c_ran);
        let stages: Vec<Box<dyn TaskStage>> = vec![
            ok_stage("A"),
            fail_stage("B"),
            Box::new(FnStage::new("C", move || {
                c_flag.store(true, Ordering::SeqCst);
                true
            })),
        ];
        let mut task = Task::new(stages);
        let ok = task.iterate_stages(|stage| stage.run());
        assert!(!ok);
        assert!(!c_ran.load(Ordering::SeqCst));
    }

    #[test]
    fn kill_before_next_stage_halts_iteration() {
        let mut task = Task::new(vec![ok_stage("a"), ok_stage("b"), ok_stage("c")]);
        task.kill();
        let ok = task.iterate_stages(|stage| stage.run());
        assert!(!ok);
    }

    #[test]
    fn reentrant_iterate_stages_returns_false() {
        let mut task = Task::new(vec![ok_stage("a")]);
        task.iterating.store(true, Ordering::SeqCst);
        assert!(!task.iterate_stages(|stage| stage.run()));
    }

    #[test]
    fn clone_preserves_identifier_and_deep_copies() {
        let task = Task::new(vec![ok_stage("a")]).with_label("original");
        let clone = task.clone_task();
        assert_eq!(task.id(), clone.id());
        assert_eq!(clone.label(), "original");
        assert_eq!(clone.stage_count(), 1);
    }

    #[test]
    fn no_callback_complete_is_a_noop() {
        let task = Task::new(vec![]);
        task.complete(true); // must not panic
    }
}
