//! The smallest cooperative-cancellation unit of work inside a task.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::id::Identifier;

/// A single stage of a [`crate::task::Task`].
///
/// `run` is synchronous and must be idempotent with respect to `end`:
/// if `end` was called before `run` began, `run` may short-circuit to
/// failure instead of doing any work.
pub trait TaskStage: Send {
    fn id(&self) -> Identifier;

    fn label(&self) -> &str;

    fn run(&mut self) -> bool;

    /// Requests termination; returns whether the stage honored it.
    /// Safe to call before `run` begins.
    fn end(&mut self) -> bool;

    fn cleanup(&mut self);

    fn is_running(&self) -> bool;

    /// Deep copy producing a fresh identifier.
    fn clone_stage(&self) -> Box<dyn TaskStage>;
}

/// Compares stages by identifier (`TaskStage` equality is identifier
/// equality). Defined as a free function since trait objects cannot
/// derive `PartialEq`.
pub fn stage_eq(a: &dyn TaskStage, b: &dyn TaskStage) -> bool {
    a.id() == b.id()
}

/// A stage backed by a user-supplied closure, for composing tasks
/// without a dynamically loaded plugin. Used heavily by the test
/// suite and by code that builds tasks programmatically rather than
/// through the workflow loader.
pub struct FnStage<F> {
    id: Identifier,
    label: String,
    func: F,
    running: AtomicBool,
    ended: AtomicBool,
}

impl<F> FnStage<F>
where
    F: FnMut() -> bool + Send + Clone + 'static,
{
    pub fn new(label: impl Into<String>, func: F) -> Self {
        let id = Identifier::new();
        Self {
            label: label.into(),
            func,
            id,
            running: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        }
    }
}

impl<F> TaskStage for FnStage<F>
where
    F: FnMut() -> bool + Send + Clone + 'static,
{
    fn id(&self) -> Identifier {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn run(&mut self) -> bool {
        if self.ended.load(Ordering::Acquire) {
            return false;
        }
        self.running.store(true, Ordering::Release);
        let result = (self.func)();
        self.running.store(false, Ordering::Release);
        result
    }

    fn end(&mut self) -> bool {
        self.ended.store(true, Ordering::Release);
        true
    }

    fn cleanup(&mut self) {}

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn clone_stage(&self) -> Box<dyn TaskStage> {
        Box::new(FnStage {
            id: Identifier::new(),
            label: self.label.clone(),
            func: self.func.clone(),
            running: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        })
    }
}
