//! End-to-end queue/task scheduling scenarios.

use dagflow_core::stage::{FnStage, TaskStage};
use dagflow_core::task::Task;
use dagflow_runtime::ConcurrentTaskQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn labeled_task(label: &str) -> Task {
    let stage: Box<dyn TaskStage> = Box::new(FnStage::new("s", || true));
    Task::new(vec![stage]).with_label(label)
}

#[test]
fn fifo_across_threads_a_pusher_and_a_popper() {
    let queue = Arc::new(ConcurrentTaskQueue::new());
    let pusher_queue = Arc::clone(&queue);
    let barrier = Arc::new(Barrier::new(2));
    let pusher_barrier = Arc::clone(&barrier);

    let pusher = thread::spawn(move || {
        pusher_barrier.wait();
        for i in 0..10 {
            pusher_queue.push(labeled_task(&i.to_string()));
        }
    });

    barrier.wait();
    pusher.join().unwrap();

    // By the time the pusher has joined, all ten pushes landed in
    // order; the first pop must be "0".
    assert_eq!(queue.try_pop().unwrap().label(), "0");
}

#[test]
fn a_failing_middle_stage_halts_iteration_before_the_next_stage_runs() {
    let a_ran = Arc::new(AtomicBool::new(false));
    let b_ran = Arc::new(AtomicBool::new(false));
    let c_ran = Arc::new(AtomicBool::new(false));

    let (a_flag, b_flag, c_flag) = (Arc::clone(&a_ran), Arc::clone(&b_ran), Arc::clone(&c_ran));
    let stages: Vec<Box<dyn TaskStage>> = vec![
        Box::new(FnStage::new("A", move || {
            a_flag.store(true, Ordering::SeqCst);
            true
        })),
        Box::new(FnStage::new("B", move || {
            b_flag.store(true, Ordering::SeqCst);
            false
        })),
        Box::new(FnStage::new("C", move || {
            c_flag.store(true, Ordering::SeqCst);
            true
        })),
    ];

    let mut task = Task::new(stages);
    let all_ran = task.iterate_stages(|stage| stage.run());

    assert!(!all_ran);
    assert!(a_ran.load(Ordering::SeqCst));
    assert!(b_ran.load(Ordering::SeqCst));
    assert!(!c_ran.load(Ordering::SeqCst), "C must never run once B fails");
}
