//! Pluggable schedulers for graph materialization.
//!
//! The scheduler decides how the independent chunk tasks of a graph
//! evaluation run. The default executes them on the rayon thread pool;
//! tests install a [`CountingScheduler`] to assert that graph building
//! never triggers evaluation.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use rayon::prelude::*;

/// Executes the independent chunk tasks of a graph evaluation.
pub trait Scheduler: Send + Sync {
    /// Hook invoked once per materialization request, before any task
    /// runs. Instrumenting schedulers hook this; the default is a no-op.
    fn on_materialize(&self) {}

    /// Run `tasks` independent chunk tasks. Every index in `0..tasks`
    /// must be executed exactly once before this returns.
    fn run(&self, tasks: usize, task: &(dyn Fn(usize) + Send + Sync));
}

/// Default scheduler: chunk tasks run in parallel on the rayon pool.
#[derive(Debug, Default)]
pub struct RayonScheduler;

impl Scheduler for RayonScheduler {
    fn run(&self, tasks: usize, task: &(dyn Fn(usize) + Send + Sync)) {
        (0..tasks).into_par_iter().for_each(task);
    }
}

/// Runs chunk tasks sequentially on the calling thread.
#[derive(Debug, Default)]
pub struct SerialScheduler;

impl Scheduler for SerialScheduler {
    fn run(&self, tasks: usize, task: &(dyn Fn(usize) + Send + Sync)) {
        for i in 0..tasks {
            task(i);
        }
    }
}

/// Wraps another scheduler and panics if more materializations are
/// requested than allowed.
///
/// With a limit of 0, any evaluation inside the scope fails the test,
/// which is how laziness guarantees are asserted.
pub struct CountingScheduler {
    inner: Arc<dyn Scheduler>,
    max_materializations: usize,
    seen: AtomicUsize,
}

impl CountingScheduler {
    /// Counting wrapper over a [`SerialScheduler`].
    pub fn new(max_materializations: usize) -> Self {
        Self::with_inner(max_materializations, Arc::new(SerialScheduler))
    }

    /// Counting wrapper over an arbitrary scheduler.
    pub fn with_inner(max_materializations: usize, inner: Arc<dyn Scheduler>) -> Self {
        Self {
            inner,
            max_materializations,
            seen: AtomicUsize::new(0),
        }
    }

    /// Number of materializations seen so far.
    pub fn materializations(&self) -> usize {
        self.seen.load(Ordering::Relaxed)
    }
}

impl Scheduler for CountingScheduler {
    fn on_materialize(&self) {
        let seen = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen > self.max_materializations {
            panic!(
                "too many materializations scheduled: {} (allowed {})",
                seen, self.max_materializations
            );
        }
    }

    fn run(&self, tasks: usize, task: &(dyn Fn(usize) + Send + Sync)) {
        self.inner.run(tasks, task);
    }
}

thread_local! {
    static CURRENT: RefCell<Vec<Arc<dyn Scheduler>>> = const { RefCell::new(Vec::new()) };
}

struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Install `sched` as the current scheduler for the duration of `f`.
///
/// The override is per-thread and nests; it is restored even if `f`
/// panics.
pub fn with_scheduler<R>(sched: Arc<dyn Scheduler>, f: impl FnOnce() -> R) -> R {
    CURRENT.with(|stack| stack.borrow_mut().push(sched));
    let _guard = ScopeGuard;
    f()
}

/// The scheduler materializations on this thread currently go through.
pub(crate) fn current() -> Arc<dyn Scheduler> {
    CURRENT
        .with(|stack| stack.borrow().last().cloned())
        .unwrap_or_else(default_scheduler)
}

fn default_scheduler() -> Arc<dyn Scheduler> {
    static DEFAULT: OnceLock<Arc<RayonScheduler>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(RayonScheduler)).clone() as Arc<dyn Scheduler>
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_runs_every_task() {
        let hits: Vec<AtomicUsize> = (0..4).map(|_| AtomicUsize::new(0)).collect();
        SerialScheduler.run(4, &|i| {
            hits[i].fetch_add(1, Ordering::Relaxed);
        });
        for h in &hits {
            assert_eq!(h.load(Ordering::Relaxed), 1);
        }
    }

    #[test]
    fn test_rayon_runs_every_task() {
        let hits: Vec<AtomicUsize> = (0..64).map(|_| AtomicUsize::new(0)).collect();
        RayonScheduler.run(64, &|i| {
            hits[i].fetch_add(1, Ordering::Relaxed);
        });
        for h in &hits {
            assert_eq!(h.load(Ordering::Relaxed), 1);
        }
    }

    #[test]
    fn test_counting_within_limit() {
        let sched = CountingScheduler::new(2);
        sched.on_materialize();
        sched.on_materialize();
        assert_eq!(sched.materializations(), 2);
    }

    #[test]
    #[should_panic(expected = "too many materializations")]
    fn test_counting_over_limit() {
        let sched = CountingScheduler::new(0);
        sched.on_materialize();
    }

    #[test]
    fn test_with_scheduler_scoping() {
        let sched: Arc<dyn Scheduler> = Arc::new(SerialScheduler);
        with_scheduler(sched.clone(), || {
            assert!(Arc::ptr_eq(&current(), &sched));
        });
        assert!(!Arc::ptr_eq(&current(), &sched));
    }

    #[test]
    fn test_with_scheduler_restores_on_panic() {
        let sched: Arc<dyn Scheduler> = Arc::new(SerialScheduler);
        let result = std::panic::catch_unwind(|| {
            with_scheduler(Arc::new(CountingScheduler::new(0)), || {
                current().on_materialize();
            });
        });
        assert!(result.is_err());
        assert!(!Arc::ptr_eq(&current(), &sched));
        // The panicking scope must have been popped.
        CURRENT.with(|stack| assert!(stack.borrow().is_empty()));
    }
}
