//! Cancellable scheduled-task service.
//!
//! Debounce, suppression grace, and reconciliation delays all run through
//! this seam instead of raw timer callbacks, so board switches and unmount
//! can cancel them and tests can drive time deterministically.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

/// A deferred unit of work producing a local future when it fires.
pub type ScheduledTask = Box<dyn FnOnce() -> LocalBoxFuture<'static, ()>>;

/// Opaque handle to a scheduled task, used for explicit cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Host timer service. A `delay_ms` of zero means "as soon as the current
/// turn of the event loop completes", preserving scheduling order.
pub trait TaskScheduler {
    /// Schedules `task` to fire once after `delay_ms` milliseconds.
    fn schedule(&self, delay_ms: u64, task: ScheduledTask) -> TaskHandle;

    /// Cancels a pending task; cancelling a fired or unknown handle is a
    /// no-op.
    fn cancel(&self, handle: TaskHandle);
}

/// Scheduler that discards every task, for hosts without an event loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScheduler;

impl TaskScheduler for NoopScheduler {
    fn schedule(&self, _delay_ms: u64, _task: ScheduledTask) -> TaskHandle {
        TaskHandle(0)
    }

    fn cancel(&self, _handle: TaskHandle) {}
}

struct ManualEntry {
    handle: TaskHandle,
    due_ms: u64,
    task: ScheduledTask,
}

#[derive(Default)]
struct ManualInner {
    now_ms: u64,
    next_handle: u64,
    queue: Vec<ManualEntry>,
}

/// Deterministic scheduler driven by an explicit virtual clock.
///
/// Tasks fire inside [`ManualScheduler::advance`], in due-time order with
/// FIFO ordering among equal deadlines, and each fired task's future is run
/// to completion before the next one starts — the single-threaded event-loop
/// model the runtime assumes.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualScheduler {
    /// Creates a scheduler with the virtual clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.inner.borrow().now_ms
    }

    /// Number of tasks still waiting to fire.
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Advances the virtual clock by `delta_ms`, firing every task that
    /// becomes due, including tasks scheduled by fired tasks when their
    /// deadline also falls inside the window.
    pub fn advance(&self, delta_ms: u64) {
        let target = {
            let mut inner = self.inner.borrow_mut();
            inner.now_ms = inner.now_ms.saturating_add(delta_ms);
            inner.now_ms
        };

        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let due_index = inner
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.due_ms <= target)
                    .min_by_key(|(_, entry)| (entry.due_ms, entry.handle.0))
                    .map(|(index, _)| index);
                due_index.map(|index| inner.queue.remove(index))
            };

            match next {
                Some(entry) => futures::executor::block_on((entry.task)()),
                None => break,
            }
        }
    }

    /// Fires tasks scheduled with a zero delay without advancing the clock.
    pub fn run_ready(&self) {
        self.advance(0);
    }
}

impl TaskScheduler for ManualScheduler {
    fn schedule(&self, delay_ms: u64, task: ScheduledTask) -> TaskHandle {
        let mut inner = self.inner.borrow_mut();
        inner.next_handle += 1;
        let handle = TaskHandle(inner.next_handle);
        let due_ms = inner.now_ms.saturating_add(delay_ms);
        inner.queue.push(ManualEntry {
            handle,
            due_ms,
            task,
        });
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        self.inner
            .borrow_mut()
            .queue
            .retain(|entry| entry.handle != handle);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;

    fn record_task(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> ScheduledTask {
        let log = Rc::clone(log);
        Box::new(move || {
            Box::pin(async move {
                log.borrow_mut().push(label);
            })
        })
    }

    #[test]
    fn tasks_fire_in_deadline_order_with_fifo_ties() {
        let scheduler = ManualScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        scheduler.schedule(300, record_task(&log, "late"));
        scheduler.schedule(0, record_task(&log, "first"));
        scheduler.schedule(0, record_task(&log, "second"));

        scheduler.run_ready();
        assert_eq!(*log.borrow(), vec!["first", "second"]);

        scheduler.advance(300);
        assert_eq!(*log.borrow(), vec!["first", "second", "late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let scheduler = ManualScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let handle = scheduler.schedule(100, record_task(&log, "cancelled"));
        scheduler.schedule(100, record_task(&log, "kept"));
        scheduler.cancel(handle);

        scheduler.advance(100);
        assert_eq!(*log.borrow(), vec!["kept"]);
    }

    #[test]
    fn tasks_scheduled_while_firing_run_when_due_in_the_same_window() {
        let scheduler = ManualScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let rearm = {
            let log = Rc::clone(&log);
            let inner = ManualScheduler::clone(&scheduler);
            Box::new(move || -> futures::future::LocalBoxFuture<'static, ()> {
                Box::pin(async move {
                    log.borrow_mut().push("outer");
                    inner.schedule(0, record_task(&log, "inner"));
                })
            })
        };
        scheduler.schedule(50, rearm);

        scheduler.advance(50);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn advancing_an_empty_scheduler_is_a_no_op() {
        let scheduler = ManualScheduler::new();
        scheduler.advance(1_000);
        assert_eq!(scheduler.now_ms(), 1_000);
        assert_eq!(scheduler.pending(), 0);
    }
}
