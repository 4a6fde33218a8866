//! Deferred task queue
//!
//! Stands in for "run this on a later turn of the loop". Work is enqueued as
//! closures and drained by whoever drives the loop, one tick at a time.

use std::cell::RefCell;
use std::collections::VecDeque;

/// Default upper bound on ticks for a single `run_until_idle`
pub const DEFAULT_MAX_TICKS: usize = 10_000;

type Task = Box<dyn FnOnce()>;

/// FIFO of deferred closures
pub struct TaskQueue {
    tasks: RefCell<VecDeque<Task>>,
    max_ticks: usize,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::with_max_ticks(DEFAULT_MAX_TICKS)
    }

    pub fn with_max_ticks(max_ticks: usize) -> Self {
        Self {
            tasks: RefCell::new(VecDeque::new()),
            max_ticks: max_ticks.max(1),
        }
    }

    /// Schedule a closure for a later tick
    pub fn defer<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run the tasks queued before this tick started.
    ///
    /// Anything those tasks enqueue waits for the next tick. Returns the
    /// number of tasks run.
    pub fn tick(&self) -> usize {
        let pending = self.tasks.borrow().len();
        let mut ran = 0;
        for _ in 0..pending {
            // Release the borrow before running, tasks may enqueue more
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                // A task ticked the queue itself and took the rest
                None => break,
            }
            ran += 1;
        }
        ran
    }

    /// Tick until nothing is left, returning the total tasks run
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        for _ in 0..self.max_ticks {
            if self.is_empty() {
                return total;
            }
            total += self.tick();
        }
        if !self.is_empty() {
            tracing::warn!(
                remaining = self.len(),
                max_ticks = self.max_ticks,
                "task queue still busy after tick limit"
            );
        }
        total
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_tasks_run_in_order() {
        let queue = TaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            queue.defer(move || log.borrow_mut().push(i));
        }
        assert!(log.borrow().is_empty());

        assert_eq!(queue.tick(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_nested_tasks_wait_for_next_tick() {
        let queue = Rc::new(TaskQueue::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        {
            let inner_queue = queue.clone();
            let log = log.clone();
            queue.defer(move || {
                log.borrow_mut().push("outer");
                let log = log.clone();
                inner_queue.defer(move || log.borrow_mut().push("inner"));
            });
        }

        assert_eq!(queue.tick(), 1);
        assert_eq!(*log.borrow(), vec!["outer"]);
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_reentrant_tick_counts_only_its_own_tasks() {
        let queue = Rc::new(TaskQueue::new());
        let inner_ran = Rc::new(Cell::new(0));

        {
            let inner_queue = queue.clone();
            let inner_ran = inner_ran.clone();
            queue.defer(move || inner_ran.set(inner_queue.tick()));
        }
        queue.defer(|| {});

        assert_eq!(queue.tick(), 1);
        assert_eq!(inner_ran.get(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_run_until_idle_is_bounded() {
        fn respawn(queue: Rc<TaskQueue>) {
            let next = queue.clone();
            queue.defer(move || respawn(next));
        }

        let queue = Rc::new(TaskQueue::with_max_ticks(5));
        respawn(queue.clone());

        assert_eq!(queue.run_until_idle(), 5);
        assert_eq!(queue.len(), 1);
    }
}
