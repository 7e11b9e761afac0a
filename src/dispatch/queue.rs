//! Blocking FIFO queue drained by one worker pool.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// An item on a work queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Task<J> {
    Job(J),
    /// Stops exactly one worker that dequeues it.
    Stop,
}

/// Unbounded multi-consumer FIFO.
#[derive(Debug)]
pub struct TaskQueue<J> {
    items: Mutex<VecDeque<Task<J>>>,
    available: Condvar,
}

impl<J> TaskQueue<J> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    pub fn push(&self, task: Task<J>) {
        self.items.lock().push_back(task);
        self.available.notify_one();
    }

    /// Block until a task is available and take it.
    pub fn pop(&self) -> Task<J> {
        let mut items = self.items.lock();
        loop {
            if let Some(task) = items.pop_front() {
                return task;
            }
            self.available.wait(&mut items);
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<J> Default for TaskQueue<J> {
    fn default() -> Self {
        Self::new()
    }
}
