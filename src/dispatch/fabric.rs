//! Partitioned worker pools.
//!
//! `num_queues` FIFO queues, each drained by `threads_per_queue` workers that
//! never touch another queue. A job lands on one randomly chosen queue, so a
//! slow job can only hold up the workers of its own queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::config::DispatchConfig;
use crate::dispatch::queue::{Task, TaskQueue};
use crate::observability::metrics;

/// Errors raised by the fabric itself (never by job handling).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("fabric needs at least one queue and one worker per queue")]
    EmptyTopology,

    #[error("no queue with index {index} (fabric has {num_queues})")]
    NoSuchQueue { index: usize, num_queues: usize },

    #[error("failed to spawn worker {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fixed set of queues with dedicated worker threads.
pub struct DispatchFabric<J> {
    queues: Vec<Arc<TaskQueue<J>>>,
    workers: Vec<JoinHandle<()>>,
    threads_per_queue: usize,
    live_workers: Arc<AtomicUsize>,
}

impl<J: Send + 'static> DispatchFabric<J> {
    /// Create the queues and start every worker.
    ///
    /// Workers call `handler` synchronously for each job and are blocked for
    /// its full duration. A panicking handler is logged; the worker goes on.
    pub fn start<H>(config: &DispatchConfig, handler: H) -> Result<Self, DispatchError>
    where
        H: Fn(J) + Send + Sync + 'static,
    {
        if config.num_queues == 0 || config.threads_per_queue == 0 {
            return Err(DispatchError::EmptyTopology);
        }

        let handler = Arc::new(handler);
        let live_workers = Arc::new(AtomicUsize::new(0));
        let queues: Vec<_> = (0..config.num_queues)
            .map(|_| Arc::new(TaskQueue::new()))
            .collect();

        let mut fabric = Self {
            queues: queues.clone(),
            workers: Vec::with_capacity(config.num_queues * config.threads_per_queue),
            threads_per_queue: config.threads_per_queue,
            live_workers: Arc::clone(&live_workers),
        };

        for (q, queue) in queues.iter().enumerate() {
            for w in 0..config.threads_per_queue {
                let name = format!("queue-{}-worker-{}", q + 1, w + 1);
                let queue = Arc::clone(queue);
                let handler = Arc::clone(&handler);
                let live = Arc::clone(&live_workers);

                live.fetch_add(1, Ordering::SeqCst);
                let spawned = thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || worker_loop(&queue, handler.as_ref(), &live));

                match spawned {
                    Ok(handle) => fabric.workers.push(handle),
                    Err(source) => {
                        live_workers.fetch_sub(1, Ordering::SeqCst);
                        fabric.stop_all_and_join();
                        return Err(DispatchError::Spawn { name, source });
                    }
                }
            }
        }

        tracing::info!(
            num_queues = config.num_queues,
            threads_per_queue = config.threads_per_queue,
            "Dispatch fabric started"
        );
        Ok(fabric)
    }
}

impl<J> DispatchFabric<J> {
    /// Push `job` onto a uniformly random queue; returns the queue index.
    pub fn enqueue(&self, job: J) -> usize {
        let index = fastrand::usize(..self.queues.len());
        self.queues[index].push(Task::Job(job));
        metrics::record_enqueued(index);
        index
    }

    /// Push `job` onto a specific queue.
    pub fn enqueue_to(&self, index: usize, job: J) -> Result<(), DispatchError> {
        self.queue(index)?.push(Task::Job(job));
        metrics::record_enqueued(index);
        Ok(())
    }

    /// Push one stop sentinel: exactly one worker of that queue exits.
    pub fn stop_one(&self, index: usize) -> Result<(), DispatchError> {
        self.queue(index)?.push(Task::Stop);
        Ok(())
    }

    /// Stop every worker and wait for them.
    ///
    /// Queued jobs ahead of the sentinels are still handled.
    pub fn shutdown(mut self) {
        self.stop_all_and_join();
        tracing::info!("Dispatch fabric stopped");
    }

    pub fn num_queues(&self) -> usize {
        self.queues.len()
    }

    pub fn threads_per_queue(&self) -> usize {
        self.threads_per_queue
    }

    /// Workers that have not yet observed a stop sentinel.
    pub fn live_workers(&self) -> usize {
        self.live_workers.load(Ordering::SeqCst)
    }

    /// Pending tasks per queue, sentinels included.
    pub fn queue_depths(&self) -> Vec<usize> {
        self.queues.iter().map(|q| q.len()).collect()
    }

    fn queue(&self, index: usize) -> Result<&TaskQueue<J>, DispatchError> {
        self.queues
            .get(index)
            .map(Arc::as_ref)
            .ok_or(DispatchError::NoSuchQueue {
                index,
                num_queues: self.queues.len(),
            })
    }

    fn stop_all_and_join(&mut self) {
        for queue in &self.queues {
            for _ in 0..self.threads_per_queue {
                queue.push(Task::Stop);
            }
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked outside of job handling");
            }
        }
    }
}

fn worker_loop<J, H>(queue: &TaskQueue<J>, handler: &H, live: &AtomicUsize)
where
    H: Fn(J) + ?Sized,
{
    loop {
        match queue.pop() {
            Task::Stop => {
                tracing::debug!("Worker received shutdown signal");
                break;
            }
            Task::Job(job) => {
                if panic::catch_unwind(AssertUnwindSafe(|| handler(job))).is_err() {
                    tracing::error!("Job handler panicked; worker continues");
                }
            }
        }
    }
    live.fetch_sub(1, Ordering::SeqCst);
}
