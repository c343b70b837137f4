//! Batch Runner
//!
//! Replays a command file against one shared [`Dispatcher`]. A single producer
//! parses lines into a bounded queue and a pool of worker threads drains it,
//! so commands from the file run concurrently in no guaranteed order.

use crate::command::{parse_line, Command};
use crate::config::BatchConfig;
use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io::BufRead;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Bounded FIFO of commands shared between the producer and the workers.
pub struct CommandQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    depth: usize,
}

struct QueueState {
    items: VecDeque<Command>,
    closed: bool,
}

impl CommandQueue {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(depth),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            depth,
        }
    }

    /// Enqueue, waiting while the queue is full. Returns the command back if
    /// the queue was closed.
    pub fn push(&self, command: Command) -> Result<(), Command> {
        let mut state = self.state.lock();
        while state.items.len() >= self.depth && !state.closed {
            self.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(command);
        }
        state.items.push_back(command);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeue, waiting while the queue is empty. `None` once the queue is
    /// closed and drained.
    pub fn pop(&self) -> Option<Command> {
        let mut state = self.state.lock();
        loop {
            if let Some(command) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(command);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// No more pushes; workers finish what is queued and stop.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome counts of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub commands: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Run every command read from `input` with `config.threads` workers.
///
/// A malformed line stops intake; commands already queued still run before
/// the parse error is returned.
pub fn run<R: BufRead>(
    dispatcher: &Dispatcher,
    input: R,
    config: &BatchConfig,
) -> Result<BatchStats, ApiError> {
    let started = Instant::now();
    let queue = CommandQueue::new(config.queue_depth);
    let threads = config.threads.max(1);
    let totals = Mutex::new(BatchStats::default());

    let intake = std::thread::scope(|scope| {
        for worker_id in 0..threads {
            let queue = &queue;
            let totals = &totals;
            scope.spawn(move || {
                debug!(worker_id, "Worker started");
                let (mut succeeded, mut failed) = (0usize, 0usize);
                while let Some(command) = queue.pop() {
                    if dispatcher.apply(&command) < 0 {
                        failed += 1;
                    } else {
                        succeeded += 1;
                    }
                }
                let mut totals = totals.lock();
                totals.succeeded += succeeded;
                totals.failed += failed;
                debug!(worker_id, succeeded, failed, "Worker finished");
            });
        }

        let intake = produce(&queue, input);
        queue.close();
        intake
    });

    let mut stats = totals.into_inner();
    stats.commands = intake?;
    stats.elapsed = started.elapsed();
    info!(
        commands = stats.commands,
        failed = stats.failed,
        threads,
        "Batch finished in {:.4} seconds",
        stats.elapsed.as_secs_f64()
    );
    Ok(stats)
}

fn produce<R: BufRead>(queue: &CommandQueue, input: R) -> Result<usize, ApiError> {
    let mut queued = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let Some(command) = parse_line(&line, index + 1)? else {
            continue;
        };
        if queue.push(command).is_err() {
            break;
        }
        queued += 1;
    }
    Ok(queued)
}
