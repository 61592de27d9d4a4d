//! Single-threaded cooperative scheduler.
//!
//! Every pool mutation and every fader tick runs on one designated thread,
//! so the pool needs no internal locking: there is never more than one
//! logical operation in flight. External producers (engine watcher threads,
//! background I/O) re-enter the pool only by posting a task through a
//! [`SchedulerHandle`].
//!
//! The production entry point is [`Scheduler::run`], a blocking loop in the
//! command-executor style: receive tasks from an unbounded channel, keep
//! delayed tasks in a deadline-ordered heap, sleep until the next deadline.
//! Hosts that already own an event loop (and the test suites) instead drive
//! [`Scheduler::run_due`] against [`Scheduler::next_deadline`], which makes
//! time explicit and the loop fully deterministic.

use std::collections::{BinaryHeap, VecDeque};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::playback::PlaybackPool;

/// A unit of work executed with exclusive access to the pool
pub type Task = Box<dyn FnOnce(&mut PlaybackPool) + Send + 'static>;

enum Message {
    Run(Task),
    RunAt(Instant, Task),
    Shutdown,
}

/// Cheaply cloneable posting side of the scheduler; safe to use from any
/// thread.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: Sender<Message>,
}

impl SchedulerHandle {
    /// Post a task to run as soon as the scheduler gets to it
    pub fn post(&self, task: impl FnOnce(&mut PlaybackPool) + Send + 'static) {
        let _ = self.tx.send(Message::Run(Box::new(task)));
    }

    /// Post a task to run no earlier than `delay` from now
    pub fn post_delayed(&self, delay: Duration, task: impl FnOnce(&mut PlaybackPool) + Send + 'static) {
        let due = Instant::now() + delay;
        let _ = self.tx.send(Message::RunAt(due, Box::new(task)));
    }

    /// Ask a blocking [`Scheduler::run`] loop to exit
    pub fn shutdown(&self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}

struct TimedTask {
    due: Instant,
    /// Tie-break so equal deadlines run in post order
    seq: u64,
    task: Task,
}

impl PartialEq for TimedTask {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for TimedTask {}

impl PartialOrd for TimedTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimedTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap; invert so the earliest deadline wins
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// The receiving/executing side of the event loop.
pub struct Scheduler {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    ready: VecDeque<Task>,
    timed: BinaryHeap<TimedTask>,
    seq: u64,
    running: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            ready: VecDeque::new(),
            timed: BinaryHeap::new(),
            seq: 0,
            running: false,
        }
    }

    /// Get a posting handle for this scheduler
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            tx: self.tx.clone(),
        }
    }

    fn enqueue(&mut self, message: Message) {
        match message {
            Message::Run(task) => self.ready.push_back(task),
            Message::RunAt(due, task) => {
                self.seq += 1;
                self.timed.push(TimedTask {
                    due,
                    seq: self.seq,
                    task,
                });
            }
            Message::Shutdown => self.running = false,
        }
    }

    /// Move every pending channel message into the internal queues without
    /// executing anything.
    fn absorb(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            self.enqueue(message);
        }
    }

    /// Earliest pending deadline, if any delayed task is waiting.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.absorb();
        self.timed.peek().map(|t| t.due)
    }

    /// Execute every task that is ready at `now`: all posted tasks, plus
    /// delayed tasks whose deadline has passed. Tasks posted *during* this
    /// call run immediately as well, but delayed tasks filed during this
    /// call wait for the next one; a self-rescheduling tick therefore runs
    /// exactly once per `run_due`, no matter how `now` relates to the wall
    /// clock. Returns the number of tasks executed.
    pub fn run_due(&mut self, pool: &mut PlaybackPool, now: Instant) -> usize {
        self.absorb();
        while self.timed.peek().map(|t| t.due <= now).unwrap_or(false) {
            if let Some(timed) = self.timed.pop() {
                self.ready.push_back(timed.task);
            }
        }

        let mut executed = 0;
        while let Some(task) = self.ready.pop_front() {
            task(pool);
            executed += 1;
            self.absorb();
        }
        executed
    }

    /// Blocking production loop. Runs until [`SchedulerHandle::shutdown`] is
    /// posted.
    pub fn run(&mut self, pool: &mut PlaybackPool) {
        self.running = true;
        while self.running {
            self.run_due(pool, Instant::now());
            if !self.running {
                break;
            }

            let message = match self.next_deadline() {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    match self.rx.recv_timeout(timeout) {
                        Ok(message) => Some(message),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                // Nothing scheduled: sleep until the next posted task.
                None => match self.rx.recv() {
                    Ok(message) => Some(message),
                    Err(_) => break,
                },
            };
            if let Some(message) = message {
                self.enqueue(message);
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
