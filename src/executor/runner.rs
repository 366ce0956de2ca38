//! Blocking fan-out/join runner
//!
//! Runs every task on its own scoped thread and waits for all of them.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::{debug, error};

use crate::config::RunnerConfig;
use crate::errs::{capture, ConcError, Errs};
use crate::utils::timer::Timer;

use super::report;

/// A unit of work: runs once, reports failure by panicking or returning `Err`
pub struct Task<'a>(Box<dyn FnOnce() -> Option<anyhow::Error> + Send + 'a>);

impl<'a> Task<'a> {
    /// Task that can only fail by panicking.
    ///
    /// Raise errors with `panic_any` as `anyhow::Error` or
    /// `Box<dyn Error + Send + Sync>` to keep them; see [`capture`] for the
    /// payloads that are recognized.
    pub fn new<F>(fun: F) -> Self
    where
        F: FnOnce() + Send + 'a,
    {
        Self(Box::new(move || {
            fun();
            None::<anyhow::Error>
        }))
    }

    /// Task whose `Err` is recorded like a panic
    pub fn fallible<F, E>(fun: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + Send + 'a,
        E: Into<anyhow::Error>,
    {
        Self(Box::new(move || fun().err().map(Into::<anyhow::Error>::into)))
    }

    /// Run the task, catching any panic
    pub fn run(self) -> Option<anyhow::Error> {
        match panic::catch_unwind(AssertUnwindSafe(self.0)) {
            Ok(outcome) => outcome,
            Err(payload) => Some(capture(payload)),
        }
    }
}

impl fmt::Debug for Task<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Task")
    }
}

/// Short for "concurrent". An ordered list of tasks to run in parallel.
///
/// Every task runs to completion, so no cancellation context is needed:
/// tasks can borrow whatever they need from the caller's stack.
///
/// ```
/// use conc::Conc;
///
/// let mut conc = Conc::new();
/// conc.add(|| println!("first"));
/// conc.add(|| println!("second"));
/// assert!(conc.all().is_none());
/// ```
#[derive(Debug, Default)]
pub struct Conc<'a> {
    tasks: Vec<Option<Task<'a>>>,
    config: RunnerConfig,
}

impl<'a> Conc<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size storage for `capacity` tasks
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Vec::with_capacity(capacity),
            config: RunnerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a task without running it
    pub fn add<F>(&mut self, fun: F)
    where
        F: FnOnce() + Send + 'a,
    {
        self.tasks.push(Some(Task::new(fun)));
    }

    /// Append a task returning `Result`
    pub fn add_fallible<F, E>(&mut self, fun: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'a,
        E: Into<anyhow::Error>,
    {
        self.tasks.push(Some(Task::fallible(fun)));
    }

    /// Append a task if there is one; `None` is ignored
    pub fn add_opt<F>(&mut self, fun: Option<F>)
    where
        F: FnOnce() + Send + 'a,
    {
        if let Some(fun) = fun {
            self.add(fun);
        }
    }

    /// Append a task that has already been built
    pub fn push(&mut self, task: Task<'a>) {
        self.tasks.push(Some(task));
    }

    /// Number of positions, empty ones included
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run all tasks and collapse the outcome.
    ///
    /// Returns `None` if every task succeeded, the error itself if exactly one
    /// failed, and an [`Errs`] otherwise.
    pub fn all(self) -> Option<anyhow::Error> {
        self.run_all().err()
    }

    /// Like [`Conc::all`], but panics with the collapsed error
    pub fn try_all(self) {
        if let Some(err) = self.all() {
            panic::panic_any(err);
        }
    }

    /// Run all tasks and return one slot per position.
    ///
    /// Slot `i` holds the failure of task `i`. Empty positions and tasks that
    /// succeeded leave their slot empty.
    pub fn run_all(self) -> Errs {
        let Conc { tasks, config } = self;
        let mut slots: Vec<Option<anyhow::Error>> = Vec::new();
        slots.resize_with(tasks.len(), || None);

        let pending = tasks.iter().filter(|task| task.is_some()).count();
        match pending {
            0 => {
                debug!("No tasks to run");
                return Errs::new(slots);
            }
            1 if config.inline_single => {
                debug!("Running single task on the calling thread");
                let tasks = tasks.into_iter().zip(slots.iter_mut());
                for (task, slot) in tasks {
                    if let Some(task) = task {
                        *slot = task.run();
                    }
                }
                report(&slots);
                return Errs::new(slots);
            }
            _ => {}
        }

        debug!("Running {} tasks concurrently", pending);
        let timer = Timer::start(format!("join of {pending} tasks"));
        let mut failed_spawns = Vec::new();

        thread::scope(|scope| {
            let tasks = tasks.into_iter().zip(slots.iter_mut()).enumerate();
            for (index, (task, slot)) in tasks {
                let Some(task) = task else {
                    continue;
                };

                let mut builder =
                    thread::Builder::new().name(format!("{}-{index}", config.thread_name));
                if let Some(size) = config.stack_size {
                    builder = builder.stack_size(size);
                }

                let spawned = builder.spawn_scoped(scope, move || *slot = task.run());

                if let Err(source) = spawned {
                    error!("Failed to spawn worker for task {}: {}", index, source);
                    failed_spawns.push((index, source));
                }
            }
        });
        report(&slots);

        // The closures owning these slots were dropped with the failed spawns.
        for (index, source) in failed_spawns {
            slots[index] = Some(anyhow::Error::new(ConcError::Spawn { index, source }));
        }

        timer.stop();
        Errs::new(slots)
    }
}

impl<'a> From<Vec<Option<Task<'a>>>> for Conc<'a> {
    fn from(tasks: Vec<Option<Task<'a>>>) -> Self {
        Self {
            tasks,
            config: RunnerConfig::default(),
        }
    }
}

impl<'a> FromIterator<Option<Task<'a>>> for Conc<'a> {
    fn from_iter<I: IntoIterator<Item = Option<Task<'a>>>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a> FromIterator<Task<'a>> for Conc<'a> {
    fn from_iter<I: IntoIterator<Item = Task<'a>>>(iter: I) -> Self {
        iter.into_iter().map(Some).collect()
    }
}

impl<'a> Extend<Task<'a>> for Conc<'a> {
    fn extend<I: IntoIterator<Item = Task<'a>>>(&mut self, iter: I) {
        self.tasks.extend(iter.into_iter().map(Some));
    }
}
