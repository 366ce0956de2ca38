//! Async fan-out/join runner
//!
//! Spawns every future on the tokio runtime and waits for all of them.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;

use futures::future::join_all;
use futures::FutureExt;
use tokio::task::JoinError;
use tracing::debug;

use crate::errs::{capture, ConcError, Errs};
use crate::utils::timer::Timer;

use super::report;

type BoxFuture = Pin<Box<dyn Future<Output = Option<anyhow::Error>> + Send + 'static>>;

/// Future-based counterpart of [`Conc`](crate::Conc).
///
/// Requires a tokio runtime. Each future is spawned as its own task, so
/// futures must be `'static`.
#[derive(Default)]
pub struct AsyncConc {
    tasks: Vec<Option<BoxFuture>>,
}

impl AsyncConc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Vec::with_capacity(capacity),
        }
    }

    /// Append a future without polling it
    pub fn add<F>(&mut self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task: BoxFuture = Box::pin(fut.map(|()| None::<anyhow::Error>));
        self.tasks.push(Some(task));
    }

    /// Append a future resolving to `Result`
    pub fn add_fallible<F, E>(&mut self, fut: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        let task: BoxFuture = Box::pin(
            fut.map(|res| res.err().map(Into::<anyhow::Error>::into)),
        );
        self.tasks.push(Some(task));
    }

    /// Append a future if there is one; `None` is ignored
    pub fn add_opt<F>(&mut self, fut: Option<F>)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(fut) = fut {
            self.add(fut);
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn all(self) -> Option<anyhow::Error> {
        self.run_all().await.err()
    }

    /// Like [`AsyncConc::all`], but panics with the collapsed error
    pub async fn try_all(self) {
        if let Some(err) = self.all().await {
            panic::panic_any(err);
        }
    }

    /// Run all futures and return one slot per position
    pub async fn run_all(self) -> Errs {
        let mut slots: Vec<Option<anyhow::Error>> = Vec::new();
        slots.resize_with(self.tasks.len(), || None);

        let pending = self.tasks.iter().filter(|task| task.is_some()).count();
        match pending {
            0 => {
                debug!("No futures to run");
                return Errs::new(slots);
            }
            1 => {
                debug!("Awaiting single future inline");
                let tasks = self.tasks.into_iter().zip(slots.iter_mut());
                for (task, slot) in tasks {
                    if let Some(task) = task {
                        *slot = match AssertUnwindSafe(task).catch_unwind().await {
                            Ok(outcome) => outcome,
                            Err(payload) => Some(capture(payload)),
                        };
                    }
                }
                report(&slots);
                return Errs::new(slots);
            }
            _ => {}
        }

        debug!("Spawning {} futures", pending);
        let timer = Timer::start(format!("join of {pending} futures"));

        let mut indices = Vec::with_capacity(pending);
        let mut handles = Vec::with_capacity(pending);
        for (index, task) in self.tasks.into_iter().enumerate() {
            if let Some(task) = task {
                indices.push(index);
                handles.push(tokio::spawn(task));
            }
        }

        let results = join_all(handles).await;
        for (index, result) in indices.into_iter().zip(results) {
            slots[index] = match result {
                Ok(outcome) => outcome,
                Err(err) => Some(from_join_error(index, err)),
            };
        }
        report(&slots);

        timer.stop();
        Errs::new(slots)
    }
}

fn from_join_error(index: usize, err: JoinError) -> anyhow::Error {
    match err.try_into_panic() {
        Ok(payload) => capture(payload),
        Err(_) => anyhow::Error::new(ConcError::Cancelled { index }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errs::ErrorChain;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use thiserror::Error;

    #[derive(Error, Debug, PartialEq)]
    #[error("{0}")]
    struct TestErr(&'static str);

    async fn explode(msg: &'static str) {
        panic!("{}", msg)
    }

    async fn raise(err: TestErr) {
        panic::panic_any(anyhow::Error::new(err))
    }

    #[tokio::test]
    async fn test_success() {
        assert!(AsyncConc::new().all().await.is_none());

        let mut conc = AsyncConc::new();
        conc.add_opt(None::<futures::future::Ready<()>>);
        conc.add(async {});
        conc.add(async {});
        assert_eq!(conc.len(), 2);
        assert!(conc.all().await.is_none());
    }

    #[tokio::test]
    async fn test_single_failure_is_unwrapped() {
        let mut conc = AsyncConc::new();
        conc.add_fallible(async { Err(TestErr("only")) });

        let err = conc.all().await.unwrap();
        assert_eq!(err.downcast_ref::<TestErr>(), Some(&TestErr("only")));
    }

    #[tokio::test]
    async fn test_single_panic_is_captured() {
        let mut conc = AsyncConc::new();
        conc.add(explode("inline panic"));

        let err = conc.all().await.unwrap();
        assert_eq!(err.to_string(), "inline panic");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mixed() {
        let mut conc = AsyncConc::with_capacity(5);
        conc.add(async {});
        conc.add_fallible(async { Err(TestErr("a")) });
        conc.add(async {});
        conc.add(raise(TestErr("b")));
        conc.add(async {});

        let errs = conc.run_all().await;
        assert_eq!(errs.len(), 5);
        assert_eq!(errs.count_non_nil(), 2);
        assert_eq!(errs.to_string(), "[conc] multiple errors; a; b");
        assert!(errs.is_caused_by(&TestErr("a")));
        assert!(errs.is_caused_by(&TestErr("b")));
        assert!(!errs.is_caused_by(&TestErr("c")));
    }

    #[tokio::test]
    async fn test_futures_run_concurrently() {
        let started = Arc::new(AtomicUsize::new(0));
        let begin = Instant::now();

        let mut conc = AsyncConc::new();
        for _ in 0..6 {
            let started = started.clone();
            conc.add(async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
            });
        }
        assert!(conc.all().await.is_none());

        assert_eq!(started.load(Ordering::SeqCst), 6);
        assert!(begin.elapsed() < Duration::from_millis(300));
    }

    #[test]
    fn test_try_all_reraises() {
        let result = panic::catch_unwind(|| {
            tokio_test::block_on(async {
                let mut conc = AsyncConc::new();
                conc.add_fallible(async { Err(TestErr("fatal")) });
                conc.try_all().await;
            })
        });

        let payload = result.unwrap_err();
        let err = payload.downcast::<anyhow::Error>().unwrap();
        assert_eq!(err.downcast_ref::<TestErr>(), Some(&TestErr("fatal")));
    }

    #[tokio::test]
    async fn test_aborted_task_is_cancelled() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        handle.abort();
        let join_err = handle.await.unwrap_err();
        assert!(join_err.is_cancelled());

        let err = from_join_error(3, join_err);
        assert_eq!(err.to_string(), "task 3 was cancelled before completion");
        assert!(matches!(
            err.downcast_ref::<ConcError>(),
            Some(ConcError::Cancelled { index: 3 })
        ));
    }

    #[tokio::test]
    async fn test_join_panic_is_captured() {
        let join_err = tokio::spawn(explode("worker panic")).await.unwrap_err();

        let err = from_join_error(1, join_err);
        assert_eq!(err.to_string(), "worker panic");
        assert!(matches!(
            err.downcast_ref::<ConcError>(),
            Some(ConcError::Panic(_))
        ));
    }
}
