//! # conc: run closures concurrently, collect what failed
//!
//! Fan out a set of independent tasks, wait for every one of them, and get
//! back a single answer: no error, the one error that happened, or an
//! [`Errs`] aggregate when several tasks failed.
//!
//! ## Features
//!
//! - One thread per task, joined before returning
//! - Panics are caught per task and never affect siblings
//! - Failures keep their task position
//! - [`ErrorChain`] looks through aggregates when searching for a cause
//! - [`AsyncConc`] does the same for futures on a tokio runtime
//!
//! ## Usage
//!
//! ```
//! let mut left = 0;
//! let mut right = 0;
//!
//! let err = conc::all!(|| left = 1, || right = 2);
//!
//! assert!(err.is_none());
//! assert_eq!((left, right), (1, 2));
//! ```

pub mod config;
pub mod errs;
pub mod executor;
pub mod utils;

pub use config::RunnerConfig;
pub use errs::{ConcError, ErrorChain, Errs};
pub use executor::{all, try_all, AsyncConc, Conc, Task};

/// Run the given closures concurrently and collapse their failures.
///
/// Expands to a [`Conc`] with every closure added, followed by [`Conc::all`].
#[macro_export]
macro_rules! all {
    ($($task:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut conc = $crate::Conc::new();
        $(conc.add($task);)*
        conc.all()
    }};
}

/// Run the given closures concurrently and panic with the collapsed failure.
#[macro_export]
macro_rules! try_all {
    ($($task:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut conc = $crate::Conc::new();
        $(conc.add($task);)*
        conc.try_all()
    }};
}
