//! Task execution
//!
//! Blocking and async fan-out/join runners.

mod parallel;
mod runner;

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

pub use parallel::AsyncConc;
pub use runner::{Conc, Task};

/// Log every failed slot once the run has joined.
///
/// Rendering runs the error's `Display`, which is caller code; a panic there
/// is caught so that a run still never raises.
fn report(slots: &[Option<anyhow::Error>]) {
    for (index, slot) in slots.iter().enumerate() {
        let Some(err) = slot else {
            continue;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| err.to_string())) {
            Ok(message) => warn!("Task {} failed: {}", index, message),
            Err(_) => warn!("Task {} failed with an unprintable error", index),
        }
    }
}

/// Run the tasks concurrently and collapse their failures.
///
/// Shortcut for collecting into a [`Conc`] and calling [`Conc::all`].
pub fn all<'a, I>(tasks: I) -> Option<anyhow::Error>
where
    I: IntoIterator<Item = Task<'a>>,
{
    tasks.into_iter().collect::<Conc<'a>>().all()
}

/// Run the tasks concurrently and panic with the collapsed failure, if any
pub fn try_all<'a, I>(tasks: I)
where
    I: IntoIterator<Item = Task<'a>>,
{
    tasks.into_iter().collect::<Conc<'a>>().try_all()
}
