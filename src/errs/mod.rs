//! Task failures
//!
//! Outcome aggregation, panic capture and cause-chain inspection.

mod capture;
mod chain;
#[allow(clippy::module_inception)]
mod errs;

pub use capture::{capture, ConcError};
pub use chain::ErrorChain;
pub use errs::{Errs, MULTIPLE_ERRORS};
