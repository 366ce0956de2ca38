//! Multi-error aggregate
//!
//! Holds one outcome slot per task and collapses them into a single error.

use std::error::Error as StdError;
use std::fmt;
use std::ops::Index;

/// Preamble of the message rendered when more than one slot holds an error
pub const MULTIPLE_ERRORS: &str = "[conc] multiple errors";

/// Outcome slots of a run, in task order. `None` marks a task that succeeded.
///
/// `Errs` implements [`std::error::Error`], but a run with no failures should
/// not be turned into an error. Use [`Errs::err`], which returns `None` when
/// every slot is empty and the bare error when only one slot is filled.
#[derive(Debug, Default)]
pub struct Errs(Vec<Option<anyhow::Error>>);

impl Errs {
    pub fn new(slots: Vec<Option<anyhow::Error>>) -> Self {
        Self(slots)
    }

    /// Collapse into nothing, the single error, or the aggregate itself
    pub fn err(self) -> Option<anyhow::Error> {
        match self.count_non_nil() {
            0 => None,
            1 => self.0.into_iter().flatten().next(),
            _ => Some(anyhow::Error::new(self)),
        }
    }

    /// Same as [`Errs::err`], shaped for `?`
    pub fn into_result(self) -> anyhow::Result<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// True if at least one slot holds an error
    pub fn has_some(&self) -> bool {
        self.0.iter().any(Option::is_some)
    }

    /// Count the slots that satisfy the predicate, empty slots included
    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(Option<&anyhow::Error>) -> bool,
    {
        self.0.iter().filter(|slot| pred(slot.as_ref())).count()
    }

    pub fn count_nil(&self) -> usize {
        self.count(|slot| slot.is_none())
    }

    pub fn count_non_nil(&self) -> usize {
        self.count(|slot| slot.is_some())
    }

    /// First error, in slot order, that satisfies the predicate
    pub fn find<F>(&self, pred: F) -> Option<&anyhow::Error>
    where
        F: Fn(&anyhow::Error) -> bool,
    {
        self.iter().find(|err| pred(err))
    }

    pub fn first(&self) -> Option<&anyhow::Error> {
        self.find(|_| true)
    }

    /// Iterate over the non-empty slots
    pub fn iter(&self) -> impl Iterator<Item = &anyhow::Error> {
        self.0.iter().flatten()
    }

    /// All slots, empty ones included
    pub fn slots(&self) -> &[Option<anyhow::Error>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<Option<anyhow::Error>> {
        self.0
    }

    fn format(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MULTIPLE_ERRORS)?;
        for err in self.iter() {
            write!(f, "; {err}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Errs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count_non_nil() {
            0 => Ok(()),
            1 => match self.first() {
                Some(err) => write!(f, "{err}"),
                None => Ok(()),
            },
            _ => self.format(f),
        }
    }
}

impl StdError for Errs {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.first().map(|err| {
            let err: &(dyn StdError + Send + Sync + 'static) = err.as_ref();
            err as &(dyn StdError + 'static)
        })
    }
}

impl From<Vec<Option<anyhow::Error>>> for Errs {
    fn from(slots: Vec<Option<anyhow::Error>>) -> Self {
        Self(slots)
    }
}

impl FromIterator<Option<anyhow::Error>> for Errs {
    fn from_iter<I: IntoIterator<Item = Option<anyhow::Error>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Index<usize> for Errs {
    type Output = Option<anyhow::Error>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}
