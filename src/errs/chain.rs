//! Cause-chain inspection that sees through aggregates
//!
//! `anyhow::Error::chain` and `downcast_ref` only follow a single line of
//! causes. [`ErrorChain`] does the same walk, but whenever a link is an
//! [`Errs`] it fans out into every non-empty slot.

use std::error::Error as StdError;

use super::Errs;

/// Inspect the chain of causes behind an error
pub trait ErrorChain {
    /// The next error in the chain, if any
    fn unwrap_cause(&self) -> Option<&(dyn StdError + 'static)>;

    /// First link of type `T`
    fn find_cause<T>(&self) -> Option<&T>
    where
        T: StdError + Send + Sync + 'static;

    /// True if some link of type `T` equals `target`
    fn is_caused_by<T>(&self, target: &T) -> bool
    where
        T: StdError + PartialEq + Send + Sync + 'static;

    /// True if some link has type `T`
    fn has_cause<T>(&self) -> bool
    where
        T: StdError + Send + Sync + 'static,
    {
        self.find_cause::<T>().is_some()
    }
}

impl ErrorChain for anyhow::Error {
    fn unwrap_cause(&self) -> Option<&(dyn StdError + 'static)> {
        self.chain().nth(1)
    }

    fn find_cause<T>(&self) -> Option<&T>
    where
        T: StdError + Send + Sync + 'static,
    {
        search::<T, _, _>(self, &mut |link| Some(link))
    }

    fn is_caused_by<T>(&self, target: &T) -> bool
    where
        T: StdError + PartialEq + Send + Sync + 'static,
    {
        search::<T, _, _>(self, &mut |link| (link == target).then_some(())).is_some()
    }
}

impl ErrorChain for Errs {
    fn unwrap_cause(&self) -> Option<&(dyn StdError + 'static)> {
        self.source()
    }

    fn find_cause<T>(&self) -> Option<&T>
    where
        T: StdError + Send + Sync + 'static,
    {
        search_all::<T, _, _>(self, &mut |link| Some(link))
    }

    fn is_caused_by<T>(&self, target: &T) -> bool
    where
        T: StdError + PartialEq + Send + Sync + 'static,
    {
        search_all::<T, _, _>(self, &mut |link| (link == target).then_some(())).is_some()
    }
}

fn search<'a, T, R, F>(err: &'a anyhow::Error, visit: &mut F) -> Option<R>
where
    T: StdError + Send + Sync + 'static,
    F: FnMut(&'a T) -> Option<R>,
{
    // Sees through context layers added with `anyhow::Context`.
    if let Some(found) = err.downcast_ref::<T>().and_then(|link| visit(link)) {
        return Some(found);
    }

    // `anyhow::Error::from_boxed` hides the boxed error behind a wrapper that
    // only downcasts to the box, so its chain starts at the box contents.
    let head: &'a (dyn StdError + 'static) =
        match err.downcast_ref::<Box<dyn StdError + Send + Sync>>() {
            Some(boxed) => &**boxed,
            None => AsRef::<dyn StdError>::as_ref(err),
        };
    search_links::<T, _, _>(head, visit)
}

fn search_links<'a, T, R, F>(head: &'a (dyn StdError + 'static), visit: &mut F) -> Option<R>
where
    T: StdError + Send + Sync + 'static,
    F: FnMut(&'a T) -> Option<R>,
{
    let mut next = Some(head);
    while let Some(link) = next {
        if let Some(found) = link.downcast_ref::<T>().and_then(|link| visit(link)) {
            return Some(found);
        }
        if let Some(errs) = link.downcast_ref::<Errs>() {
            return search_all(errs, visit);
        }
        next = link.source();
    }
    None
}

fn search_all<'a, T, R, F>(errs: &'a Errs, visit: &mut F) -> Option<R>
where
    T: StdError + Send + Sync + 'static,
    F: FnMut(&'a T) -> Option<R>,
{
    errs.iter().find_map(|err| search(err, &mut *visit))
}
