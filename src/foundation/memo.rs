use std::sync::{Arc, OnceLock};

use crate::foundation::error::{AnimError, AnimResult};

/// Compute-once cell shared by every reader of a lazily produced value.
///
/// The first caller of [`Memo::get_or_compute`] runs the computation; concurrent callers block
/// until it finishes and then observe the same result. A failed computation is stored too and
/// every later reader receives a replica of the error.
pub(crate) struct Memo<T> {
    cell: OnceLock<Result<Arc<T>, AnimError>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Memo<T> {
    pub(crate) const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    pub(crate) fn get_or_compute<F>(&self, compute: F) -> AnimResult<Arc<T>>
    where
        F: FnOnce() -> AnimResult<T>,
    {
        Self::share(self.cell.get_or_init(|| compute().map(Arc::new)))
    }

    /// Finished result, if any; never blocks and never computes.
    pub(crate) fn peek(&self) -> Option<AnimResult<Arc<T>>> {
        self.cell.get().map(Self::share)
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    fn share(stored: &Result<Arc<T>, AnimError>) -> AnimResult<Arc<T>> {
        match stored {
            Ok(v) => Ok(Arc::clone(v)),
            Err(e) => Err(e.replicate()),
        }
    }
}

impl<T> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.cell.get() {
            None => "pending",
            Some(Ok(_)) => "done",
            Some(Err(_)) => "faulted",
        };
        f.debug_struct("Memo").field("state", &state).finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/memo.rs"]
mod tests;
