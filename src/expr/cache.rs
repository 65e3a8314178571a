// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-node memoisation of results, keyed by request.

use std::{
    fmt::Display,
    sync::{Arc, Mutex, PoisonError},
};

use crossbeam_utils::atomic::AtomicCell;
use log::trace;

use super::EvalError;
use crate::Request;

/// The last result a node produced, and the key of the request it was
/// produced for. A cached result is only valid for that same request.
#[derive(Debug)]
pub(super) struct NodeCache<T> {
    slot: Mutex<Option<((u64, u64), Arc<T>)>>,
    num_evaluations: AtomicCell<usize>,
}

impl<T> Default for NodeCache<T> {
    fn default() -> Self {
        NodeCache {
            slot: Mutex::new(None),
            num_evaluations: AtomicCell::new(0),
        }
    }
}

impl<T> NodeCache<T> {
    /// Get the cached result for `request`, or run `evaluate` and cache its
    /// result. The slot stays locked while `evaluate` runs, so concurrent
    /// callers with the same request wait rather than evaluating again.
    ///
    /// `evaluate` must not (directly or indirectly) ask for this node's
    /// result; the graph being acyclic guarantees this.
    pub(super) fn get_or_evaluate(
        &self,
        node: impl Display,
        request: &Request,
        evaluate: impl FnOnce() -> Result<T, EvalError>,
    ) -> Result<Arc<T>, EvalError> {
        // A panic while evaluating leaves the slot as it was, which is still
        // a valid (if stale) cache entry.
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((key, result)) = slot.as_ref() {
            if *key == request.key() {
                trace!("{node}: cache hit for request {key:?}");
                return Ok(Arc::clone(result));
            }
        }

        trace!("{node}: evaluating for request {:?}", request.key());
        let result = Arc::new(evaluate()?);
        self.num_evaluations.fetch_add(1);
        *slot = Some((request.key(), Arc::clone(&result)));
        Ok(result)
    }

    pub(super) fn num_evaluations(&self) -> usize {
        self.num_evaluations.load()
    }
}
