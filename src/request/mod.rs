// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Evaluation requests, and the session that issues their ids.

#[cfg(test)]
mod tests;

use std::num::NonZeroUsize;

use crossbeam_utils::atomic::AtomicCell;
use log::trace;

use crate::Domain;

/// Each session gets a distinct id for the lifetime of the process.
static NEXT_SESSION_ID: AtomicCell<u64> = AtomicCell::new(0);

/// Issues request ids. Every [`Request`] made from the same session gets a
/// strictly larger id than the one before it; ids are never reused. Requests
/// from different sessions never compare equal, as each is tagged with its
/// session's id.
///
/// A session is safe to share between threads.
#[derive(Debug)]
pub struct EvalSession {
    session_id: u64,
    next_id: AtomicCell<u64>,
}

impl Default for EvalSession {
    fn default() -> Self {
        EvalSession {
            session_id: NEXT_SESSION_ID.fetch_add(1),
            next_id: AtomicCell::new(0),
        }
    }
}

impl EvalSession {
    pub fn new() -> EvalSession {
        EvalSession::default()
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// How many requests have been made from this session.
    pub fn num_requests(&self) -> u64 {
        self.next_id.load()
    }

    fn next_id(&self) -> u64 {
        let mut current = self.next_id.load();
        loop {
            let next = current
                .checked_add(1)
                .unwrap_or_else(|| panic!("Request ids have been exhausted; cannot continue"));
            match self.next_id.compare_exchange(current, next) {
                Ok(id) => return id,
                Err(actual) => current = actual,
            }
        }
    }
}

/// One evaluation pass over a [`Domain`]. The domain is divided into
/// `num_freqs` x `num_times` equally-sized cells; results vary over at most
/// that many cells.
///
/// Requests are deliberately not `Clone`; two requests are equal only if
/// they're the same request.
#[derive(Debug)]
pub struct Request {
    session_id: u64,
    id: u64,
    domain: Domain,
    num_freqs: usize,
    num_times: usize,
    eval_derivatives: bool,
}

impl Request {
    /// Create a request that evaluates over a single cell.
    pub fn new(session: &EvalSession, domain: Domain, eval_derivatives: bool) -> Request {
        Request::with_grid(
            session,
            domain,
            NonZeroUsize::MIN,
            NonZeroUsize::MIN,
            eval_derivatives,
        )
    }

    /// Create a request that evaluates over a grid of cells.
    pub fn with_grid(
        session: &EvalSession,
        domain: Domain,
        num_freqs: NonZeroUsize,
        num_times: NonZeroUsize,
        eval_derivatives: bool,
    ) -> Request {
        let id = session.next_id();
        trace!(
            "New request {id} of session {} ({} x {} cells, derivatives: {eval_derivatives}) over {domain}",
            session.session_id,
            num_freqs,
            num_times
        );
        Request {
            session_id: session.session_id,
            id,
            domain,
            num_freqs: num_freqs.get(),
            num_times: num_times.get(),
            eval_derivatives,
        }
    }

    /// The id of this request within its session.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The id of the session that made this request.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Identifies this request among all requests made by the process.
    pub fn key(&self) -> (u64, u64) {
        (self.session_id, self.id)
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn num_freqs(&self) -> usize {
        self.num_freqs
    }

    pub fn num_times(&self) -> usize {
        self.num_times
    }

    /// The shape of a value that varies over both axes.
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.num_freqs, self.num_times)
    }

    /// Are perturbed values (derivatives) wanted?
    pub fn eval_derivatives(&self) -> bool {
        self.eval_derivatives
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Request {}
