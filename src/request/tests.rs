// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use rayon::prelude::*;

use super::*;

fn domain() -> Domain {
    Domain::new(0.0, 1.0, 0.0, 10.0).unwrap()
}

#[test]
fn test_ids_start_at_zero_and_increase() {
    let session = EvalSession::new();
    let r1 = Request::new(&session, domain(), false);
    let r2 = Request::new(&session, domain(), true);
    assert_eq!(r1.id(), 0);
    assert_eq!(r2.id(), 1);
    assert_ne!(r1, r2);
    assert_eq!(session.num_requests(), 2);
}

#[test]
fn test_requests_from_different_sessions_differ() {
    let s1 = EvalSession::new();
    let s2 = EvalSession::new();
    assert_ne!(s1.session_id(), s2.session_id());
    let r1 = Request::new(&s1, domain(), false);
    let r2 = Request::new(&s2, domain(), false);
    // Each session counts its own requests...
    assert_eq!(r1.id(), 0);
    assert_eq!(r2.id(), 0);
    // ...but the requests are still distinct.
    assert_ne!(r1, r2);
    assert_ne!(r1.key(), r2.key());
}

#[test]
fn test_ids_are_unique_across_threads() {
    let session = EvalSession::new();
    let ids: HashSet<u64> = (0..1000)
        .into_par_iter()
        .map(|_| Request::new(&session, domain(), false).id())
        .collect();
    assert_eq!(ids.len(), 1000);
    assert_eq!(session.num_requests(), 1000);
}

#[test]
fn test_grid() {
    let session = EvalSession::new();
    let r = Request::with_grid(
        &session,
        domain(),
        NonZeroUsize::new(4).unwrap(),
        NonZeroUsize::new(3).unwrap(),
        true,
    );
    assert_eq!(r.grid_shape(), (4, 3));
    assert!(r.eval_derivatives());

    let r = Request::new(&session, domain(), false);
    assert_eq!(r.grid_shape(), (1, 1));
    assert!(!r.eval_derivatives());
}
