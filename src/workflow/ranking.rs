//! Display-rank assignment.
//!
//! Policy: ranks are dense. A new request gets `max + 1`; a delete renumbers
//! the survivors to `1..=N` in their previous order. The Postgres store
//! mirrors both steps in SQL.

use crate::models::ServiceRequest;

/// Rank for the next inserted request: `max(ranks, default 0) + 1`.
pub fn next_rank<I>(ranks: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    ranks.into_iter().max().unwrap_or(0) + 1
}

/// Sort by current rank (ties broken by id) and rewrite ranks as `1..=N`.
pub fn renumber(requests: &mut [ServiceRequest]) {
    sort_by_rank(requests);
    for (index, request) in requests.iter_mut().enumerate() {
        request.sort_order = index as i64 + 1;
    }
}

pub fn sort_by_rank(requests: &mut [ServiceRequest]) {
    requests.sort_by_key(|r| (r.sort_order, r.id));
}
