//! Coalesces concurrent requests for the same logical work into a single
//! in-flight call, then memoizes the settled result.
//!
//! The first caller for a previously-unseen key starts the caller-supplied
//! predicate and becomes the leader of that flight; every caller arriving
//! before the predicate settles joins the same flight as a waiter. At
//! settlement the result is fanned out to all attached callers in the order
//! they attached, and from then on the key replays that result forever. The
//! predicate runs at most once per key per [`Coalescer`].

mod controller;
mod registry;

pub mod coalescer;
pub mod key;
pub mod stats;


use std::pin::Pin;

use futures::Future;

pub type BoxFut<'a, O> = Pin<Box<dyn Future<Output = O> + Send + 'a>>;

pub use coalescer::{CoalesceError, Coalescer};
pub use key::{CallKey, KeyError};
pub use stats::CoalesceStats;
