//! Cooperative pacing primitives for hosts that cannot afford to block.
//!
//! A single-threaded host such as a UI event loop stops painting the moment
//! you hand it a six-digit loop or a burst of thousands of network calls.
//! This crate provides two small primitives that keep such a host responsive
//! without dragging in a full task system:
//!
//! - [`chunked::execute`] breaks a large unit of sequential work into
//!   slices. Between slices it yields to a host-supplied
//!   [`scheduler::Scheduler`], which decides when the next slice runs and how
//!   much budget it gets. Items are processed strictly in order and exactly
//!   once each, no matter how the host slices them.
//! - [`dispatch::dispatch`] issues many independent asynchronous requests
//!   with a hard cap on how many are in flight at once. Each completion
//!   immediately launches the next pending request, so the pool stays full
//!   until the request list runs dry, and the resolved `Vec` is always in
//!   submission order regardless of which request finished first.
//!
//! Neither primitive owns a runtime. The executor suspends only at the
//! scheduler boundary; the dispatcher polls its in-flight set from the single
//! task that awaits it, so all bookkeeping is plain owned state with no
//! locking.
//!
//! Two contract points worth knowing up front:
//!
//! - Dispatching an empty request list resolves immediately with an empty
//!   `Vec` rather than waiting on completions that can never arrive.
//! - Request faults never silently shrink the pool. Either encode them in
//!   the response type and collect them per slot ([`dispatch::dispatch`]),
//!   or use [`dispatch::try_dispatch`] to abort on the first failure and
//!   drop whatever is still in flight.
//!
//! Make sure to check out the docs for examples!
pub mod chunked;
pub mod dispatch;
pub mod scheduler;
