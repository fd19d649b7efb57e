//! Module containing the scheduling contract driven by the chunked executor.

use std::future::Future;
use std::task::Poll;
use std::time::{Duration, Instant};

use futures::future;

/// A slice budget, queried once before each item.
///
/// The executor calls `go_on()` immediately before consuming an item and
/// ends the current slice on the first `false`. A budget only ever shrinks;
/// fresh capacity arrives with the next grant, never by resetting an old
/// budget.
pub trait Budget {
    /// Whether the current slice may consume one more item.
    fn go_on(&mut self) -> bool;
}

/// Any `FnMut() -> bool` closure is a budget.
impl<F> Budget for F
where
    F: FnMut() -> bool,
{
    fn go_on(&mut self) -> bool {
        self()
    }
}

/// Budget that never runs out.
///
/// A slice granted with this budget consumes every remaining item.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl Budget for Unbounded {
    fn go_on(&mut self) -> bool {
        true
    }
}

/// Budget that admits a fixed number of items, then stops.
#[derive(Debug, Clone, Copy)]
pub struct ItemBudget {
    remaining: usize,
}

impl ItemBudget {
    pub fn new(items: usize) -> Self {
        Self { remaining: items }
    }
}

impl Budget for ItemBudget {
    fn go_on(&mut self) -> bool {
        match self.remaining {
            0 => false,
            _ => {
                self.remaining -= 1;
                true
            }
        }
    }
}

/// Budget that holds until a wall-clock allowance elapses.
///
/// This is the "is there still time left in this frame" policy: a host
/// granting 10ms slices hands out `TimeBudget::new(Duration::from_millis(10))`
/// with every grant. The clock starts when the budget is created, not when
/// the first item runs.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    deadline: Instant,
}

impl TimeBudget {
    pub fn new(allowance: Duration) -> Self {
        Self {
            deadline: Instant::now() + allowance,
        }
    }
}

impl Budget for TimeBudget {
    fn go_on(&mut self) -> bool {
        Instant::now() < self.deadline
    }
}

/// Grants execution slices to the chunked executor.
///
/// The executor requests one grant per slice by awaiting [`next_slice`].
/// That await is the executor's only suspension point: the implementation
/// decides when the returned future resolves (immediately, or after a timer
/// or idle callback) and what budget the slice gets. An implementation that
/// never resolves a grant leaves the executor's future pending; the host can
/// drop that future to abandon the remaining work.
///
/// A host pacing work against frame deadlines might look like this:
///
/// ```rust
/// use std::time::Duration;
/// use futures_pacer::scheduler::{Scheduler, TimeBudget};
///
/// struct FrameScheduler;
///
/// impl Scheduler for FrameScheduler {
///     type Budget = TimeBudget;
///
///     async fn next_slice(&mut self) -> TimeBudget {
///         // Wait out the current frame, then allow 4ms of work.
///         tokio::time::sleep(Duration::from_millis(12)).await;
///         TimeBudget::new(Duration::from_millis(4))
///     }
/// }
/// ```
///
/// [`next_slice`]: Scheduler::next_slice
pub trait Scheduler {
    /// Budget handed out with each grant.
    type Budget: Budget;

    /// Resolves when the next slice may run.
    fn next_slice(&mut self) -> impl Future<Output = Self::Budget>;
}

/// Scheduler that grants every slice immediately, with no budget limit.
///
/// Under this scheduler the executor degenerates to a plain loop: one slice,
/// no suspension. Useful in tests and wherever chunking is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Scheduler for Immediate {
    type Budget = Unbounded;

    fn next_slice(&mut self) -> impl Future<Output = Unbounded> {
        future::ready(Unbounded)
    }
}

/// Scheduler that yields to the async runtime between slices and grants a
/// fixed number of items per slice.
///
/// The single yield gives other tasks on the same runtime a chance to run
/// before the next slice starts. Hosts with a real timing policy should
/// implement [`Scheduler`] themselves; see the trait docs.
#[derive(Debug, Clone, Copy)]
pub struct EvenSlices {
    items_per_slice: usize,
}

impl EvenSlices {
    /// # Panics
    ///
    /// Panics if `items_per_slice` is 0.
    pub fn new(items_per_slice: usize) -> Self {
        assert!(
            items_per_slice > 0,
            "items_per_slice must be greater than 0"
        );
        Self { items_per_slice }
    }
}

impl Scheduler for EvenSlices {
    type Budget = ItemBudget;

    fn next_slice(&mut self) -> impl Future<Output = ItemBudget> {
        let mut grant = Some(ItemBudget::new(self.items_per_slice));
        let mut yielded = false;
        future::poll_fn(move |cx| {
            if !yielded {
                yielded = true;
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            Poll::Ready(grant.take().expect("slice grant polled after completion"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_budget_counts_down() {
        let mut budget = ItemBudget::new(2);
        assert!(budget.go_on());
        assert!(budget.go_on());
        assert!(!budget.go_on());
        assert!(!budget.go_on());
    }

    #[test]
    fn zero_item_budget_denies_immediately() {
        let mut budget = ItemBudget::new(0);
        assert!(!budget.go_on());
    }

    #[test]
    fn closures_act_as_budgets() {
        let mut left = 1;
        let mut budget = move || match left {
            0 => false,
            _ => {
                left -= 1;
                true
            }
        };
        assert!(budget.go_on());
        assert!(!budget.go_on());
    }

    #[test]
    fn spent_time_budget_denies() {
        let mut budget = TimeBudget::new(Duration::ZERO);
        assert!(!budget.go_on());
    }

    #[test]
    fn fresh_time_budget_allows() {
        let mut budget = TimeBudget::new(Duration::from_secs(3600));
        assert!(budget.go_on());
    }

    #[tokio::test]
    async fn immediate_grants_are_unbounded() {
        let mut budget = Immediate.next_slice().await;
        for _ in 0..64 {
            assert!(budget.go_on());
        }
    }

    #[tokio::test]
    async fn even_slices_grant_a_fixed_budget() {
        let mut scheduler = EvenSlices::new(3);
        let mut budget = scheduler.next_slice().await;
        assert!(budget.go_on());
        assert!(budget.go_on());
        assert!(budget.go_on());
        assert!(!budget.go_on());
    }

    #[test]
    #[should_panic(expected = "items_per_slice must be greater than 0")]
    fn zero_items_per_slice_panics() {
        let _ = EvenSlices::new(0);
    }
}
