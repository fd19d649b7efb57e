//! Chunked execution of large sequential workloads.

use crate::scheduler::{Budget, Scheduler};

/// A normalized set of work items.
///
/// Built from either an explicit sequence or a bare repeat count. A count of
/// `n` behaves as a sequence of `n` items whose every element is `n`: the
/// handler runs `n` times and only the index varies per call. The repeat
/// form stores the value once instead of materializing `n` copies, which is
/// why handlers receive items by reference.
#[derive(Debug, Clone)]
pub enum Workload<T> {
    /// Explicit items, processed in order.
    Items(Vec<T>),
    /// The same value handed out `times` times.
    Repeat { value: T, times: usize },
}

impl<T> Workload<T> {
    /// Number of items in the workload.
    pub fn len(&self) -> usize {
        match self {
            Workload::Items(items) => items.len(),
            Workload::Repeat { times, .. } => *times,
        }
    }

    /// Whether the workload holds no items at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn item(&self, index: usize) -> &T {
        match self {
            Workload::Items(items) => &items[index],
            Workload::Repeat { value, .. } => value,
        }
    }
}

impl From<usize> for Workload<usize> {
    fn from(count: usize) -> Self {
        Workload::Repeat {
            value: count,
            times: count,
        }
    }
}

impl<T> From<Vec<T>> for Workload<T> {
    fn from(items: Vec<T>) -> Self {
        Workload::Items(items)
    }
}

/// Processes a workload slice by slice, yielding to `scheduler` in between.
///
/// One grant is requested per slice. Within a slice, items are consumed
/// while the granted budget's `go_on()` holds; once it stops holding, the
/// executor awaits the next grant, and that await is where control returns
/// to the host. Items reach `handler` exactly once each and in ascending
/// index order, with at most one invocation running at a time. How generous
/// the slices are never changes what runs, only when.
///
/// An empty workload returns without consulting the scheduler at all.
///
/// The returned future completes once the last item has been processed. If
/// the scheduler stops resolving grants, the future stays pending; dropping
/// it abandons the remaining items. A panic in `handler` unwinds through
/// this future and no further items run in this call.
///
/// ```rust
/// use futures_pacer::chunked;
/// use futures_pacer::scheduler::EvenSlices;
///
/// let mut seen = Vec::new();
/// let mut scheduler = EvenSlices::new(2);
/// tokio_test::block_on(chunked::execute(
///     vec!["a", "b", "c"],
///     |item, index| seen.push((*item, index)),
///     &mut scheduler,
/// ));
/// assert_eq!(seen, vec![("a", 0), ("b", 1), ("c", 2)]);
/// ```
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub async fn execute<T, H, S>(work: impl Into<Workload<T>>, mut handler: H, scheduler: &mut S)
where
    H: FnMut(&T, usize),
    S: Scheduler,
{
    let work = work.into();
    if work.is_empty() {
        return;
    }

    let mut cursor = 0;
    while cursor < work.len() {
        let mut budget = scheduler.next_slice().await;
        while budget.go_on() && cursor < work.len() {
            handler(work.item(cursor), cursor);
            cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use futures::future;

    use crate::scheduler::{EvenSlices, Immediate, ItemBudget};

    use super::*;

    /// Scheduler that counts grants and hands out a fixed item budget.
    struct CountedGrants {
        grants: usize,
        items_per_slice: usize,
    }

    impl CountedGrants {
        fn new(items_per_slice: usize) -> Self {
            Self {
                grants: 0,
                items_per_slice,
            }
        }
    }

    impl Scheduler for CountedGrants {
        type Budget = ItemBudget;

        fn next_slice(&mut self) -> impl Future<Output = ItemBudget> {
            self.grants += 1;
            future::ready(ItemBudget::new(self.items_per_slice))
        }
    }

    #[tokio::test]
    async fn count_input_repeats_the_count() {
        let mut calls = Vec::new();
        execute(7usize, |item, index| calls.push((*item, index)), &mut Immediate).await;

        assert_eq!(calls.len(), 7);
        for (index, call) in calls.iter().enumerate() {
            assert_eq!(*call, (7, index));
        }
    }

    #[tokio::test]
    async fn explicit_items_visit_in_order() {
        let mut calls = Vec::new();
        execute(
            vec!["a", "b", "c", "d"],
            |item, index| calls.push((*item, index)),
            &mut Immediate,
        )
        .await;

        assert_eq!(calls, vec![("a", 0), ("b", 1), ("c", 2), ("d", 3)]);
    }

    #[tokio::test]
    async fn empty_workloads_never_touch_the_scheduler() {
        let mut scheduler = CountedGrants::new(1);
        let mut calls = 0;

        execute(0usize, |_: &usize, _| calls += 1, &mut scheduler).await;
        execute(Vec::<u8>::new(), |_, _| calls += 1, &mut scheduler).await;

        assert_eq!(calls, 0);
        assert_eq!(scheduler.grants, 0);
    }

    #[tokio::test]
    async fn unbounded_budget_finishes_in_one_slice() {
        let mut scheduler = CountedGrants::new(usize::MAX);
        let mut calls = 0;

        execute(1000usize, |_, _| calls += 1, &mut scheduler).await;

        assert_eq!(calls, 1000);
        assert_eq!(scheduler.grants, 1);
    }

    #[tokio::test]
    async fn single_item_budget_takes_one_item_per_slice() {
        let mut scheduler = CountedGrants::new(1);
        let mut calls = Vec::new();

        execute(
            vec![10, 20, 30],
            |item, index| calls.push((*item, index)),
            &mut scheduler,
        )
        .await;

        assert_eq!(calls, vec![(10, 0), (20, 1), (30, 2)]);
        // One grant per item; no extra grant once the cursor hits the end.
        assert_eq!(scheduler.grants, 3);
    }

    #[tokio::test]
    async fn slice_count_rounds_up() {
        let mut scheduler = CountedGrants::new(2);
        let mut calls = 0;

        execute(5usize, |_, _| calls += 1, &mut scheduler).await;

        assert_eq!(calls, 5);
        assert_eq!(scheduler.grants, 3);
    }

    #[tokio::test]
    async fn even_slices_drive_a_workload_to_completion() {
        let mut scheduler = EvenSlices::new(8);
        let mut calls = 0;

        execute(100usize, |_, _| calls += 1, &mut scheduler).await;

        assert_eq!(calls, 100);
    }
}
