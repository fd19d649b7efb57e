//! Bounded-concurrency dispatch with results in submission order.

use std::future::Future;
use std::iter::Enumerate;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::pin_mut;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use pin_project::pin_project;

/// In-flight cap used when the caller does not pick one.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 3;

/// A future paired with the position its output must land in.
///
/// Resolves to `(index, output)`, so completion order can never lose track
/// of where a response belongs.
#[pin_project]
pub struct Indexed<F> {
    index: usize,
    #[pin]
    future: F,
}

impl<F> Indexed<F> {
    pub fn new(index: usize, future: F) -> Self {
        Self { index, future }
    }
}

impl<F> Future for Indexed<F>
where
    F: Future,
{
    type Output = (usize, F::Output);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.future.poll(cx) {
            Poll::Ready(output) => Poll::Ready((*this.index, output)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Self-replenishing pool of index-tagged futures.
///
/// Consumes an iterator of futures, keeps at most `max_in_flight` of them
/// running inside an inner `FuturesUnordered`, and pulls a replacement from
/// the iterator every time one completes. Because the iterator is consumed
/// lazily, a future is only created at the moment its slot opens.
///
/// As a [`Stream`], the pool yields `(index, output)` pairs in completion
/// order. The collectors [`dispatch`] and [`try_dispatch`] restore
/// submission order on top of it; use the pool directly when completion
/// order is what you want.
#[pin_project]
pub struct DispatchPool<T, F>
where
    T: Iterator<Item = F>,
    F: Future,
{
    max_in_flight: usize,
    pending: Enumerate<T>,
    #[pin]
    in_flight: FuturesUnordered<Indexed<F>>,
}

impl<T, F> DispatchPool<T, F>
where
    T: Iterator<Item = F>,
    F: Future,
{
    /// Creates a pool over `futures` with at most `max_in_flight` running.
    ///
    /// The first `min(max_in_flight, len)` futures are launched right away;
    /// the rest stay in the iterator until a completion opens their slot.
    ///
    /// Panics if `max_in_flight` is 0.
    /// ```rust
    /// use futures::StreamExt;
    /// use futures_pacer::dispatch::DispatchPool;
    ///
    /// async fn fetch(id: u64) -> u64 {
    ///     id * 10
    /// }
    ///
    /// let mut pool = DispatchPool::new(2, (0u64..5).map(fetch));
    /// // Two requests launched up front; the other three wait for a slot.
    /// tokio_test::block_on(async move {
    ///     assert_eq!(pool.in_flight(), 2);
    ///
    ///     while let Some((index, response)) = pool.next().await {
    ///         assert_eq!(response, index as u64 * 10);
    ///         assert!(pool.in_flight() <= 2);
    ///     }
    ///
    ///     assert_eq!(pool.in_flight(), 0);
    /// });
    /// ```
    pub fn new<I: IntoIterator<IntoIter = T>>(max_in_flight: usize, futures: I) -> Self {
        assert!(max_in_flight > 0, "max_in_flight must be greater than 0");
        let in_flight = FuturesUnordered::new();
        let mut pending = futures.into_iter().enumerate();
        // Fill every slot before the first poll.
        pending
            .by_ref()
            .take(max_in_flight)
            .for_each(|(index, future)| in_flight.push(Indexed::new(index, future)));

        Self {
            max_in_flight,
            pending,
            in_flight,
        }
    }

    /// Same as [`new`], with the cap left at [`DEFAULT_MAX_IN_FLIGHT`].
    ///
    /// [`new`]: DispatchPool::new
    pub fn with_default_limit<I: IntoIterator<IntoIter = T>>(futures: I) -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT, futures)
    }

    /// Changes the in-flight cap at runtime.
    ///
    /// A raised cap takes effect at the next completion, since the pool only
    /// launches from `poll_next`. A lowered cap drains naturally; running
    /// futures are not revoked.
    pub fn set_max_in_flight(&mut self, max_in_flight: usize) {
        self.max_in_flight = max_in_flight;
    }

    /// Number of futures currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl<T, F> Stream for DispatchPool<T, F>
where
    T: Iterator<Item = F>,
    F: Future,
{
    type Item = (usize, F::Output);

    /// Polls like the inner `FuturesUnordered`, except that each completion
    /// pulls pending futures until the pool is back at `max_in_flight`.
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        match this.in_flight.as_mut().poll_next(cx) {
            Poll::Ready(Some(done)) => {
                while this.in_flight.len() < *this.max_in_flight {
                    match this.pending.next() {
                        Some((index, future)) => this.in_flight.push(Indexed::new(index, future)),
                        None => break,
                    }
                }
                Poll::Ready(Some(done))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Issues every request with at most `max_in_flight` outstanding, resolving
/// to the responses in submission order.
///
/// `transport` runs once per descriptor, at the moment that request's slot
/// opens. Completion order decides when each response slot fills, never
/// where: position `i` of the returned `Vec` always holds the response to
/// request `i`, even when a later request finishes first.
///
/// An empty request list resolves immediately with an empty `Vec`.
///
/// Faults are whatever the transport's future yields. To collect failures
/// alongside successes, return `Result` from the transport; each outcome is
/// then recorded in its slot and counts toward completion. To abort on the
/// first failure instead, use [`try_dispatch`].
///
/// Panics if `max_in_flight` is 0.
/// ```rust
/// use futures_pacer::dispatch::{self, DEFAULT_MAX_IN_FLIGHT};
///
/// async fn fetch(url: &str) -> String {
///     format!("response from {url}")
/// }
///
/// let urls = vec!["a.example", "b.example", "c.example", "d.example"];
/// let responses =
///     tokio_test::block_on(dispatch::dispatch(urls, DEFAULT_MAX_IN_FLIGHT, fetch));
/// assert_eq!(responses[3], "response from d.example");
/// ```
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub async fn dispatch<I, T, F>(requests: I, max_in_flight: usize, transport: T) -> Vec<F::Output>
where
    I: IntoIterator,
    T: FnMut(I::Item) -> F,
    F: Future,
{
    let requests: Vec<_> = requests.into_iter().collect();
    let total = requests.len();
    if total == 0 {
        return Vec::new();
    }

    let pool = DispatchPool::new(max_in_flight, requests.into_iter().map(transport));
    pin_mut!(pool);

    let mut responses: Vec<Option<F::Output>> = Vec::with_capacity(total);
    responses.resize_with(total, || None);
    let mut finished = 0;
    while let Some((index, response)) = pool.next().await {
        responses[index] = Some(response);
        finished += 1;
        if finished == total {
            break;
        }
    }

    responses
        .into_iter()
        .map(|slot| slot.expect("every request completes exactly once"))
        .collect()
}

/// Fail-fast flavor of [`dispatch`] for fallible transports.
///
/// Resolves `Ok` with every response in submission order, or `Err` with the
/// first fault. On a fault, no further requests launch and everything still
/// in flight is dropped, along with the responses gathered so far.
///
/// Panics if `max_in_flight` is 0.
/// ```rust
/// use futures_pacer::dispatch;
///
/// async fn fetch(id: u32) -> Result<u32, String> {
///     match id {
///         2 => Err(format!("request {id} refused")),
///         _ => Ok(id),
///     }
/// }
///
/// let outcome = tokio_test::block_on(dispatch::try_dispatch(vec![0, 1, 2, 3], 2, fetch));
/// assert_eq!(outcome, Err("request 2 refused".to_string()));
/// ```
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub async fn try_dispatch<I, T, F, O, E>(
    requests: I,
    max_in_flight: usize,
    transport: T,
) -> Result<Vec<O>, E>
where
    I: IntoIterator,
    T: FnMut(I::Item) -> F,
    F: Future<Output = Result<O, E>>,
{
    let requests: Vec<_> = requests.into_iter().collect();
    let total = requests.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let pool = DispatchPool::new(max_in_flight, requests.into_iter().map(transport));
    pin_mut!(pool);

    let mut responses: Vec<Option<O>> = Vec::with_capacity(total);
    responses.resize_with(total, || None);
    let mut finished = 0;
    while let Some((index, response)) = pool.next().await {
        responses[index] = Some(response?);
        finished += 1;
        if finished == total {
            break;
        }
    }

    Ok(responses
        .into_iter()
        .map(|slot| slot.expect("every request completes exactly once"))
        .collect())
}
