//! Shared work queue for crawl workers
//!
//! The frontier is a FIFO of [`CrawlTarget`]s that any number of workers pull
//! from and push to. A worker that finds the queue empty parks until either
//! new work arrives or the last in-flight target finishes; the crawl is over
//! once the queue is empty and nothing is in flight.

use crate::url::PageLabel;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// A URL queued for fetching, with the label that selects its handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// The URL to fetch
    pub url: String,

    /// Handler selector
    pub label: PageLabel,
}

impl CrawlTarget {
    pub fn new(url: impl Into<String>, label: PageLabel) -> Self {
        Self {
            url: url.into(),
            label,
        }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<CrawlTarget>,

    /// Targets handed out and not yet finished
    in_flight: usize,

    /// Set once the crawl is over; no further targets are handed out
    closed: bool,
}

/// MPMC frontier with in-flight tracking
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    /// Creates a frontier holding the seeds in order
    pub fn new(seeds: impl IntoIterator<Item = CrawlTarget>) -> Self {
        Self {
            state: Mutex::new(FrontierState {
                queue: seeds.into_iter().collect(),
                ..FrontierState::default()
            }),
            notify: Notify::new(),
        }
    }

    /// Queues a target; returns false if the frontier is closed
    pub fn push(&self, target: CrawlTarget) -> bool {
        {
            let mut state = self.lock();
            if state.closed {
                return false;
            }
            state.queue.push_back(target);
        }
        self.notify.notify_one();
        true
    }

    /// Discards pending targets and releases every parked worker
    ///
    /// Targets already in flight run to completion.
    pub fn close(&self) {
        {
            let mut state = self.lock();
            state.closed = true;
            state.queue.clear();
        }
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued targets
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of targets handed out and not yet finished
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Takes the next target, waiting while other workers may still add some
    ///
    /// Returns None once the frontier is closed, or drained with nothing in
    /// flight. The returned guard counts as in flight until dropped.
    pub async fn next(&self) -> Option<InFlight<'_>> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking, so a push between the check and the
            // await still wakes us
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(target) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(InFlight {
                        frontier: self,
                        target,
                    });
                }
                if state.in_flight == 0 {
                    state.closed = true;
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    fn finish_one(&self) {
        let drained = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0 && state.queue.is_empty()
        };
        if drained {
            self.notify.notify_waiters();
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A target being worked on; finishing it is signalled by dropping the guard
#[derive(Debug)]
pub struct InFlight<'a> {
    frontier: &'a Frontier,
    target: CrawlTarget,
}

impl InFlight<'_> {
    pub fn target(&self) -> &CrawlTarget {
        &self.target
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.frontier.finish_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn target(path: &str) -> CrawlTarget {
        CrawlTarget::new(format!("https://sdbullion.com/{}", path), PageLabel::Category)
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let frontier = Frontier::new(vec![target("a"), target("b")]);
        let first = frontier.next().await.unwrap();
        assert_eq!(first.target().url, "https://sdbullion.com/a");
        drop(first);
        let second = frontier.next().await.unwrap();
        assert_eq!(second.target().url, "https://sdbullion.com/b");
    }

    #[tokio::test]
    async fn test_empty_frontier_ends_immediately() {
        let frontier = Frontier::new(Vec::new());
        assert!(frontier.next().await.is_none());
        assert!(frontier.is_closed());
    }

    #[tokio::test]
    async fn test_drained_with_nothing_in_flight_ends() {
        let frontier = Frontier::new(vec![target("a")]);
        let guard = frontier.next().await.unwrap();
        assert_eq!(frontier.in_flight(), 1);
        drop(guard);
        assert_eq!(frontier.in_flight(), 0);
        assert!(frontier.next().await.is_none());
    }

    #[tokio::test]
    async fn test_waiting_worker_receives_pushed_target() {
        let frontier = Arc::new(Frontier::new(vec![target("a")]));
        let guard = frontier.next().await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move {
                frontier
                    .next()
                    .await
                    .map(|in_flight| in_flight.target().url.clone())
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(frontier.push(target("a?p=2")));
        drop(guard);

        let received = waiter.await.unwrap();
        assert_eq!(received.as_deref(), Some("https://sdbullion.com/a?p=2"));
    }

    #[tokio::test]
    async fn test_waiting_worker_released_when_last_target_finishes() {
        let frontier = Arc::new(Frontier::new(vec![target("a")]));
        let guard = frontier.next().await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.next().await.is_none() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_close_discards_pending() {
        let frontier = Frontier::new(vec![target("a"), target("b")]);
        frontier.close();
        assert!(frontier.is_empty());
        assert!(!frontier.push(target("c")));
        assert!(frontier.next().await.is_none());
    }
}
