//! Frontier: the set-based work queue of URLs to visit
//!
//! This module handles:
//! - Idempotent enqueueing keyed by canonical URL
//! - Draining batches in discovery (FIFO) order
//! - Membership tracking for discovered, in-flight, visited and failed URLs
//!
//! The frontier is plain owned state; the coordinator wraps it in a mutex and
//! never holds that mutex across a network call.

use crate::state::{CrawlTarget, UrlState};
use std::collections::{HashSet, VecDeque};

/// URL frontier with lifecycle tracking
///
/// Invariants:
/// - a URL is in at most one of `discovered`, `in_flight`, `visited`
/// - `failed` is a subset of `visited`
/// - once visited, a URL is never handed out again
#[derive(Debug, Default)]
pub struct Frontier {
    /// Discovered targets in FIFO order
    queue: VecDeque<CrawlTarget>,
    discovered: HashSet<String>,
    in_flight: HashSet<String>,
    visited: HashSet<String>,
    failed: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds targets that are not already known
    ///
    /// URLs already discovered, in flight or visited are silently ignored.
    /// Returns the number of targets actually added.
    pub fn enqueue<I>(&mut self, targets: I) -> usize
    where
        I: IntoIterator<Item = CrawlTarget>,
    {
        let mut added = 0;

        for target in targets {
            let key = target.key();
            if let Some(state) = self.state_of(key) {
                tracing::trace!("Ignoring {} ({})", key, state);
                continue;
            }

            tracing::trace!("Discovered {} ({})", key, target.role);
            self.discovered.insert(key.to_string());
            self.queue.push_back(target);
            added += 1;
        }

        added
    }

    /// Removes and returns up to `max` discovered targets, marking them in flight
    pub fn drain_batch(&mut self, max: usize) -> Vec<CrawlTarget> {
        let take = max.min(self.queue.len());
        let batch: Vec<CrawlTarget> = self.queue.drain(..take).collect();

        for target in &batch {
            self.discovered.remove(target.key());
            self.in_flight.insert(target.key().to_string());
        }

        batch
    }

    /// Records a completed fetch
    pub fn mark_visited(&mut self, url: &str) {
        self.retire(url);
    }

    /// Records a fetch that failed after retries; failed URLs also count as visited
    pub fn mark_failed(&mut self, url: &str) {
        self.retire(url);
        self.failed.insert(url.to_string());
    }

    fn retire(&mut self, url: &str) {
        self.in_flight.remove(url);
        if self.discovered.remove(url) {
            self.queue.retain(|t| t.key() != url);
        }
        self.visited.insert(url.to_string());
    }

    /// Loads URLs known from the corpus or a previous run as visited
    pub fn preload_visited<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        for url in urls {
            self.retire(&url);
        }
    }

    /// Loads URLs that failed in a previous run
    pub fn preload_failed<I>(&mut self, urls: I)
    where
        I: IntoIterator<Item = String>,
    {
        for url in urls {
            self.mark_failed(&url);
        }
    }

    /// Where a URL currently is, or None if it is unknown
    pub fn state_of(&self, url: &str) -> Option<UrlState> {
        if self.failed.contains(url) {
            Some(UrlState::Failed)
        } else if self.visited.contains(url) {
            Some(UrlState::Visited)
        } else if self.in_flight.contains(url) {
            Some(UrlState::InFlight)
        } else if self.discovered.contains(url) {
            Some(UrlState::Discovered)
        } else {
            None
        }
    }

    /// URLs handed out but not yet marked visited or failed
    pub fn in_flight_urls(&self) -> Vec<String> {
        self.in_flight.iter().cloned().collect()
    }

    /// Visited URLs, sorted, for the crawl cache
    pub fn visited_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.visited.iter().cloned().collect();
        urls.sort();
        urls
    }

    /// Failed URLs, sorted, for the crawl cache
    pub fn failed_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.failed.iter().cloned().collect();
        urls.sort();
        urls
    }

    pub fn discovered_len(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn failed_len(&self) -> usize {
        self.failed.len()
    }

    /// Returns whether no URL is waiting to be fetched
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TargetRole;
    use url::Url;

    fn target(path: &str) -> CrawlTarget {
        let url = Url::parse(&format!("https://blog.example.com{}", path)).unwrap();
        CrawlTarget::new(url, TargetRole::Pagination)
    }

    fn key(path: &str) -> String {
        format!("https://blog.example.com{}", path)
    }

    #[test]
    fn test_new_frontier() {
        let frontier = Frontier::new();
        assert!(frontier.is_empty());
        assert_eq!(frontier.visited_len(), 0);
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut frontier = Frontier::new();
        assert_eq!(frontier.enqueue(vec![target("/a"), target("/b")]), 2);
        assert_eq!(frontier.enqueue(vec![target("/a"), target("/c")]), 1);
        assert_eq!(frontier.discovered_len(), 3);
    }

    #[test]
    fn test_drain_batch_fifo_and_in_flight() {
        let mut frontier = Frontier::new();
        frontier.enqueue(vec![target("/1"), target("/2"), target("/3")]);

        let batch = frontier.drain_batch(2);
        let keys: Vec<&str> = batch.iter().map(|t| t.key()).collect();
        assert_eq!(keys, vec![key("/1"), key("/2")]);
        assert_eq!(frontier.state_of(&key("/1")), Some(UrlState::InFlight));
        assert_eq!(frontier.discovered_len(), 1);

        // In-flight URLs cannot be re-enqueued or drained again
        assert_eq!(frontier.enqueue(vec![target("/1")]), 0);
        let rest = frontier.drain_batch(10);
        assert_eq!(rest.len(), 1);
        assert!(frontier.drain_batch(10).is_empty());
    }

    #[test]
    fn test_visited_urls_never_rediscovered() {
        let mut frontier = Frontier::new();
        frontier.enqueue(vec![target("/a")]);
        frontier.drain_batch(1);
        frontier.mark_visited(&key("/a"));

        assert_eq!(frontier.enqueue(vec![target("/a")]), 0);
        assert_eq!(frontier.state_of(&key("/a")), Some(UrlState::Visited));
        assert!(frontier.in_flight_urls().is_empty());
    }

    #[test]
    fn test_failed_is_subset_of_visited() {
        let mut frontier = Frontier::new();
        frontier.enqueue(vec![target("/gone")]);
        frontier.drain_batch(1);
        frontier.mark_failed(&key("/gone"));

        assert_eq!(frontier.state_of(&key("/gone")), Some(UrlState::Failed));
        assert_eq!(frontier.failed_len(), 1);
        assert_eq!(frontier.visited_len(), 1);
        assert_eq!(frontier.enqueue(vec![target("/gone")]), 0);
    }

    #[test]
    fn test_preload_visited_blocks_enqueue() {
        let mut frontier = Frontier::new();
        frontier.preload_visited(vec![key("/old")]);

        assert_eq!(frontier.enqueue(vec![target("/old"), target("/new")]), 1);
        assert_eq!(frontier.drain_batch(10)[0].key(), key("/new"));
    }

    #[test]
    fn test_preload_removes_pending_entry() {
        let mut frontier = Frontier::new();
        frontier.enqueue(vec![target("/a"), target("/b")]);
        frontier.preload_visited(vec![key("/a")]);

        assert_eq!(frontier.discovered_len(), 1);
        assert_eq!(frontier.state_of(&key("/a")), Some(UrlState::Visited));
    }

    #[test]
    fn test_preload_failed() {
        let mut frontier = Frontier::new();
        frontier.preload_failed(vec![key("/x")]);

        assert_eq!(frontier.failed_urls(), vec![key("/x")]);
        assert_eq!(frontier.visited_urls(), vec![key("/x")]);
    }

    #[test]
    fn test_sets_stay_disjoint() {
        let mut frontier = Frontier::new();
        let targets: Vec<CrawlTarget> = (0..20).map(|i| target(&format!("/p{}", i))).collect();
        frontier.enqueue(targets.clone());

        let batch = frontier.drain_batch(8);
        for (i, t) in batch.iter().enumerate() {
            if i % 2 == 0 {
                frontier.mark_visited(t.key());
            } else {
                frontier.mark_failed(t.key());
            }
        }
        frontier.enqueue(targets);

        for i in 0..20 {
            let k = key(&format!("/p{}", i));
            let states = [
                frontier.discovered.contains(&k),
                frontier.in_flight.contains(&k),
                frontier.visited.contains(&k),
            ];
            assert_eq!(states.iter().filter(|s| **s).count(), 1, "{}", k);
        }
        assert_eq!(frontier.visited_len(), 8);
        assert_eq!(frontier.discovered_len(), 12);
    }
}
