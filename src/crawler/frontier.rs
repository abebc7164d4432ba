//! Crawl frontier
//!
//! FIFO worklist of URLs waiting to be fetched. Each URL enters the queue at
//! most once per engine instance; the frontier is never persisted.

use std::collections::{HashSet, VecDeque};

/// Breadth-first queue of pending URLs
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    enqueued: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a frontier holding the seeds in configuration order
    pub fn seeded(seeds: &[String]) -> Self {
        let mut frontier = Self::new();
        for seed in seeds {
            frontier.push(seed.clone());
        }
        frontier
    }

    /// Adds a URL unless it was already enqueued; returns true if added
    pub fn push(&mut self, url: String) -> bool {
        if self.enqueued.contains(&url) {
            return false;
        }
        self.enqueued.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Removes the oldest pending URL
    pub fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of distinct URLs ever enqueued
    pub fn seen(&self) -> usize {
        self.enqueued.len()
    }
}
