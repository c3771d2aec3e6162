use std::collections::VecDeque;
use std::sync::Arc;

use ahash::AHashMap;

use crate::request::TrackedRequest;

/// Canonical identifiers waiting for dispatch, most urgent first.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    inner: VecDeque<Arc<str>>,
}

impl PendingQueue {
    pub fn new() -> PendingQueue {
        PendingQueue::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn push(&mut self, canonical: Arc<str>) {
        self.inner.push_back(canonical);
    }

    pub fn pop(&mut self) -> Option<Arc<str>> {
        self.inner.pop_front()
    }

    pub fn remove(&mut self, canonical: &str) -> bool {
        let len = self.inner.len();
        self.inner.retain(|v| &**v != canonical);
        self.inner.len() != len
    }

    /// Orders by priority, lower first, then by first-enqueue sequence.
    pub fn sort(&mut self, requests: &AHashMap<Arc<str>, TrackedRequest>) {
        let key = |canonical: &Arc<str>| {
            requests
                .get(canonical)
                .map(|request| (request.priority, request.sequence))
                .unwrap_or((i32::MAX, u64::MAX))
        };

        self.inner
            .make_contiguous()
            .sort_by(|a, b| key(a).cmp(&key(b)));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.inner.iter()
    }
}
