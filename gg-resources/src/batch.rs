use std::fmt::{self, Debug};
use std::sync::Arc;

use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::event::{EventSenders, LoaderEvent};
use crate::{BatchHandle, LoadError, Request, Resource, ResourceRef};

pub(crate) type SuccessCallback = Box<dyn FnOnce(&Resources) + Send>;
pub(crate) type ErrorCallback = Box<dyn FnMut(&Errors, &Resources) + Send>;
pub(crate) type ProgressCallback = Box<dyn FnMut(f32) + Send>;

/// Opened resources of a batch, keyed by every identifier they were
/// requested under.
#[derive(Clone, Default)]
pub struct Resources {
    map: AHashMap<Arc<str>, ResourceRef>,
}

impl Resources {
    pub fn get<R: Resource>(&self, identifier: &str) -> Option<Arc<R>> {
        self.map.get(identifier).cloned()?.downcast_arc()
    }

    pub fn get_untyped(&self, identifier: &str) -> Option<&ResourceRef> {
        self.map.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.map.contains_key(identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.map.keys()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}

/// Load errors of a batch, keyed like [`Resources`].
#[derive(Clone, Debug, Default)]
pub struct Errors {
    map: AHashMap<Arc<str>, LoadError>,
}

impl Errors {
    pub fn get(&self, identifier: &str) -> Option<&LoadError> {
        self.map.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.map.contains_key(identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &LoadError)> + '_ {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Default)]
pub(crate) struct Callbacks {
    pub success: Option<SuccessCallback>,
    pub error: Option<ErrorCallback>,
    pub progress: Option<ProgressCallback>,
}

pub(crate) struct Batch {
    handle: BatchHandle,
    requests: Vec<Request>,
    count: usize,
    resources: Resources,
    errors: Errors,
    parent: Option<BatchHandle>,
    children: SmallVec<[BatchHandle; 2]>,
    priority: i32,
    completed: bool,
    errored: bool,
    callbacks: Callbacks,
}

impl Batch {
    pub fn new(
        handle: BatchHandle,
        requests: Vec<Request>,
        priority: i32,
        callbacks: Callbacks,
    ) -> Batch {
        Batch {
            handle,
            requests,
            count: 0,
            resources: Resources::default(),
            errors: Errors::default(),
            parent: None,
            children: SmallVec::new(),
            priority,
            completed: false,
            errored: false,
            callbacks,
        }
    }

    pub fn handle(&self) -> BatchHandle {
        self.handle
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    fn is_own_complete(&self) -> bool {
        self.count >= self.requests.len()
    }
}

impl Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("handle", &self.handle)
            .field("count", &self.count)
            .field("requests", &self.requests.len())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("completed", &self.completed)
            .field("errored", &self.errored)
            .finish_non_exhaustive()
    }
}

/// Every batch that is live or belongs to a live root.
///
/// A batch stops being live the moment it completes, but stays in the tree
/// until its root completes so ancestors can still read its counts.
#[derive(Debug, Default)]
pub(crate) struct BatchTree {
    nodes: AHashMap<BatchHandle, Batch>,
}

impl BatchTree {
    pub fn new() -> BatchTree {
        BatchTree::default()
    }

    pub fn insert(&mut self, mut batch: Batch, parent: Option<BatchHandle>) {
        if let Some(parent_handle) = parent {
            if let Some(parent) = self.nodes.get_mut(&parent_handle) {
                parent.children.push(batch.handle);
                batch.parent = Some(parent_handle);
                batch.priority = parent.priority;
            }
        }

        self.nodes.insert(batch.handle, batch);
    }

    pub fn get_live(&self, handle: BatchHandle) -> Option<&Batch> {
        self.nodes.get(&handle).filter(|batch| !batch.completed)
    }

    pub fn live(&self) -> impl Iterator<Item = &Batch> + '_ {
        self.nodes.values().filter(|batch| !batch.completed)
    }

    pub fn is_complete(&self, handle: BatchHandle) -> bool {
        let mut stack: SmallVec<[BatchHandle; 8]> = SmallVec::new();
        stack.push(handle);

        while let Some(handle) = stack.pop() {
            if let Some(batch) = self.nodes.get(&handle) {
                if !batch.is_own_complete() {
                    return false;
                }
                stack.extend(batch.children.iter().copied());
            }
        }

        true
    }

    /// Completed and requested counts summed over the whole subtree.
    fn totals(&self, handle: BatchHandle) -> (usize, usize) {
        let mut stack: SmallVec<[BatchHandle; 8]> = SmallVec::new();
        stack.push(handle);

        let (mut count, mut total) = (0, 0);
        while let Some(handle) = stack.pop() {
            if let Some(batch) = self.nodes.get(&handle) {
                count += batch.count;
                total += batch.requests.len();
                stack.extend(batch.children.iter().copied());
            }
        }

        (count, total)
    }

    pub fn progress(&self, handle: BatchHandle) -> f32 {
        match self.totals(handle) {
            (_, 0) => 1.0,
            (count, total) => count as f32 / total as f32,
        }
    }

    pub fn add_resource<'a>(
        &mut self,
        handle: BatchHandle,
        identifiers: impl Iterator<Item = &'a Arc<str>>,
        resource: ResourceRef,
        events: &EventSenders,
    ) {
        let batch = match self.nodes.get_mut(&handle) {
            Some(v) => v,
            None => return,
        };

        for identifier in identifiers {
            batch.resources.map.insert(identifier.clone(), resource.clone());
        }

        batch.count += 1;
        self.update(handle, events);
    }

    pub fn add_resource_error<'a>(
        &mut self,
        handle: BatchHandle,
        identifiers: impl Iterator<Item = &'a Arc<str>>,
        error: LoadError,
        events: &EventSenders,
    ) {
        let batch = match self.nodes.get_mut(&handle) {
            Some(v) => v,
            None => return,
        };

        for identifier in identifiers {
            batch.errors.map.insert(identifier.clone(), error.clone());
        }

        batch.errored = true;
        batch.count += 1;
        self.update(handle, events);
    }

    /// Reports progress and runs the completion protocol, walking up the
    /// parent chain while each completion may unblock the next ancestor.
    pub fn update(&mut self, handle: BatchHandle, events: &EventSenders) {
        let mut current = Some(handle);

        while let Some(handle) = current.take() {
            let progress = self.progress(handle);
            let batch = match self.nodes.get_mut(&handle) {
                Some(v) if !v.completed => v,
                _ => break,
            };

            if let Some(callback) = &mut batch.callbacks.progress {
                callback(progress);
            }
            events.send(LoaderEvent::BatchProgress {
                batch: handle,
                progress,
            });

            if !self.is_complete(handle) {
                break;
            }

            self.complete(handle, events);

            let parent = self.nodes.get(&handle).and_then(|batch| batch.parent);
            match parent {
                Some(parent) => {
                    if self.get_live(parent).is_some() {
                        current = Some(parent);
                    }
                }
                None => self.remove_subtree(handle),
            }
        }
    }

    fn complete(&mut self, handle: BatchHandle, events: &EventSenders) {
        let batch = match self.nodes.get_mut(&handle) {
            Some(v) => v,
            None => return,
        };

        batch.completed = true;
        let errored = batch.errored;
        let parent = batch.parent;

        trace!(batch = ?handle, errored, "batch complete");

        if !errored {
            if let Some(callback) = batch.callbacks.success.take() {
                callback(&batch.resources);
            }
        } else {
            if let Some(callback) = &mut batch.callbacks.error {
                callback(&batch.errors, &batch.resources);
            }

            if let Some(parent) = parent {
                self.notify_parent_error(parent, handle);
            }
        }

        events.send(LoaderEvent::BatchComplete {
            batch: handle,
            errored,
        });
    }

    /// Hands a failed child's errors to its parent's error callback. The
    /// parent's own state is left untouched.
    fn notify_parent_error(&mut self, parent: BatchHandle, child: BatchHandle) {
        let callback = self
            .nodes
            .get_mut(&parent)
            .and_then(|batch| batch.callbacks.error.take());

        let mut callback = match callback {
            Some(v) => v,
            None => return,
        };

        if let Some(child) = self.nodes.get(&child) {
            callback(&child.errors, &child.resources);
        }

        if let Some(batch) = self.nodes.get_mut(&parent) {
            batch.callbacks.error = Some(callback);
        }
    }

    /// Removes a live batch with all of its descendants. Returns the removed
    /// batches; the parent is re-evaluated since it no longer waits on them.
    pub fn cancel(&mut self, handle: BatchHandle, events: &EventSenders) -> Vec<Batch> {
        let parent = match self.get_live(handle) {
            Some(batch) => batch.parent,
            None => return Vec::new(),
        };

        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent.children.retain(|child| *child != handle);
        }

        let removed = self.take_subtree(handle);
        for batch in &removed {
            events.send(LoaderEvent::BatchCancelled(batch.handle));
        }

        if let Some(parent) = parent {
            self.update(parent, events);
        }

        removed
    }

    fn remove_subtree(&mut self, handle: BatchHandle) {
        self.take_subtree(handle);
    }

    fn take_subtree(&mut self, handle: BatchHandle) -> Vec<Batch> {
        let mut stack = vec![handle];
        let mut removed = Vec::new();

        while let Some(handle) = stack.pop() {
            if let Some(batch) = self.nodes.remove(&handle) {
                stack.extend(batch.children.iter().copied());
                removed.push(batch);
            }
        }

        removed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
