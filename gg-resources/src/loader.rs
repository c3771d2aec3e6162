use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::{AHashMap, AHashSet};
use eyre::{eyre, Result};
use tokio::runtime::Runtime;
use tracing::{trace, warn};

use crate::batch::{Batch, BatchTree};
use crate::command::{new_command_channel, CommandReceiver, CommandSender};
use crate::event::{EventReceiver, EventSenders, LoaderEvent};
use crate::handle_allocator::HandleAllocator;
use crate::handler::HandlerObject;
use crate::handlers::HandlerRegistry;
use crate::queue::PendingQueue;
use crate::request::TrackedRequest;
use crate::task::{build_runtime, Task};
use crate::{
    BatchHandle, HashRegistry, LoadCtx, LoadError, LoaderConfig, Request, Resource, ResourceCache,
    ResourceHandler, ResourceRef, ResourceType, Source, SubmitError, Submission, Submitter,
};

/// Schedules resource requests: deduplicates them by canonical identifier,
/// dispatches them to handlers in priority order under a concurrency
/// ceiling and reports results to the batches that asked for them.
///
/// All state is owned here and only mutated on the thread that owns the
/// loader. Handler pipelines run on a private runtime; their results are
/// applied by [`maintain`](Self::maintain).
pub struct ResourceLoader {
    config: LoaderConfig,
    source: Arc<dyn Source>,
    handlers: HandlerRegistry,
    cache: ResourceCache,
    batches: BatchTree,
    requests: AHashMap<Arc<str>, TrackedRequest>,
    pending: PendingQueue,
    loading: AHashSet<Arc<str>>,
    sequence: u64,
    events: EventSenders,
    handle_allocator: Arc<HandleAllocator>,
    command_sender: CommandSender,
    command_receiver: CommandReceiver,
    runtime: Runtime,
}

impl ResourceLoader {
    pub fn new<S: Source>(source: S) -> Result<ResourceLoader> {
        Self::with_config(source, LoaderConfig::default())
    }

    pub fn with_config<S: Source>(source: S, config: LoaderConfig) -> Result<ResourceLoader> {
        Self::new_from_dyn(Arc::new(source), config)
    }

    fn new_from_dyn(source: Arc<dyn Source>, config: LoaderConfig) -> Result<ResourceLoader> {
        let runtime = build_runtime(config.worker_threads)?;
        let (command_sender, command_receiver) = new_command_channel();

        Ok(ResourceLoader {
            config,
            source,
            handlers: HandlerRegistry::new(),
            cache: ResourceCache::new(),
            batches: BatchTree::new(),
            requests: AHashMap::new(),
            pending: PendingQueue::new(),
            loading: AHashSet::new(),
            sequence: 1,
            events: EventSenders::new(),
            handle_allocator: Arc::new(HandleAllocator::new()),
            command_sender,
            command_receiver,
            runtime,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn register_handler<H: ResourceHandler>(&mut self, handler: H) {
        let handler = HandlerObject::new(handler);
        trace!(ty = ?handler.ty(), handler = handler.handler_name(), "register handler");

        if let Some(old) = self.handlers.insert(handler) {
            warn!(ty = ?old.ty(), old = old.handler_name(), "replaced resource handler");
        }
    }

    pub fn has_handler<R: Resource>(&self) -> bool {
        self.handlers.contains(ResourceType::of::<R>())
    }

    pub fn register_hash(&mut self, hash: &str, identifier: &str) {
        self.cache.registry_mut().register_hash(hash, identifier);
    }

    pub fn hash_registry(&self) -> &HashRegistry {
        self.cache.registry()
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn subscribe(&mut self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn submitter(&self) -> Submitter {
        Submitter::new(self.command_sender.clone(), self.handle_allocator.clone())
    }

    /// Submits a batch and returns its handle.
    ///
    /// Requests already cached complete before this returns, so callbacks
    /// may run from inside `submit`.
    pub fn submit(&mut self, submission: Submission) -> Result<BatchHandle, SubmitError> {
        let handle = self.handle_allocator.alloc();
        self.submit_with_handle(handle, submission)?;
        Ok(handle)
    }

    pub(crate) fn submit_with_handle(
        &mut self,
        handle: BatchHandle,
        submission: Submission,
    ) -> Result<(), SubmitError> {
        let Submission {
            requests,
            priority,
            parent,
            callbacks,
        } = submission;

        let priority = match parent {
            Some(parent) => match self.batches.get_live(parent) {
                Some(parent) => parent.priority(),
                None => return Err(SubmitError::UnknownBatch(parent)),
            },
            None => priority.unwrap_or(self.config.default_priority),
        };

        if let Some(request) = requests.iter().find(|v| !self.handlers.contains(v.ty())) {
            return Err(SubmitError::NoHandlerForType(request.ty().name()));
        }

        for request in &requests {
            self.enqueue(request, priority, handle);
        }
        self.pending.sort(&self.requests);

        trace!(batch = ?handle, parent = ?parent, priority, requests = requests.len(), "new batch");

        let is_empty = requests.is_empty();
        self.batches
            .insert(Batch::new(handle, requests, priority, callbacks), parent);
        self.events.send(LoaderEvent::NewBatch(handle));

        self.dispatch();

        if is_empty {
            self.batches.update(handle, &self.events);
        }

        Ok(())
    }

    fn enqueue(&mut self, request: &Request, priority: i32, batch: BatchHandle) {
        let canonical = self
            .cache
            .registry()
            .get_canonical_identifier(request.identifier());

        if let Some(tracked) = self.requests.get_mut(&canonical) {
            tracked.merge(request, priority, batch);
            return;
        }

        let sequence = self.sequence;
        self.sequence += 1;

        let tracked = TrackedRequest::new(request, canonical.clone(), priority, sequence, batch);
        self.requests.insert(canonical.clone(), tracked);
        self.pending.push(canonical);
    }

    /// Removes the batch, and every batch below it, from all requests.
    /// Requests no other batch is waiting for are dropped if they are still
    /// pending; loads already handed to a handler run to completion.
    pub fn cancel(&mut self, handle: BatchHandle) -> bool {
        let removed = self.batches.cancel(handle, &self.events);
        if removed.is_empty() {
            return false;
        }

        let handles: AHashSet<BatchHandle> = removed.iter().map(|batch| batch.handle()).collect();

        let mut orphaned = Vec::new();
        for (canonical, tracked) in self.requests.iter_mut() {
            tracked.batches.retain(|batch| !handles.contains(&*batch));
            if tracked.batches.is_empty() && !self.loading.contains(canonical) {
                orphaned.push(canonical.clone());
            }
        }

        for canonical in orphaned {
            self.requests.remove(&canonical);
            self.pending.remove(&canonical);
        }

        trace!(batch = ?handle, cancelled = handles.len(), "batch cancelled");
        true
    }

    /// Mean progress of every live batch, 1.0 when nothing is live.
    pub fn get_progress(&self) -> f32 {
        let (sum, count) = self
            .batches
            .live()
            .fold((0.0, 0usize), |(sum, count), batch| {
                (sum + self.batches.progress(batch.handle()), count + 1)
            });

        if count == 0 {
            1.0
        } else {
            sum / count as f32
        }
    }

    pub fn batch_progress(&self, handle: BatchHandle) -> Option<f32> {
        self.batches.get_live(handle)?;
        Some(self.batches.progress(handle))
    }

    pub fn is_live(&self, handle: BatchHandle) -> bool {
        self.batches.get_live(handle).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn loading_count(&self) -> usize {
        self.loading.len()
    }

    /// Canonical identifiers in dispatch order.
    pub fn pending(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.pending.iter()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.loading.is_empty()
    }

    /// Runs the handler's `open` on caller supplied data, bypassing the
    /// queues and the cache.
    pub fn open<R, D>(&self, data: D) -> Result<Arc<R>>
    where
        R: Resource,
        D: Send + 'static,
    {
        let ty = ResourceType::of::<R>();
        let handler = self
            .handlers
            .get(ty)
            .ok_or(SubmitError::NoHandlerForType(ty.name()))?;

        handler
            .open(Box::new(data))?
            .downcast_arc()
            .ok_or_else(|| eyre!("{} opened a resource of another type", handler.handler_name()))
    }

    /// Applies every result and deferred submission received so far.
    pub fn maintain(&mut self) -> usize {
        let mut count = 0;
        while let Some(command) = self.command_receiver.try_recv() {
            command.execute(self);
            count += 1;
        }
        count
    }

    /// Like [`maintain`](Self::maintain), but first waits up to `timeout` for
    /// something to arrive.
    pub fn maintain_blocking(&mut self, timeout: Duration) -> usize {
        match self.command_receiver.recv_timeout(timeout) {
            Some(command) => {
                command.execute(self);
                1 + self.maintain()
            }
            None => 0,
        }
    }

    /// Keeps maintaining until nothing is pending or in flight. Returns
    /// `false` if `timeout` elapsed first.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            self.maintain();
            if self.is_idle() {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            self.maintain_blocking(deadline - now);
        }
    }

    /// Pulls pending requests while below the concurrency ceiling. Cache
    /// hits complete immediately, misses are handed to their handler.
    fn dispatch(&mut self) {
        while self.loading.len() < self.config.max_concurrent_requests {
            let canonical = match self.pending.pop() {
                Some(v) => v,
                None => break,
            };

            let tracked = match self.requests.get(&canonical) {
                Some(v) => v,
                None => continue,
            };

            self.loading.insert(canonical.clone());
            self.events.send(LoaderEvent::Loading {
                identifier: canonical.clone(),
                priority: tracked.priority,
            });

            if let Some(resource) = self.cache.get(&canonical) {
                trace!(identifier = %canonical, "cache hit");
                let resource = resource.clone();
                self.apply_result(&canonical, Ok(resource));
                continue;
            }

            let handler = match self.handlers.get(tracked.ty) {
                Some(v) => v.clone(),
                None => {
                    let error = eyre!("missing handler for type: {}", tracked.ty.name());
                    self.apply_result(&canonical, Err(error.into()));
                    continue;
                }
            };

            trace!(identifier = %canonical, priority = tracked.priority, "dispatch");

            let ctx = LoadCtx::new(
                self.source.clone(),
                self.submitter(),
                tracked.batches[0],
                tracked.priority,
            );

            let task = Task {
                canonical,
                handler,
                ctx,
                command_sender: self.command_sender.clone(),
            };
            task.spawn(&self.runtime);
        }
    }

    pub(crate) fn complete_request(
        &mut self,
        canonical: &str,
        result: Result<ResourceRef, LoadError>,
    ) {
        self.apply_result(canonical, result);
        self.dispatch();
    }

    /// Retires a request and fans its result out to every batch that
    /// referenced it.
    fn apply_result(&mut self, canonical: &str, result: Result<ResourceRef, LoadError>) {
        self.loading.remove(canonical);

        let tracked = match self.requests.remove(canonical) {
            Some(v) => v,
            None => {
                warn!(identifier = canonical, "result for an untracked request");
                return;
            }
        };

        match result {
            Ok(resource) => {
                let hashed = self.cache.registry().get_hash(canonical).is_some();
                if hashed && !self.cache.contains(canonical) {
                    self.cache.put(canonical, resource.clone());
                }

                let handler = self.handlers.get(tracked.ty).cloned();
                for &batch in &tracked.batches {
                    let instance = match &handler {
                        Some(handler) => handler.clone_resource(&resource),
                        None => resource.clone(),
                    };

                    self.events.send(LoaderEvent::Loaded {
                        identifier: tracked.identifier.clone(),
                        batch,
                    });
                    self.batches
                        .add_resource(batch, tracked.identifiers(), instance, &self.events);
                }
            }

            Err(error) => {
                for &batch in &tracked.batches {
                    self.events.send(LoaderEvent::Error {
                        identifier: tracked.identifier.clone(),
                        batch,
                    });
                    self.batches.add_resource_error(
                        batch,
                        tracked.identifiers(),
                        error.clone(),
                        &self.events,
                    );
                }
            }
        }
    }
}

impl Debug for ResourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("cache", &self.cache)
            .field("batches", &self.batches.len())
            .field("pending", &self.pending.len())
            .field("loading", &self.loading.len())
            .finish_non_exhaustive()
    }
}
