use std::any::TypeId;
use std::fmt::{self, Debug};
use std::hash::{self, Hash};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::{BatchHandle, Resource};

/// Tag selecting the handler of a request.
#[derive(Clone, Copy)]
pub struct ResourceType {
    id: TypeId,
    name: &'static str,
}

impl ResourceType {
    pub fn of<R: Resource>() -> ResourceType {
        ResourceType {
            id: TypeId::of::<R>(),
            name: std::any::type_name::<R>(),
        }
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

impl Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Eq for ResourceType {}

impl PartialEq for ResourceType {
    fn eq(&self, other: &ResourceType) -> bool {
        self.id == other.id
    }
}

impl Hash for ResourceType {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

/// A request for a single resource, located by an identifier such as a
/// URL or a GUID.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    identifier: Arc<str>,
    ty: ResourceType,
}

impl Request {
    pub fn new<R: Resource>(identifier: impl Into<Arc<str>>) -> Request {
        Request::with_type(ResourceType::of::<R>(), identifier)
    }

    pub fn with_type(ty: ResourceType, identifier: impl Into<Arc<str>>) -> Request {
        Request {
            identifier: identifier.into(),
            ty,
        }
    }

    pub fn identifier(&self) -> &Arc<str> {
        &self.identifier
    }

    pub fn ty(&self) -> ResourceType {
        self.ty
    }
}

pub trait IntoRequests {
    fn into_requests(self) -> Vec<Request>;
}

impl IntoRequests for Request {
    fn into_requests(self) -> Vec<Request> {
        vec![self]
    }
}

impl IntoRequests for Vec<Request> {
    fn into_requests(self) -> Vec<Request> {
        self
    }
}

impl<const N: usize> IntoRequests for [Request; N] {
    fn into_requests(self) -> Vec<Request> {
        self.into()
    }
}

impl IntoRequests for &[Request] {
    fn into_requests(self) -> Vec<Request> {
        self.to_vec()
    }
}

/// Scheduler-side record of a request, shared by every batch that asked for
/// the same canonical identifier while it was pending or in flight.
#[derive(Debug)]
pub(crate) struct TrackedRequest {
    pub identifier: Arc<str>,
    pub canonical: Arc<str>,
    pub alternatives: SmallVec<[Arc<str>; 1]>,
    pub ty: ResourceType,
    pub priority: i32,
    pub sequence: u64,
    pub batches: SmallVec<[BatchHandle; 1]>,
}

impl TrackedRequest {
    pub fn new(
        request: &Request,
        canonical: Arc<str>,
        priority: i32,
        sequence: u64,
        batch: BatchHandle,
    ) -> TrackedRequest {
        let mut batches = SmallVec::new();
        batches.push(batch);

        TrackedRequest {
            identifier: request.identifier.clone(),
            canonical,
            alternatives: SmallVec::new(),
            ty: request.ty,
            priority,
            sequence,
            batches,
        }
    }

    /// Folds another request for the same canonical identifier into this one.
    /// The more urgent priority wins.
    pub fn merge(&mut self, request: &Request, priority: i32, batch: BatchHandle) {
        self.batches.push(batch);
        self.priority = self.priority.min(priority);

        let identifier = &request.identifier;
        if *identifier != self.identifier && !self.alternatives.contains(identifier) {
            self.alternatives.push(identifier.clone());
        }
    }

    /// Every identifier the resource should be published under.
    pub fn identifiers(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        std::iter::once(&self.identifier).chain(&self.alternatives)
    }
}
