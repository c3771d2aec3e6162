use std::fmt::{self, Debug};

use crate::batch::Callbacks;
use crate::request::IntoRequests;
use crate::{BatchHandle, Errors, Request, Resources};

/// A batch of requests together with its priority, parent and callbacks.
///
/// ```ignore
/// let handle = loader.submit(
///     Submission::new([Request::new::<Texture>("/a.png"), Request::new::<Texture>("/b.png")])
///         .priority(0)
///         .on_success(|resources| { /* ... */ })
///         .on_error(|errors, resources| { /* ... */ }),
/// )?;
/// ```
pub struct Submission {
    pub(crate) requests: Vec<Request>,
    pub(crate) priority: Option<i32>,
    pub(crate) parent: Option<BatchHandle>,
    pub(crate) callbacks: Callbacks,
}

impl Submission {
    pub fn new(requests: impl IntoRequests) -> Submission {
        Submission {
            requests: requests.into_requests(),
            priority: None,
            parent: None,
            callbacks: Callbacks::default(),
        }
    }

    /// Lower is served first. Ignored when a parent is set, children inherit
    /// the parent's priority.
    pub fn priority(mut self, priority: i32) -> Submission {
        self.priority = Some(priority);
        self
    }

    /// The parent won't complete until this batch has.
    pub fn parent(mut self, parent: BatchHandle) -> Submission {
        self.parent = Some(parent);
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Submission
    where
        F: FnOnce(&Resources) + Send + 'static,
    {
        self.callbacks.success = Some(Box::new(callback));
        self
    }

    /// Called once when the batch completes with errors, and again for every
    /// child batch that completes with errors.
    pub fn on_error<F>(mut self, callback: F) -> Submission
    where
        F: FnMut(&Errors, &Resources) + Send + 'static,
    {
        self.callbacks.error = Some(Box::new(callback));
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Submission
    where
        F: FnMut(f32) + Send + 'static,
    {
        self.callbacks.progress = Some(Box::new(callback));
        self
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }
}

impl Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("requests", &self.requests)
            .field("priority", &self.priority)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}
