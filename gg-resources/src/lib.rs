mod batch;
mod cache;
mod command;
mod config;
mod ctx;
mod error;
mod event;
mod handle;
mod handle_allocator;
mod handler;
mod handlers;
mod hash;
mod loader;
mod queue;
mod request;
mod source;
mod submission;
mod sync_any;
mod task;

use std::sync::Arc;

pub use self::batch::{Errors, Resources};
pub use self::cache::ResourceCache;
pub use self::command::Submitter;
pub use self::config::LoaderConfig;
pub use self::ctx::LoadCtx;
pub use self::error::{LoadError, SubmitError};
pub use self::event::{EventReceiver, LoaderEvent};
pub use self::handle::BatchHandle;
pub use self::handler::{BytesHandler, JsonHandler, ResourceHandler};
pub use self::hash::HashRegistry;
pub use self::loader::ResourceLoader;
pub use self::request::{IntoRequests, Request, ResourceType};
pub use self::source::{DirSource, MemorySource, Source};
pub use self::submission::Submission;
pub use self::sync_any::SyncAny;

/// An opened resource as stored in the cache and handed to batches.
pub type ResourceRef = Arc<dyn SyncAny>;

pub trait Resource: Send + Sync + 'static {}
