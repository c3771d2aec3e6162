use std::any::Any;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use eyre::{bail, Result, WrapErr};
use serde::de::DeserializeOwned;

use crate::{LoadCtx, Resource, ResourceRef, ResourceType};

/// Fetches, parses and post-processes one type of resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    type Resource: Resource;
    type Data: Send + 'static;

    /// Fetches raw data for a canonical identifier.
    async fn load(&self, ctx: &mut LoadCtx, identifier: &str) -> Result<Self::Data>;

    fn open(&self, data: Self::Data) -> Result<Self::Resource>;

    /// Secondary processing of an opened resource, e.g. requesting the
    /// resources it refers to through `ctx`.
    async fn post_open(&self, ctx: &mut LoadCtx, resource: Self::Resource) -> Result<Self::Resource> {
        let _ = ctx;
        Ok(resource)
    }

    /// Produces the instance handed to one batch. The default shares the
    /// same instance between all batches.
    fn clone_resource(&self, resource: &Arc<Self::Resource>) -> Arc<Self::Resource> {
        resource.clone()
    }
}

/// A handler that parses bytes read from the loader's [`Source`](crate::Source).
pub trait BytesHandler: Send + Sync + 'static {
    type Resource: Resource;

    fn open(&self, bytes: Vec<u8>) -> Result<Self::Resource>;
}

#[async_trait]
impl<H: BytesHandler> ResourceHandler for H {
    type Resource = H::Resource;
    type Data = Vec<u8>;

    async fn load(&self, ctx: &mut LoadCtx, identifier: &str) -> Result<Vec<u8>> {
        ctx.read_bytes(identifier)
    }

    fn open(&self, data: Vec<u8>) -> Result<H::Resource> {
        BytesHandler::open(self, data)
    }
}

pub struct JsonHandler<R>(PhantomData<fn() -> R>);

impl<R> JsonHandler<R> {
    pub fn new() -> JsonHandler<R> {
        JsonHandler(PhantomData)
    }
}

impl<R> Default for JsonHandler<R> {
    fn default() -> JsonHandler<R> {
        JsonHandler::new()
    }
}

impl<R> BytesHandler for JsonHandler<R>
where
    R: Resource + DeserializeOwned,
{
    type Resource = R;

    fn open(&self, bytes: Vec<u8>) -> Result<R> {
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Clone)]
pub(crate) struct HandlerObject {
    ty: ResourceType,
    handler_name: &'static str,
    handler: Arc<dyn DynHandler>,
}

impl HandlerObject {
    pub fn new<H: ResourceHandler>(handler: H) -> HandlerObject {
        HandlerObject {
            ty: ResourceType::of::<H::Resource>(),
            handler_name: std::any::type_name::<H>(),
            handler: Arc::new(handler),
        }
    }

    pub fn ty(&self) -> ResourceType {
        self.ty
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler_name
    }

    pub async fn run(&self, ctx: &mut LoadCtx, identifier: &str) -> Result<ResourceRef> {
        self.handler.run(ctx, identifier).await
    }

    pub fn open(&self, data: Box<dyn Any + Send>) -> Result<ResourceRef> {
        self.handler.open_any(data)
    }

    pub fn clone_resource(&self, resource: &ResourceRef) -> ResourceRef {
        self.handler.clone_any(resource)
    }
}

impl Debug for HandlerObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerObject")
            .field("ty", &self.ty)
            .field("handler", &self.handler_name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
trait DynHandler: Send + Sync {
    async fn run(&self, ctx: &mut LoadCtx, identifier: &str) -> Result<ResourceRef>;

    fn open_any(&self, data: Box<dyn Any + Send>) -> Result<ResourceRef>;

    fn clone_any(&self, resource: &ResourceRef) -> ResourceRef;
}

#[async_trait]
impl<H: ResourceHandler> DynHandler for H {
    async fn run(&self, ctx: &mut LoadCtx, identifier: &str) -> Result<ResourceRef> {
        let data = ResourceHandler::load(self, ctx, identifier)
            .await
            .wrap_err_with(|| format!("failed to load {}", identifier))?;

        let resource = ResourceHandler::open(self, data)
            .wrap_err_with(|| format!("failed to open {}", identifier))?;

        let resource = ResourceHandler::post_open(self, ctx, resource)
            .await
            .wrap_err_with(|| format!("failed to post-process {}", identifier))?;

        Ok(Arc::new(resource))
    }

    fn open_any(&self, data: Box<dyn Any + Send>) -> Result<ResourceRef> {
        match data.downcast::<H::Data>() {
            Ok(data) => {
                let resource = ResourceHandler::open(self, *data)?;
                Ok(Arc::new(resource))
            }
            Err(_) => bail!(
                "{} expects data of type {}",
                std::any::type_name::<H>(),
                std::any::type_name::<H::Data>()
            ),
        }
    }

    fn clone_any(&self, resource: &ResourceRef) -> ResourceRef {
        match resource.clone().downcast_arc::<H::Resource>() {
            Some(typed) => self.clone_resource(&typed) as ResourceRef,
            None => resource.clone(),
        }
    }
}
