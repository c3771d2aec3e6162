use ahash::AHashMap;

use crate::handler::HandlerObject;
use crate::ResourceType;

#[derive(Debug, Default)]
pub(crate) struct HandlerRegistry {
    handlers: AHashMap<ResourceType, HandlerObject>,
}

impl HandlerRegistry {
    pub fn new() -> HandlerRegistry {
        HandlerRegistry::default()
    }

    /// Returns the handler previously registered for the same type.
    pub fn insert(&mut self, handler: HandlerObject) -> Option<HandlerObject> {
        self.handlers.insert(handler.ty(), handler)
    }

    pub fn get(&self, ty: ResourceType) -> Option<&HandlerObject> {
        self.handlers.get(&ty)
    }

    pub fn contains(&self, ty: ResourceType) -> bool {
        self.handlers.contains_key(&ty)
    }
}
