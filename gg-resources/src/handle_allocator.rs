use std::sync::atomic::{AtomicU64, Ordering};

use crate::BatchHandle;

#[derive(Debug)]
pub struct HandleAllocator {
    counter: AtomicU64,
}

impl HandleAllocator {
    pub fn new() -> HandleAllocator {
        HandleAllocator {
            counter: AtomicU64::new(1),
        }
    }

    pub fn alloc(&self) -> BatchHandle {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        assert!(id < u64::MAX, "batch handle overflow");
        BatchHandle(id)
    }
}

impl Default for HandleAllocator {
    fn default() -> HandleAllocator {
        HandleAllocator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_strictly_increase() {
        let allocator = HandleAllocator::new();
        let a = allocator.alloc();
        let b = allocator.alloc();
        assert_eq!(a.get(), 1);
        assert!(b > a);
    }
}
