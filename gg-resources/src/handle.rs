use std::fmt::{self, Debug};

/// Identity of a submitted batch. Handles are strictly increasing and never
/// reused.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BatchHandle(pub(crate) u64);

impl BatchHandle {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Debug for BatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Batch({})", self.0)
    }
}
