use serde::{Deserialize, Serialize};

/// Hop limit and hop count carried in a Hop Count extension block.
///
/// Invariant for well-formed bundles: `count <= limit`.  The count is
/// incremented before the limit check on each forward, so `count > limit`
/// means the limit has been exceeded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopInfo {
    pub limit: u64,
    pub count: u64,
}

impl HopInfo {
    pub fn new(limit: u64) -> Self {
        Self { limit, count: 0 }
    }

    pub fn increment(&mut self) {
        self.count += 1;
    }

    pub fn is_exceeded(&self) -> bool {
        self.count > self.limit
    }
}

impl std::fmt::Display for HopInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.count, self.limit)
    }
}
