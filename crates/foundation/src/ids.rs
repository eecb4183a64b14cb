use serde::{Deserialize, Serialize};

/// Stable identifier of a wall segment, unique within one wall.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

/// Stable identifier of a placed hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldId(pub u64);

impl SegmentId {
    pub fn new(n: u64) -> Self {
        SegmentId(n)
    }
}

impl HoldId {
    pub fn new(n: u64) -> Self {
        HoldId(n)
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "segment#{}", self.0)
    }
}

impl std::fmt::Display for HoldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hold#{}", self.0)
    }
}
