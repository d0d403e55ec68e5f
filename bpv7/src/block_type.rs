use serde::{Deserialize, Serialize};

/// Canonical block type codes from the IANA BPv7 block-type registry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    Payload,
    PreviousNode,
    BundleAge,
    HopCount,
    Unrecognised(u64),
}

impl BlockType {
    /// Whether this node understands blocks of this type.
    pub fn is_known(&self) -> bool {
        !matches!(self, BlockType::Unrecognised(_))
    }
}

impl From<BlockType> for u64 {
    fn from(value: BlockType) -> Self {
        match value {
            BlockType::Payload => 1,
            BlockType::PreviousNode => 6,
            BlockType::BundleAge => 7,
            BlockType::HopCount => 10,
            BlockType::Unrecognised(v) => v,
        }
    }
}

impl From<u64> for BlockType {
    fn from(value: u64) -> Self {
        match value {
            1 => BlockType::Payload,
            6 => BlockType::PreviousNode,
            7 => BlockType::BundleAge,
            10 => BlockType::HopCount,
            value => BlockType::Unrecognised(value),
        }
    }
}
