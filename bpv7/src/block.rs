use crate::{block_flags::BlockFlags, block_type::BlockType, crc::CrcType, eid::Eid, hop_info::HopInfo};
use serde::{Deserialize, Serialize};

/// The typed payload of a canonical block.
///
/// Each known block type has a concrete payload shape; anything this node
/// does not understand is carried opaquely so it can be replicated on
/// forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockData {
    Payload(Box<[u8]>),
    PreviousNode(Eid),
    BundleAge(u64),
    HopCount(HopInfo),
    Unrecognised(Box<[u8]>),
}

impl BlockData {
    fn block_type(&self, unrecognised_type: u64) -> BlockType {
        match self {
            BlockData::Payload(_) => BlockType::Payload,
            BlockData::PreviousNode(_) => BlockType::PreviousNode,
            BlockData::BundleAge(_) => BlockType::BundleAge,
            BlockData::HopCount(_) => BlockType::HopCount,
            BlockData::Unrecognised(_) => BlockType::Unrecognised(unrecognised_type),
        }
    }
}

/// A canonical block: everything in a bundle other than the primary block.
///
/// Block number 1 is reserved for the payload block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalBlock {
    pub block_type: BlockType,
    pub block_number: u64,
    pub flags: BlockFlags,
    pub crc_type: CrcType,
    pub data: BlockData,
}

impl CanonicalBlock {
    pub fn new(block_number: u64, flags: BlockFlags, data: BlockData) -> Self {
        Self {
            block_type: data.block_type(0),
            block_number,
            flags,
            crc_type: CrcType::default(),
            data,
        }
    }

    pub fn new_payload_block(data: Vec<u8>) -> Self {
        Self::new(1, BlockFlags::default(), BlockData::Payload(data.into()))
    }

    /// An opaque block of a type this node does not understand.
    pub fn new_unrecognised(
        block_type: u64,
        block_number: u64,
        flags: BlockFlags,
        data: Vec<u8>,
    ) -> Self {
        Self {
            block_type: BlockType::Unrecognised(block_type),
            block_number,
            flags,
            crc_type: CrcType::default(),
            data: BlockData::Unrecognised(data.into()),
        }
    }
}
