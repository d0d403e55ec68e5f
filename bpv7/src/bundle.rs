use crate::{
    block::{BlockData, CanonicalBlock},
    block_flags::BlockFlags,
    block_type::BlockType,
    bundle_flags::BundleFlags,
    bundle_id::BundleId,
    crc::CrcType,
    eid::Eid,
    hop_info::HopInfo,
};
use serde::{Deserialize, Serialize};

/// A BPv7 bundle: the primary-block fields plus the canonical blocks.
///
/// Canonical blocks are kept in ascending block-number order; the payload
/// block is always block number 1 and sits last on the wire, but position in
/// `blocks` is not significant here.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: BundleId,
    pub flags: BundleFlags,
    pub crc_type: CrcType,
    pub destination: Eid,
    pub report_to: Eid,

    /// Lifetime in microseconds since creation.
    pub lifetime: u64,

    pub blocks: Vec<CanonicalBlock>,
}

impl Bundle {
    /// The payload block (block number 1), if any.
    pub fn payload_block(&self) -> Option<&CanonicalBlock> {
        self.blocks.iter().find(|b| b.block_number == 1)
    }

    /// The raw payload bytes, if a payload block is present.
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.payload_block()?.data {
            BlockData::Payload(data) => Some(data),
            _ => None,
        }
    }

    /// The first extension block of the given type.
    pub fn extension_block(&self, block_type: BlockType) -> Option<&CanonicalBlock> {
        self.blocks.iter().find(|b| b.block_type == block_type)
    }

    pub fn extension_block_mut(&mut self, block_type: BlockType) -> Option<&mut CanonicalBlock> {
        self.blocks.iter_mut().find(|b| b.block_type == block_type)
    }

    pub fn hop_count(&self) -> Option<HopInfo> {
        match self.extension_block(BlockType::HopCount)?.data {
            BlockData::HopCount(hops) => Some(hops),
            _ => None,
        }
    }

    /// The Bundle Age block value in microseconds, if present.
    pub fn age(&self) -> Option<u64> {
        match self.extension_block(BlockType::BundleAge)?.data {
            BlockData::BundleAge(age) => Some(age),
            _ => None,
        }
    }

    pub fn previous_node(&self) -> Option<&Eid> {
        match &self.extension_block(BlockType::PreviousNode)?.data {
            BlockData::PreviousNode(eid) => Some(eid),
            _ => None,
        }
    }

    pub fn is_administrative_record(&self) -> bool {
        self.flags.is_admin_record
    }

    /// The lowest block number not yet in use (never 0 or 1).
    pub fn next_block_number(&self) -> u64 {
        let mut number = 2;
        while self.blocks.iter().any(|b| b.block_number == number) {
            number += 1;
        }
        number
    }

    /// Appends an extension block, assigning it the next free block number.
    pub fn add_extension_block(&mut self, flags: BlockFlags, data: BlockData) -> u64 {
        let block_number = self.next_block_number();
        self.blocks
            .push(CanonicalBlock::new(block_number, flags, data));
        block_number
    }

    /// Replaces the Previous Node block value in place.  Bundles without a
    /// Previous Node block are left untouched.
    pub fn update_previous_node(&mut self, eid: Eid) {
        if let Some(block) = self.extension_block_mut(BlockType::PreviousNode) {
            block.data = BlockData::PreviousNode(eid);
        }
    }

    /// Whether the primary block declares this bundle expired: creation time
    /// plus lifetime is in the past.  For clockless sources (zero creation
    /// time) the Bundle Age block value is the tiebreaker.
    pub fn is_lifetime_exceeded(&self) -> bool {
        if let Some(creation_time) = self.id.timestamp.creation_time {
            let expiry = time::OffsetDateTime::from(creation_time)
                .saturating_add(time::Duration::microseconds(
                    self.lifetime.min(i64::MAX as u64) as i64,
                ));
            expiry < time::OffsetDateTime::now_utc()
        } else if let Some(age) = self.age() {
            age >= self.lifetime
        } else {
            // Malformed: no clock and no age block.  Treated as expired so it
            // cannot circulate forever.
            true
        }
    }
}
