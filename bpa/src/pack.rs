use drover_bpv7::{block::BlockData, block_type::BlockType, bundle::Bundle, bundle_id::BundleId};
use std::collections::BTreeSet;

/// A processing constraint: a tag on a [`BundlePack`] stating what work
/// remains for its bundle.  A pack whose constraint set is empty has reached
/// a terminal state and is eligible for garbage collection from the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum Constraint {
    /// The bundle is waiting for dispatch.
    DispatchPending,
    /// The bundle is waiting to be forwarded to another node.
    ForwardPending,
    /// The bundle is a fragment awaiting reassembly.  Reserved: the pipeline
    /// does not yet drive transitions for it.
    ReassemblyPending,
    /// Forwarding is currently not possible; retry when link conditions
    /// change.
    Contraindicated,
    /// The bundle is being delivered to a local endpoint.
    LocalEndpoint,
}

/// The pipeline envelope around a bundle: the bundle itself, the set of
/// outstanding processing constraints, and ingress bookkeeping.
///
/// A pack is owned by the pipeline for the duration of a single stage;
/// between stages it lives in the store.  Constraint changes become durable
/// only at the next store push.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BundlePack {
    pub bundle: Bundle,
    constraints: BTreeSet<Constraint>,

    /// When this node took custody of the bundle, local clock.
    pub received_at: time::OffsetDateTime,

    /// The Bundle Age block value as it stood at ingress, used to derive the
    /// age after time spent at this node.
    age_at_ingress: Option<u64>,
}

impl BundlePack {
    /// Wraps a bundle at ingress, stamping the receive time.
    pub fn new(bundle: Bundle) -> Self {
        Self {
            age_at_ingress: bundle.age(),
            bundle,
            constraints: BTreeSet::new(),
            received_at: time::OffsetDateTime::now_utc(),
        }
    }

    pub fn id(&self) -> &BundleId {
        &self.bundle.id
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.insert(constraint);
    }

    pub fn remove_constraint(&mut self, constraint: Constraint) {
        self.constraints.remove(&constraint);
    }

    pub fn purge_constraints(&mut self) {
        self.constraints.clear();
    }

    pub fn has_constraint(&self, constraint: Constraint) -> bool {
        self.constraints.contains(&constraint)
    }

    /// Whether any work remains.  `false` means GC-eligible.
    pub fn has_constraints(&self) -> bool {
        !self.constraints.is_empty()
    }

    pub fn constraints(&self) -> impl Iterator<Item = Constraint> + '_ {
        self.constraints.iter().copied()
    }

    /// Rewrites the Bundle Age block to the age at ingress plus the time
    /// spent at this node, returning the new value in microseconds.  Bundles
    /// without an age block are left untouched.
    pub fn update_bundle_age(&mut self) -> Option<u64> {
        self.bundle.extension_block_mut(BlockType::BundleAge)?;

        let dwell = (time::OffsetDateTime::now_utc() - self.received_at)
            .whole_microseconds()
            .max(0) as u64;
        let age = self.age_at_ingress.unwrap_or(0).saturating_add(dwell);

        if let Some(block) = self.bundle.extension_block_mut(BlockType::BundleAge) {
            block.data = BlockData::BundleAge(age);
        }
        Some(age)
    }
}
