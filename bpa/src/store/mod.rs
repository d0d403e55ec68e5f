use super::*;
use drover_bpv7::{bundle_id::BundleId, status_report::BundleStatusReport};
use crate::pack::BundlePack;

pub mod disk;
pub mod mem;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;

/// The persistent mapping from bundle identity to [`BundlePack`].
///
/// The pipeline commits every state transition through [`push`](Self::push),
/// so that recovery after a crash re-enters the same state.  A pack with an
/// empty constraint set remains known until the embedder sweeps it with
/// [`remove`](Self::remove); the sweep policy is not the store's concern.
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Upsert by bundle identity; last writer wins, atomic with respect to
    /// concurrent readers.
    async fn push(&self, pack: &BundlePack) -> Result<()>;

    async fn get(&self, id: &BundleId) -> Option<BundlePack>;

    /// True if a pack with this identity has been pushed and not removed.
    async fn knows(&self, id: &BundleId) -> bool;

    /// All packs whose bundle identity matches the subject of the status
    /// report.  Expected cardinality is one; callers treat anything else as
    /// "unknown subject".
    async fn query_status_subject(&self, report: &BundleStatusReport) -> Vec<BundlePack>;

    /// The garbage-collection sweep hook: drops the pack outright.
    async fn remove(&self, id: &BundleId) -> Result<()>;

    /// Streams every pack with a non-empty constraint set, for crash
    /// recovery.  The receiver may hang up early.
    async fn pending(&self, tx: flume::Sender<BundlePack>);
}
