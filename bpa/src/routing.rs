use super::*;
use crate::cla::{ClaRegistry, ConvergenceSender};
use crate::pack::BundlePack;

/// The contract a routing algorithm must satisfy.
///
/// The pipeline consults the adapter only when no directly connected sender
/// matches a bundle's destination; the algorithm itself (epidemic,
/// spray-and-wait, ...) is outside the agent core.
#[async_trait]
pub trait RoutingAgent: Send + Sync {
    /// Candidate next-hop senders for the bundle, and whether a successful
    /// transmission to any of them is definitive: `true` means the pipeline
    /// purges the pack's constraints after sending, `false` keeps the pack
    /// forwardable for further replication.
    async fn sender_for_bundle(
        &self,
        pack: &BundlePack,
        registry: &ClaRegistry,
    ) -> (Vec<Arc<dyn ConvergenceSender>>, bool);

    /// Called at local delivery, so algorithms can learn reachability.
    async fn notify_incoming(&self, _pack: &BundlePack) {}

    /// Optional hook: the bundle was forwarded to at least one peer.
    async fn notify_forwarded(&self, _pack: &BundlePack) {}

    /// Optional hook: the bundle was delivered to a local agent.
    async fn notify_delivered(&self, _pack: &BundlePack) {}
}

/// The do-nothing adapter: never proposes a next hop, so bundles without a
/// direct sender are contraindicated until conditions change.
pub struct NullRouting;

#[async_trait]
impl RoutingAgent for NullRouting {
    async fn sender_for_bundle(
        &self,
        _pack: &BundlePack,
        _registry: &ClaRegistry,
    ) -> (Vec<Arc<dyn ConvergenceSender>>, bool) {
        (Vec::new(), false)
    }
}
