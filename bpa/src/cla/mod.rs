use super::*;
use drover_bpv7::{bundle::Bundle, eid::Eid};
use thiserror::Error;

pub(crate) mod registry;

pub use registry::ClaRegistry;

/// A specialized `Result` type for CLA operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during CLA operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A sender is already registered for this address.
    #[error("A convergence sender is already registered at {0}")]
    AlreadyExists(String),

    /// The link behind this sender is no longer usable.
    #[error("The convergence link at {0} is closed")]
    LinkClosed(String),

    /// A transport-level failure.
    #[error(transparent)]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The outbound half of a Convergence Layer Adapter: a transport-specific
/// driver that can carry bundles to a single peer node.
///
/// Senders are addressable by their peer endpoint, which is what enables
/// direct-delivery lookup in the pipeline.
#[async_trait]
pub trait ConvergenceSender: Send + Sync {
    /// Transmits the bundle to the peer.  Synchronous from the pipeline's
    /// perspective; implementations may queue internally and own their own
    /// timeouts.
    async fn send(&self, bundle: &Bundle) -> Result<()>;

    /// The endpoint identifier of the node this sender reaches.
    fn peer_endpoint(&self) -> Eid;

    /// The transport address this sender is bound to, e.g. `"10.0.0.7:4556"`.
    fn address(&self) -> &str;

    /// Releases the underlying link.
    async fn close(&self);

    /// A fresh sender constructed for the same address, used by the
    /// link-restart policy after a send failure.
    fn reconnect(&self) -> Arc<dyn ConvergenceSender>;
}

/// The inbound half of a Convergence Layer Adapter: a lazy sequence of
/// bundles arriving from peer nodes.
#[async_trait]
pub trait ConvergenceReceiver: Send + Sync {
    /// The next inbound bundle, or `None` once the receiver is closed.
    async fn recv(&self) -> Option<Bundle>;

    /// The local endpoint this receiver answers to.  Destinations
    /// designating it count as endpoints of this node.
    fn endpoint(&self) -> Eid;

    /// The local transport address this receiver listens on.
    fn address(&self) -> &str;

    async fn close(&self);
}
