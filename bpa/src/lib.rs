/*!
The drover bundle protocol agent: a store-and-forward router for
Delay/Disruption-Tolerant Networking.

The heart of the crate is the dispatcher processing pipeline, which
shepherds every bundle from ingress (local transmission via
[`Bpa::send`](bpa::Bpa::send) or receipt from a peer over a convergence
layer) through dispatch, forwarding, local delivery, contraindication and
deletion, persisting each state transition in the bundle [`store`] so that
processing resumes after a crash or a link outage.
*/

mod dispatcher;
mod id_keeper;
mod utils;

pub mod agent;
pub mod bpa;
pub mod cla;
pub mod config;
pub mod node_ids;
pub mod pack;
pub mod routing;
pub mod store;

use std::sync::Arc;
use tracing::{error, info, trace, warn};
use utils::TraceExpect;

// Re-export for consistency
pub use async_trait::async_trait;
pub use drover_bpv7 as bpv7;
