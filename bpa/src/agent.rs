use super::*;
use drover_bpv7::{bundle::Bundle, eid::Eid};
use std::sync::RwLock;

/// A local application endpoint that consumes delivered bundles.
///
/// Delivery is fire-and-forget: the pipeline does not await an
/// acknowledgement beyond the call itself.
#[async_trait]
pub trait ApplicationAgent: Send + Sync {
    fn endpoint(&self) -> &Eid;

    async fn deliver(&self, bundle: &Bundle);
}

/// The set of registered application agents.
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<Vec<Arc<dyn ApplicationAgent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, agent: Arc<dyn ApplicationAgent>) {
        info!("Registered application agent at {}", agent.endpoint());
        self.agents
            .write()
            .trace_expect("Failed to lock agent registry")
            .push(agent);
    }

    /// Removes every agent registered at `endpoint`.
    pub fn unregister(&self, endpoint: &Eid) {
        self.agents
            .write()
            .trace_expect("Failed to lock agent registry")
            .retain(|a| {
                if a.endpoint() == endpoint {
                    info!("Unregistered application agent at {endpoint}");
                    false
                } else {
                    true
                }
            });
    }

    pub fn has_endpoint(&self, eid: &Eid) -> bool {
        self.agents
            .read()
            .trace_expect("Failed to lock agent registry")
            .iter()
            .any(|a| a.endpoint() == eid)
    }

    /// Delivers a copy of the bundle to every agent whose endpoint equals
    /// the destination.
    pub async fn deliver(&self, destination: &Eid, bundle: &Bundle) {
        let matching = self
            .agents
            .read()
            .trace_expect("Failed to lock agent registry")
            .iter()
            .filter(|a| a.endpoint() == destination)
            .cloned()
            .collect::<Vec<_>>();

        for agent in matching {
            trace!("Delivering bundle {} to agent {destination}", bundle.id);
            agent.deliver(bundle).await;
        }
    }
}
