use super::*;
use drover_bpv7::{bundle::Bundle, eid::Eid};

/// The assembled bundle protocol agent.
///
/// The `Bpa` owns the store, the registries and the dispatcher, and is the
/// only owner in the graph: convergence layers, agents and the routing
/// adapter are handed in as trait objects and notified back through narrow
/// entry points.
pub struct Bpa {
    store: Arc<dyn store::BundleStore>,
    cla_registry: Arc<cla::ClaRegistry>,
    agent_registry: Arc<agent::AgentRegistry>,
    dispatcher: Arc<dispatcher::Dispatcher>,
}

impl Bpa {
    pub fn new(config: &config::Config) -> Self {
        let store = config
            .store
            .clone()
            .unwrap_or_else(|| Arc::new(store::mem::MemStore::new()));
        let routing = config
            .routing
            .clone()
            .unwrap_or_else(|| Arc::new(routing::NullRouting));

        let cla_registry = Arc::new(cla::ClaRegistry::new());
        let agent_registry = Arc::new(agent::AgentRegistry::new());

        let dispatcher = Arc::new(dispatcher::Dispatcher::new(
            config,
            store.clone(),
            cla_registry.clone(),
            agent_registry.clone(),
            routing,
        ));

        Self {
            store,
            cla_registry,
            agent_registry,
            dispatcher,
        }
    }

    /// Replays every pack with outstanding work through the pipeline, so
    /// that processing resumes where a previous incarnation left off.
    pub async fn start(&self) {
        let (tx, rx) = flume::bounded(16);

        let store = self.store.clone();
        let walker = tokio::spawn(async move { store.pending(tx).await });

        while let Ok(pack) = rx.recv_async().await {
            trace!("Recovered bundle {} from the store", pack.id());
            self.dispatcher.reprocess(pack).await;
        }

        _ = walker.await;
    }

    /// Transmits a locally originated bundle.
    pub async fn send(&self, bundle: Bundle) {
        self.dispatcher.transmit(bundle).await
    }

    pub fn register_agent(&self, agent: Arc<dyn agent::ApplicationAgent>) {
        self.agent_registry.register(agent)
    }

    pub fn unregister_agent(&self, endpoint: &Eid) {
        self.agent_registry.unregister(endpoint)
    }

    pub fn register_sender(&self, sender: Arc<dyn cla::ConvergenceSender>) -> cla::Result<()> {
        self.cla_registry.register_sender(sender)
    }

    pub fn remove_sender(&self, address: &str) -> Option<Arc<dyn cla::ConvergenceSender>> {
        self.cla_registry.remove_sender(address)
    }

    pub fn register_receiver(&self, receiver: Arc<dyn cla::ConvergenceReceiver>) {
        self.cla_registry
            .register_receiver(receiver, self.dispatcher.clone())
    }

    /// Re-forwards every contraindicated bundle; call when link conditions
    /// have changed.
    pub async fn retry_contraindicated(&self) {
        let (tx, rx) = flume::bounded(16);

        let store = self.store.clone();
        let walker = tokio::spawn(async move { store.pending(tx).await });

        while let Ok(pack) = rx.recv_async().await {
            if pack.has_constraint(pack::Constraint::Contraindicated) {
                self.dispatcher.reforward(pack).await;
            }
        }

        _ = walker.await;
    }

    /// Waits until every in-flight status-report transmission has run its
    /// course through the pipeline.
    pub async fn flush(&self) {
        self.dispatcher.shutdown().await;
    }

    pub async fn shutdown(&self) {
        // CLAs stop first so no new bundles arrive while the dispatcher
        // drains, then in-flight reports
        self.cla_registry.shutdown().await;
        self.dispatcher.shutdown().await;
    }
}
