use super::*;
use std::sync::RwLock;

/// The set of currently registered convergence-layer senders and receivers.
///
/// Sender registration is keyed by transport address; each receiver gets a
/// consume task that feeds the dispatcher's receive entry point until the
/// receiver closes or the registry shuts down.
pub struct ClaRegistry {
    senders: RwLock<Vec<Arc<dyn ConvergenceSender>>>,
    receivers: RwLock<Vec<Arc<dyn ConvergenceReceiver>>>,
    cancel_token: tokio_util::sync::CancellationToken,
    task_tracker: tokio_util::task::TaskTracker,
}

impl ClaRegistry {
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(Vec::new()),
            receivers: RwLock::new(Vec::new()),
            cancel_token: tokio_util::sync::CancellationToken::new(),
            task_tracker: tokio_util::task::TaskTracker::new(),
        }
    }

    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        let senders = std::mem::take(
            &mut *self
                .senders
                .write()
                .trace_expect("Failed to lock sender registry"),
        );
        for sender in senders {
            sender.close().await;
        }
    }

    pub fn register_sender(&self, sender: Arc<dyn ConvergenceSender>) -> Result<()> {
        let mut senders = self
            .senders
            .write()
            .trace_expect("Failed to lock sender registry");

        if senders.iter().any(|s| s.address() == sender.address()) {
            return Err(Error::AlreadyExists(sender.address().to_string()));
        }

        info!(
            "Registered convergence sender for {} at {}",
            sender.peer_endpoint(),
            sender.address()
        );
        senders.push(sender);
        Ok(())
    }

    /// Removes the sender registered at `address`, returning it.
    pub fn remove_sender(&self, address: &str) -> Option<Arc<dyn ConvergenceSender>> {
        let mut senders = self
            .senders
            .write()
            .trace_expect("Failed to lock sender registry");

        let position = senders.iter().position(|s| s.address() == address)?;
        info!("Unregistered convergence sender at {address}");
        Some(senders.swap_remove(position))
    }

    /// All senders whose peer endpoint designates the destination's node.
    /// If any match, the bundle can be delivered directly and routing is
    /// bypassed.
    pub fn senders_for_destination(&self, destination: &Eid) -> Vec<Arc<dyn ConvergenceSender>> {
        self.senders
            .read()
            .trace_expect("Failed to lock sender registry")
            .iter()
            .filter(|s| {
                let peer = s.peer_endpoint();
                &peer == destination || peer.matches_node(destination)
            })
            .cloned()
            .collect()
    }

    pub fn senders(&self) -> Vec<Arc<dyn ConvergenceSender>> {
        self.senders
            .read()
            .trace_expect("Failed to lock sender registry")
            .clone()
    }

    /// The link-restart policy: close and deregister the failed sender, then
    /// register a fresh instance constructed for the same address.
    pub async fn restart_sender(&self, sender: &Arc<dyn ConvergenceSender>) {
        warn!("Restarting convergence sender at {}", sender.address());

        sender.close().await;
        self.remove_sender(sender.address());

        if let Err(e) = self.register_sender(sender.reconnect()) {
            // Another pipeline stage restarted this link first
            trace!("Sender restart raced: {e}");
        }
    }

    /// Whether `eid` designates an endpoint a registered receiver answers
    /// to.
    pub fn has_local_endpoint(&self, eid: &Eid) -> bool {
        self.receivers
            .read()
            .trace_expect("Failed to lock receiver registry")
            .iter()
            .any(|r| {
                let endpoint = r.endpoint();
                &endpoint == eid || endpoint.matches_node(eid)
            })
    }

    /// Starts pumping `receiver` into the dispatcher until it closes.
    pub(crate) fn register_receiver(
        &self,
        receiver: Arc<dyn ConvergenceReceiver>,
        dispatcher: Arc<dispatcher::Dispatcher>,
    ) {
        let cancel_token = self.cancel_token.clone();
        info!(
            "Registered convergence receiver for {} at {}",
            receiver.endpoint(),
            receiver.address()
        );

        self.receivers
            .write()
            .trace_expect("Failed to lock receiver registry")
            .push(receiver.clone());

        self.task_tracker.spawn(async move {
            loop {
                tokio::select! {
                    // Drain inbound bundles ahead of cancellation
                    biased;
                    bundle = receiver.recv() => {
                        let Some(bundle) = bundle else {
                            trace!("Convergence receiver at {} closed", receiver.address());
                            break;
                        };
                        dispatcher.receive(bundle).await;
                    }
                    _ = cancel_token.cancelled() => {
                        receiver.close().await;
                        break;
                    }
                }
            }

            // Closed receivers no longer answer for their endpoint
            dispatcher.forget_receiver(receiver.address());
        });
    }

    pub(crate) fn remove_receiver(&self, address: &str) {
        self.receivers
            .write()
            .trace_expect("Failed to lock receiver registry")
            .retain(|r| r.address() != address);
    }
}

impl Default for ClaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
