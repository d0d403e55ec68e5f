use super::*;
use std::sync::atomic::{AtomicBool, Ordering};

impl Dispatcher {
    /// Forwards a bundle towards its destination via the convergence layer.
    pub(super) async fn forward_bundle(self: &Arc<Self>, mut pack: BundlePack) {
        trace!("Bundle {} will be forwarded", pack.id());

        pack.add_constraint(Constraint::ForwardPending);
        pack.remove_constraint(Constraint::DispatchPending);
        if !self.commit(&pack).await {
            return self.delete_bundle(pack, ReasonCode::DepletedStorage).await;
        }

        // Hop count is incremented before the limit check
        let hops_exceeded = match pack.bundle.extension_block_mut(BlockType::HopCount) {
            Some(block) => {
                if let BlockData::HopCount(hops) = &mut block.data {
                    hops.increment();
                    trace!("Bundle hop count is now {hops}");
                    hops.is_exceeded()
                } else {
                    false
                }
            }
            None => false,
        };
        if hops_exceeded {
            trace!("Bundle {} exceeded its hop limit", pack.id());
            return self.delete_bundle(pack, ReasonCode::HopLimitExceeded).await;
        }

        // The primary-block check runs against the age as it stood at
        // ingress; only then is the age brought up to date
        if pack.bundle.is_lifetime_exceeded() {
            trace!("Bundle {} primary block lifetime is exceeded", pack.id());
            return self.delete_bundle(pack, ReasonCode::LifetimeExpired).await;
        }

        if let Some(age) = pack.update_bundle_age() {
            if age >= pack.bundle.lifetime {
                trace!("Bundle {} has aged out", pack.id());
                return self.delete_bundle(pack, ReasonCode::LifetimeExpired).await;
            }
        }

        // The next hop should see us as the previous node
        pack.bundle
            .update_previous_node(self.node_ids.admin_endpoint_for(&pack.bundle.destination));

        // A directly connected peer is definitive; otherwise ask routing
        let mut delete_after_send = true;
        let mut senders = self
            .cla_registry
            .senders_for_destination(&pack.bundle.destination);
        if senders.is_empty() {
            (senders, delete_after_send) = self
                .routing
                .sender_for_bundle(&pack, &self.cla_registry)
                .await;
        }

        if senders.is_empty() {
            trace!("No senders for bundle {}", pack.id());
            return self.contraindicate(pack).await;
        }

        // Fan out to every candidate in parallel; "sent" is the monotone OR
        // across all attempts
        let sent = Arc::new(AtomicBool::new(false));
        let mut attempts = tokio::task::JoinSet::new();
        for sender in senders {
            let bundle = pack.bundle.clone();
            let sent = sent.clone();
            let dispatcher = self.clone();
            attempts.spawn(async move {
                trace!(
                    "Attempting delivery of bundle {} to {} at {}",
                    bundle.id,
                    sender.peer_endpoint(),
                    sender.address()
                );

                match sender.send(&bundle).await {
                    Ok(()) => {
                        trace!("Delivered bundle {} to {}", bundle.id, sender.peer_endpoint());
                        sent.fetch_or(true, Ordering::SeqCst);
                    }
                    Err(e) => {
                        warn!(
                            "Transmission of bundle {} to {} failed: {e}",
                            bundle.id,
                            sender.peer_endpoint()
                        );
                        dispatcher.cla_registry.restart_sender(&sender).await;
                    }
                }
            });
        }
        while attempts.join_next().await.is_some() {}

        if sent.load(Ordering::SeqCst) {
            if pack.bundle.flags.forward_report_requested {
                self.send_status_report(
                    &pack,
                    StatusInformation::ForwardedBundle,
                    ReasonCode::NoInformation,
                )
                .await;
            }
            self.routing.notify_forwarded(&pack).await;

            if delete_after_send {
                pack.purge_constraints();
                if !self.commit(&pack).await {
                    self.delete_bundle(pack, ReasonCode::DepletedStorage).await;
                }
            } else if self.inspect_all_bundles && pack.bundle.is_administrative_record() {
                // The bundle stays forwardable, but this node learns from
                // the record in passing; a parse failure here only logs
                self.contraindicate(pack.clone()).await;
                self.check_administrative_record(&pack).await;
            }
        } else {
            warn!("Failed to forward bundle {}", pack.id());
            self.contraindicate(pack).await;
        }
    }
}
