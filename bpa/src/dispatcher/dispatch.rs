use super::*;

impl Dispatcher {
    /// Entry point: transmission of a locally originated bundle.
    ///
    /// The source must be `dtn:none` (anonymous) or an endpoint of this
    /// node; anything else is deleted with *NoInformation*.
    pub async fn transmit(self: &Arc<Self>, mut bundle: Bundle) {
        // Reconcile the creation timestamp before the identity is fixed
        self.id_keeper
            .lock()
            .trace_expect("Failed to lock id keeper")
            .update(&mut bundle);

        let mut pack = BundlePack::new(bundle);
        info!("Transmission of bundle requested: {}", pack.id());

        let id = pack.id().clone();
        let guard = self.lock_id(&id).await;

        pack.add_constraint(Constraint::DispatchPending);
        if !self.commit(&pack).await {
            self.delete_bundle(pack, ReasonCode::DepletedStorage).await;
        } else {
            let source = &pack.bundle.id.source;
            if !source.is_null() && !self.is_local_endpoint(source) {
                warn!("Bundle source {source} is neither dtn:none nor an endpoint of this node");
                self.delete_bundle(pack, ReasonCode::NoInformation).await;
            } else {
                self.dispatch(pack).await;
            }
        }

        drop(guard);
        self.release_id(&id);
    }

    /// Entry point: receipt of a bundle from a peer node.
    pub async fn receive(self: &Arc<Self>, bundle: Bundle) {
        let mut pack = BundlePack::new(bundle);
        let id = pack.id().clone();
        let guard = self.lock_id(&id).await;

        if self.store.knows(&id).await {
            // A duplicate is dropped, not deleted: a deletion would evict
            // the pack already in the store
            trace!("Received bundle {id} is already known");
        } else {
            info!("Received new bundle: {id}");

            pack.add_constraint(Constraint::DispatchPending);
            if !self.commit(&pack).await {
                self.delete_bundle(pack, ReasonCode::DepletedStorage).await;
            } else {
                self.receive_bundle(pack).await;
            }
        }

        drop(guard);
        self.release_id(&id);
    }

    async fn receive_bundle(self: &Arc<Self>, mut pack: BundlePack) {
        if pack.bundle.flags.receipt_report_requested {
            self.send_status_report(
                &pack,
                StatusInformation::ReceivedBundle,
                ReasonCode::NoInformation,
            )
            .await;
        }

        // Walk the canonical blocks from highest index to lowest, so
        // in-place removals do not shift unvisited entries
        for i in (0..pack.bundle.blocks.len()).rev() {
            let block_type = pack.bundle.blocks[i].block_type;
            if block_type.is_known() {
                continue;
            }
            let flags = pack.bundle.blocks[i].flags;
            trace!(
                "Bundle {} canonical block {i} has unrecognised type {block_type:?}",
                pack.id()
            );

            if flags.report_on_failure {
                self.send_status_report(
                    &pack,
                    StatusInformation::ReceivedBundle,
                    ReasonCode::BlockUnintelligible,
                )
                .await;
            }

            if flags.delete_bundle_on_failure {
                trace!("Unrecognised block {i} requested bundle deletion");
                return self
                    .delete_bundle(pack, ReasonCode::BlockUnintelligible)
                    .await;
            }

            if flags.delete_block_on_failure {
                trace!("Unrecognised block {i} requested its own removal");
                pack.bundle.blocks.remove(i);
            }
        }

        self.dispatch(pack).await
    }

    /// Routes a dispatch-pending bundle to local delivery or forwarding.
    pub(super) async fn dispatch(self: &Arc<Self>, pack: BundlePack) {
        trace!("Dispatching bundle {}", pack.id());

        if self.is_local_endpoint(&pack.bundle.destination) {
            self.local_delivery(pack).await
        } else {
            self.forward_bundle(pack).await
        }
    }
}
