use super::*;

impl Dispatcher {
    /// Delivers a bundle to this node's application agents.
    pub(super) async fn local_delivery(self: &Arc<Self>, mut pack: BundlePack) {
        trace!("Bundle {} is destined for a local endpoint", pack.id());

        // TODO: fragment reassembly; until then fragments are delivered
        // as-is and ReassemblyPending stays unused

        pack.add_constraint(Constraint::LocalEndpoint);
        pack.remove_constraint(Constraint::DispatchPending);
        if !self.commit(&pack).await {
            return self.delete_bundle(pack, ReasonCode::DepletedStorage).await;
        }

        if pack.bundle.is_administrative_record()
            && !self.check_administrative_record(&pack).await
        {
            return self.delete_bundle(pack, ReasonCode::NoInformation).await;
        }

        self.agent_registry
            .deliver(&pack.bundle.destination, &pack.bundle)
            .await;

        self.routing.notify_incoming(&pack).await;
        self.routing.notify_delivered(&pack).await;

        if pack.bundle.flags.delivery_report_requested {
            self.send_status_report(
                &pack,
                StatusInformation::DeliveredBundle,
                ReasonCode::NoInformation,
            )
            .await;
        }

        pack.purge_constraints();
        if !self.commit(&pack).await {
            return self.delete_bundle(pack, ReasonCode::DepletedStorage).await;
        }
        info!("Bundle {} delivered", pack.id());
    }
}
