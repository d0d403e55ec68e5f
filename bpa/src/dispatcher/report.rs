use super::*;
use std::future::Future;
use std::pin::Pin;

impl Dispatcher {
    /// Emits a *DeletedBundle* status report when the primary block requests
    /// one.
    pub(super) async fn report_bundle_deletion(
        self: &Arc<Self>,
        pack: &BundlePack,
        reason: ReasonCode,
    ) {
        if pack.bundle.flags.delete_report_requested {
            self.send_status_report(pack, StatusInformation::DeletedBundle, reason)
                .await;
        }
    }

    /// Builds a status report about `pack` and sends it to the subject's
    /// report-to endpoint.
    ///
    /// A status report is itself a bundle, sourced from this node's
    /// administrative endpoint; it re-enters the pipeline through the
    /// transmit entry and travels like any other outbound bundle.
    pub(super) fn send_status_report<'a>(
        self: &'a Arc<Self>,
        pack: &'a BundlePack,
        status: StatusInformation,
        reason: ReasonCode,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if !self.status_reports {
                trace!("Status reports are disabled");
                return;
            }

            // An anonymous bundle, or one reporting to nobody, yields nothing
            if pack.bundle.id.source.is_null() || pack.bundle.report_to.is_null() {
                trace!("Bundle {} has nowhere to report to", pack.id());
                return;
            }

            info!(
                "Sending {status:?} status report for bundle {} to {}",
                pack.id(),
                pack.bundle.report_to
            );

            // Receptions are asserted at the time we took the bundle, everything
            // else at the time of the event
            let timestamp = match status {
                StatusInformation::ReceivedBundle => DtnTime::try_from(pack.received_at).ok(),
                _ => Some(DtnTime::now()),
            };

            let record = AdministrativeRecord::BundleStatusReport(BundleStatusReport::new(
                &pack.bundle,
                status,
                reason,
                timestamp,
            ));

            let report = match Builder::new()
                .source(self.node_ids.admin_endpoint_for(&pack.bundle.report_to))
                .destination(pack.bundle.report_to.clone())
                .lifetime(pack.bundle.lifetime)
                .administrative()
                .payload(record.to_payload())
                .build()
            {
                Ok(report) => report,
                Err(e) => {
                    error!("Failed to build status report: {e}");
                    return;
                }
            };

            let dispatcher = self.clone();
            self.task_tracker.spawn(async move {
                dispatcher.transmit(report).await;
            });
        })
    }
}
