use super::*;

impl Dispatcher {
    /// Parses and acts on the administrative record carried by `pack`.
    ///
    /// Returns `false` when the record cannot be parsed; at local delivery
    /// the caller treats that as a deletion-worthy error, at forward-time
    /// inspection it is merely logged.
    pub(super) async fn check_administrative_record(
        self: &Arc<Self>,
        pack: &BundlePack,
    ) -> bool {
        if !pack.bundle.is_administrative_record() {
            trace!("Bundle {} does not carry an administrative record", pack.id());
            return false;
        }

        let Some(payload) = pack.bundle.payload() else {
            warn!("Administrative bundle {} has no payload block", pack.id());
            return false;
        };

        let record = match AdministrativeRecord::from_payload(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Administrative record in bundle {} could not be parsed: {e}",
                    pack.id()
                );
                return false;
            }
        };

        match record {
            AdministrativeRecord::BundleStatusReport(report) => {
                self.inspect_status_report(pack.id(), &report).await
            }
        }
        true
    }

    /// Acts on an inbound status report about a subject bundle held here.
    ///
    /// Only a *DeliveredBundle* assertion changes state: the subject is
    /// provably done downstream, so its local constraints are released.
    /// Everything else is informational.
    async fn inspect_status_report(
        self: &Arc<Self>,
        carrier: &BundleId,
        report: &BundleStatusReport,
    ) {
        let asserted = report.asserted();
        if asserted.is_empty() {
            trace!("Status report for {} asserts nothing", report.bundle_id);
            return;
        }

        let mut subjects = self.store.query_status_subject(report).await;
        if subjects.len() != 1 {
            // Zero or ambiguous matches: do not speculate
            info!(
                "Status report's subject bundle {} is unknown ({} matches)",
                report.bundle_id,
                subjects.len()
            );
            return;
        }
        let mut subject = subjects.pop().trace_expect("Match count checked above");

        for status in asserted {
            match status {
                StatusInformation::ReceivedBundle => {
                    trace!("Status report: bundle {} was received", report.bundle_id)
                }
                StatusInformation::ForwardedBundle => {
                    trace!("Status report: bundle {} was forwarded", report.bundle_id)
                }
                StatusInformation::DeletedBundle => {
                    trace!("Status report: bundle {} was deleted", report.bundle_id)
                }
                StatusInformation::DeliveredBundle => {
                    info!(
                        "Status report: bundle {} was delivered downstream, releasing local state",
                        report.bundle_id
                    );

                    // Serialize against other stages for the subject, unless
                    // the report names itself
                    let guard = if subject.id() != carrier {
                        Some(self.lock_id(subject.id()).await)
                    } else {
                        None
                    };

                    subject.purge_constraints();
                    if let Err(e) = self.store.push(&subject).await {
                        error!("Failed to push bundle {}: {e}", subject.id());
                    }

                    if let Some(guard) = guard {
                        drop(guard);
                        self.release_id(subject.id());
                    }
                }
            }
        }
    }
}
