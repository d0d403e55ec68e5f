use super::*;
use drover_bpv7::{
    block::BlockData,
    block_type::BlockType,
    builder::Builder,
    bundle::Bundle,
    bundle_id::BundleId,
    dtn_time::DtnTime,
    eid::Eid,
    status_report::{AdministrativeRecord, BundleStatusReport, ReasonCode, StatusInformation},
};
use crate::pack::{BundlePack, Constraint};
use std::collections::HashMap;
use std::sync::Mutex;

mod admin;
mod dispatch;
mod forward;
mod local;
mod report;

/// The bundle processing pipeline.
///
/// The dispatcher is the hub that owns the store, the CLA registry, the agent
/// registry and the routing adapter, and drives every bundle through the
/// constraint state machine:
/// *DispatchPending → ForwardPending|LocalEndpoint →
/// (Contraindicated|Delivered|Deleted)*.
///
/// Pipeline stages for distinct bundle identities run concurrently; stages
/// for the same identity are serialized through a per-identity lock table so
/// a later store push can never erase an earlier one.
pub struct Dispatcher {
    task_tracker: tokio_util::task::TaskTracker,
    store: Arc<dyn store::BundleStore>,
    cla_registry: Arc<cla::ClaRegistry>,
    agent_registry: Arc<agent::AgentRegistry>,
    routing: Arc<dyn routing::RoutingAgent>,
    id_keeper: Mutex<id_keeper::IdKeeper>,
    id_locks: Mutex<HashMap<BundleId, Arc<tokio::sync::Mutex<()>>>>,

    // Config options
    status_reports: bool,
    inspect_all_bundles: bool,
    node_ids: node_ids::NodeIds,
}

impl Dispatcher {
    pub fn new(
        config: &config::Config,
        store: Arc<dyn store::BundleStore>,
        cla_registry: Arc<cla::ClaRegistry>,
        agent_registry: Arc<agent::AgentRegistry>,
        routing: Arc<dyn routing::RoutingAgent>,
    ) -> Self {
        Self {
            task_tracker: tokio_util::task::TaskTracker::new(),
            store,
            cla_registry,
            agent_registry,
            routing,
            id_keeper: Mutex::new(id_keeper::IdKeeper::default()),
            id_locks: Mutex::new(HashMap::new()),
            status_reports: config.status_reports,
            inspect_all_bundles: config.inspect_all_bundles,
            node_ids: config.node_ids.clone(),
        }
    }

    /// Waits for in-flight status-report transmissions to finish.
    pub async fn shutdown(&self) {
        self.task_tracker.close();
        self.task_tracker.wait().await;
    }

    /// Serializes pipeline stages per bundle identity.  The returned guard
    /// must be released with [`release_id`](Self::release_id) once dropped.
    async fn lock_id(&self, id: &BundleId) -> tokio::sync::OwnedMutexGuard<()> {
        let mutex = self
            .id_locks
            .lock()
            .trace_expect("Failed to lock id table")
            .entry(id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    fn release_id(&self, id: &BundleId) {
        let mut locks = self.id_locks.lock().trace_expect("Failed to lock id table");
        if let Some(mutex) = locks.get(id) {
            // Only the table's own reference left, nobody is waiting
            if Arc::strong_count(mutex) == 1 {
                locks.remove(id);
            }
        }
    }

    /// Whether `eid` designates this node, a registered application agent,
    /// or an endpoint a convergence receiver answers to.
    fn is_local_endpoint(&self, eid: &Eid) -> bool {
        self.node_ids.matches_node(eid)
            || self.agent_registry.has_endpoint(eid)
            || self.cla_registry.has_local_endpoint(eid)
    }

    pub(crate) fn forget_receiver(&self, address: &str) {
        self.cla_registry.remove_receiver(address)
    }

    /// Commits the pack's current state to the store.  `false` means the
    /// stage must abort via deletion with *DepletedStorage*.
    async fn commit(&self, pack: &BundlePack) -> bool {
        if let Err(e) = self.store.push(pack).await {
            error!("Failed to push bundle {}: {e}", pack.id());
            false
        } else {
            true
        }
    }

    /// Terminal state: the bundle is deleted.  Emits a *DeletedBundle*
    /// status report when the primary block requests one, then leaves the
    /// pack GC-eligible.
    pub(crate) async fn delete_bundle(self: &Arc<Self>, mut pack: BundlePack, reason: ReasonCode) {
        self.report_bundle_deletion(&pack, reason).await;

        pack.purge_constraints();
        if let Err(e) = self.store.push(&pack).await {
            error!("Failed to push deleted bundle {}: {e}", pack.id());
        }
        info!("Bundle {} was marked for deletion", pack.id());
    }

    /// Non-terminal hold state: forwarding is currently impossible.  The
    /// pack stays in the store for later re-forwarding when link conditions
    /// change.
    async fn contraindicate(self: &Arc<Self>, mut pack: BundlePack) {
        info!("Bundle {} was marked for contraindication", pack.id());

        pack.add_constraint(Constraint::Contraindicated);
        pack.remove_constraint(Constraint::DispatchPending);
        pack.remove_constraint(Constraint::ForwardPending);
        if !self.commit(&pack).await {
            self.delete_bundle(pack, ReasonCode::DepletedStorage).await;
        }
    }

    /// Re-enters the pipeline stage recorded in a recovered pack's
    /// constraint set.
    pub(crate) async fn reprocess(self: &Arc<Self>, pack: BundlePack) {
        let id = pack.id().clone();
        let guard = self.lock_id(&id).await;

        if pack.has_constraint(Constraint::Contraindicated) {
            trace!("Bundle {id} remains contraindicated after recovery");
        } else if pack.has_constraint(Constraint::ForwardPending) {
            self.forward_bundle(pack).await;
        } else if pack.has_constraint(Constraint::DispatchPending)
            || pack.has_constraint(Constraint::LocalEndpoint)
        {
            self.dispatch(pack).await;
        }

        drop(guard);
        self.release_id(&id);
    }

    /// Gives a contraindicated bundle another chance to forward; the
    /// external scheduler calls this when link conditions change.
    pub(crate) async fn reforward(self: &Arc<Self>, mut pack: BundlePack) {
        let id = pack.id().clone();
        let guard = self.lock_id(&id).await;

        pack.remove_constraint(Constraint::Contraindicated);
        self.forward_bundle(pack).await;

        drop(guard);
        self.release_id(&id);
    }
}
