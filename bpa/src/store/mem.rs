use super::*;
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory store, for tests and for nodes that accept losing in-flight
/// bundles on restart.
#[derive(Default)]
pub struct MemStore {
    packs: Mutex<HashMap<BundleId, BundlePack>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BundleStore for MemStore {
    async fn push(&self, pack: &BundlePack) -> Result<()> {
        self.packs
            .lock()
            .trace_expect("Failed to lock mutex")
            .insert(pack.id().clone(), pack.clone());
        Ok(())
    }

    async fn get(&self, id: &BundleId) -> Option<BundlePack> {
        self.packs
            .lock()
            .trace_expect("Failed to lock mutex")
            .get(id)
            .cloned()
    }

    async fn knows(&self, id: &BundleId) -> bool {
        self.packs
            .lock()
            .trace_expect("Failed to lock mutex")
            .contains_key(id)
    }

    async fn query_status_subject(&self, report: &BundleStatusReport) -> Vec<BundlePack> {
        self.packs
            .lock()
            .trace_expect("Failed to lock mutex")
            .get(&report.bundle_id)
            .cloned()
            .into_iter()
            .collect()
    }

    async fn remove(&self, id: &BundleId) -> Result<()> {
        self.packs
            .lock()
            .trace_expect("Failed to lock mutex")
            .remove(id);
        Ok(())
    }

    async fn pending(&self, tx: flume::Sender<BundlePack>) {
        let pending = self
            .packs
            .lock()
            .trace_expect("Failed to lock mutex")
            .values()
            .filter(|p| p.has_constraints())
            .cloned()
            .collect::<Vec<_>>();

        for pack in pending {
            if tx.send_async(pack).await.is_err() {
                break;
            }
        }
    }
}
