use super::*;

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Whether this node emits bundle status reports at all.
    pub status_reports: bool,

    /// Whether forwarded administrative bundles are also inspected by this
    /// node, rather than only ones addressed to it.
    pub inspect_all_bundles: bool,

    pub node_ids: node_ids::NodeIds,

    /// Pluggable bundle store; in-memory when unset.
    #[serde(skip)]
    pub store: Option<Arc<dyn store::BundleStore>>,

    /// Pluggable routing adapter; no routing when unset.
    #[serde(skip)]
    pub routing: Option<Arc<dyn routing::RoutingAgent>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            status_reports: false,
            inspect_all_bundles: false,
            node_ids: node_ids::NodeIds::default(),
            store: None,
            routing: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("status_reports", &self.status_reports)
            .field("inspect_all_bundles", &self.inspect_all_bundles)
            .field("node_ids", &self.node_ids)
            .finish()
    }
}
