use drover_bpv7::eid::Eid;
use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Node ids must not be the null endpoint")]
    NullEndpoint,

    #[error("A dtn node id must not have a demux part")]
    DtnWithDemux,

    #[error("An ipn node id must have service number 0")]
    IpnWithService,

    #[error("Multiple {0} scheme node ids")]
    MultipleNodeIds(&'static str),
}

/// The endpoint identifiers this node answers to, at most one per scheme.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NodeIds {
    /// The dtn scheme node name, e.g. `"n1"` for `dtn://n1/`.
    pub dtn: Option<Box<str>>,

    /// The ipn scheme node number.
    pub ipn: Option<u64>,
}

impl NodeIds {
    /// True when `eid` is exactly one of this node's administrative
    /// endpoints.
    pub fn contains(&self, eid: &Eid) -> bool {
        match (eid, &self.ipn, &self.dtn) {
            (
                Eid::Ipn {
                    node_number,
                    service_number,
                },
                Some(n),
                _,
            ) => node_number == n && *service_number == 0,
            (Eid::Dtn { node_name, demux }, _, Some(n)) => node_name == n && demux.is_empty(),
            _ => false,
        }
    }

    /// True when `eid` designates this node, regardless of demux or service
    /// part.
    pub fn matches_node(&self, eid: &Eid) -> bool {
        match (eid, &self.ipn, &self.dtn) {
            (Eid::Ipn { node_number, .. }, Some(n), _) => node_number == n,
            (Eid::Dtn { node_name, .. }, _, Some(n)) => node_name == n,
            _ => false,
        }
    }

    /// The administrative endpoint to use as the source of bundles this node
    /// originates towards `destination`, scheme-matched where possible.
    pub fn admin_endpoint_for(&self, destination: &Eid) -> Eid {
        match (destination, &self.ipn, &self.dtn) {
            (Eid::Ipn { .. }, Some(node_number), _) | (_, Some(node_number), None) => Eid::Ipn {
                node_number: *node_number,
                service_number: 0,
            },
            (_, _, Some(node_name)) => Eid::Dtn {
                node_name: node_name.clone(),
                demux: "".into(),
            },
            (_, None, None) => Eid::Null,
        }
    }
}

impl Default for NodeIds {
    fn default() -> Self {
        // A random node number out of the private-use range, so two
        // unconfigured nodes are unlikely to collide
        Self {
            ipn: Some(rand::rng().random_range(0x4000_0000..0x8000_0000)),
            dtn: None,
        }
    }
}

impl From<&NodeIds> for Vec<Eid> {
    fn from(value: &NodeIds) -> Self {
        let mut v = Vec::new();
        if let Some(node_number) = value.ipn {
            v.push(Eid::Ipn {
                node_number,
                service_number: 0,
            });
        }
        if let Some(node_name) = &value.dtn {
            v.push(Eid::Dtn {
                node_name: node_name.clone(),
                demux: "".into(),
            });
        }
        v
    }
}

impl TryFrom<&[Eid]> for NodeIds {
    type Error = Error;

    fn try_from(eids: &[Eid]) -> Result<Self, Self::Error> {
        let mut ids = Self {
            ipn: None,
            dtn: None,
        };
        for eid in eids {
            match eid {
                Eid::Null => return Err(Error::NullEndpoint),
                Eid::Ipn {
                    node_number,
                    service_number,
                } => {
                    if *service_number != 0 {
                        return Err(Error::IpnWithService);
                    }
                    if ids.ipn.replace(*node_number).is_some() {
                        return Err(Error::MultipleNodeIds("ipn"));
                    }
                }
                Eid::Dtn { node_name, demux } => {
                    if !demux.is_empty() {
                        return Err(Error::DtnWithDemux);
                    }
                    if ids.dtn.replace(node_name.clone()).is_some() {
                        return Err(Error::MultipleNodeIds("dtn"));
                    }
                }
            }
        }
        Ok(ids)
    }
}
