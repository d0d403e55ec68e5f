use crate::cbor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EidError {
    #[error("Unsupported EID scheme in {0}")]
    UnsupportedScheme(String),

    #[error("Invalid dtn scheme-specific part {0}")]
    InvalidDtnSsp(String),

    #[error("Invalid ipn scheme-specific part {0}")]
    InvalidIpnSsp(String),

    #[error(transparent)]
    InvalidCbor(#[from] cbor::decode::Error),

    #[error("Unknown EID scheme number {0}")]
    UnknownSchemeNumber(u64),
}

/// An endpoint identifier, the URI-shaped name of a DTN entity.
///
/// Two schemes are recognized: `dtn` (with the distinguished `dtn:none` null
/// endpoint) and `ipn` (numeric node and service numbers).
#[derive(Default, Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Eid {
    /// The null endpoint `dtn:none`: a legal (anonymous) source, never a
    /// legal destination.
    #[default]
    Null,
    Dtn {
        node_name: Box<str>,
        demux: Box<str>,
    },
    Ipn {
        node_number: u64,
        service_number: u64,
    },
}

impl Eid {
    pub fn is_null(&self) -> bool {
        matches!(self, Eid::Null)
    }

    /// The endpoint that designates this EID's node: the `dtn` authority with
    /// an empty demux, or the ipn node with service number 0.  The null
    /// endpoint has no node.
    pub fn node_id(&self) -> Option<Eid> {
        match self {
            Eid::Null => None,
            Eid::Dtn { node_name, .. } => Some(Eid::Dtn {
                node_name: node_name.clone(),
                demux: "".into(),
            }),
            Eid::Ipn { node_number, .. } => Some(Eid::Ipn {
                node_number: *node_number,
                service_number: 0,
            }),
        }
    }

    /// True when both EIDs designate the same node, regardless of the demux
    /// or service part.  This is the "proper prefix" rule for hierarchical
    /// `dtn` endpoints.
    pub fn matches_node(&self, other: &Eid) -> bool {
        match (self, other) {
            (Eid::Dtn { node_name: a, .. }, Eid::Dtn { node_name: b, .. }) => a == b,
            (Eid::Ipn { node_number: a, .. }, Eid::Ipn { node_number: b, .. }) => a == b,
            _ => false,
        }
    }

    pub(crate) fn emit_cbor(&self, encoder: &mut cbor::encode::Encoder) {
        encoder.emit_array(2, |a| match self {
            Eid::Null => {
                a.emit_uint(1);
                a.emit_uint(0);
            }
            Eid::Dtn { node_name, demux } => {
                a.emit_uint(1);
                a.emit_text(&format!("//{node_name}/{demux}"));
            }
            Eid::Ipn {
                node_number,
                service_number,
            } => {
                a.emit_uint(2);
                a.emit_array(2, |a| {
                    a.emit_uint(*node_number);
                    a.emit_uint(*service_number);
                });
            }
        })
    }

    pub(crate) fn parse_cbor(decoder: &mut cbor::decode::Decoder) -> Result<Self, EidError> {
        decoder.parse_array()?;
        match decoder.parse_uint()? {
            1 => {
                // dtn: either the uint 0 (dtn:none) or the SSP text
                if decoder.peek_major()? == 0 {
                    if decoder.parse_uint()? == 0 {
                        Ok(Eid::Null)
                    } else {
                        Err(EidError::InvalidDtnSsp("non-zero uint".to_string()))
                    }
                } else {
                    parse_dtn_ssp(decoder.parse_text()?)
                }
            }
            2 => {
                decoder.parse_array()?;
                Ok(Eid::Ipn {
                    node_number: decoder.parse_uint()?,
                    service_number: decoder.parse_uint()?,
                })
            }
            scheme => Err(EidError::UnknownSchemeNumber(scheme)),
        }
    }
}

fn parse_dtn_ssp(ssp: &str) -> Result<Eid, EidError> {
    if ssp == "none" {
        return Ok(Eid::Null);
    }
    let Some(rest) = ssp.strip_prefix("//") else {
        return Err(EidError::InvalidDtnSsp(ssp.to_string()));
    };
    let (node_name, demux) = rest.split_once('/').unwrap_or((rest, ""));
    if node_name.is_empty() {
        return Err(EidError::InvalidDtnSsp(ssp.to_string()));
    }
    Ok(Eid::Dtn {
        node_name: node_name.into(),
        demux: demux.into(),
    })
}

impl std::str::FromStr for Eid {
    type Err = EidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(ssp) = s.strip_prefix("dtn:") {
            parse_dtn_ssp(ssp)
        } else if let Some(ssp) = s.strip_prefix("ipn:") {
            let Some((node, service)) = ssp.split_once('.') else {
                return Err(EidError::InvalidIpnSsp(ssp.to_string()));
            };
            Ok(Eid::Ipn {
                node_number: node
                    .parse()
                    .map_err(|_| EidError::InvalidIpnSsp(ssp.to_string()))?,
                service_number: service
                    .parse()
                    .map_err(|_| EidError::InvalidIpnSsp(ssp.to_string()))?,
            })
        } else {
            Err(EidError::UnsupportedScheme(s.to_string()))
        }
    }
}

impl std::fmt::Display for Eid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Eid::Null => f.write_str("dtn:none"),
            Eid::Dtn { node_name, demux } => write!(f, "dtn://{node_name}/{demux}"),
            Eid::Ipn {
                node_number,
                service_number,
            } => write!(f, "ipn:{node_number}.{service_number}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(s: &str) -> Eid {
        let eid: Eid = s.parse().unwrap();
        assert_eq!(eid.to_string(), s);
        eid
    }

    #[test]
    fn parse_dtn() {
        assert_eq!("dtn:none".parse::<Eid>().unwrap(), Eid::Null);
        assert_eq!(
            round_trip("dtn://node/incoming"),
            Eid::Dtn {
                node_name: "node".into(),
                demux: "incoming".into()
            }
        );
        round_trip("dtn://node/");
        assert!("dtn:node".parse::<Eid>().is_err());
        assert!("dtn:///".parse::<Eid>().is_err());
    }

    #[test]
    fn parse_ipn() {
        assert_eq!(
            round_trip("ipn:23.42"),
            Eid::Ipn {
                node_number: 23,
                service_number: 42
            }
        );
        assert!("ipn:23".parse::<Eid>().is_err());
        assert!("ipn:x.1".parse::<Eid>().is_err());
        assert!("tcp://1.2.3.4".parse::<Eid>().is_err());
    }

    #[test]
    fn node_matching() {
        let node: Eid = "dtn://n1/".parse().unwrap();
        let app: Eid = "dtn://n1/app".parse().unwrap();
        let other: Eid = "dtn://n2/app".parse().unwrap();
        assert!(node.matches_node(&app));
        assert!(app.matches_node(&node));
        assert!(!node.matches_node(&other));
        assert!(!node.matches_node(&Eid::Null));

        let ipn_a: Eid = "ipn:7.0".parse().unwrap();
        let ipn_b: Eid = "ipn:7.99".parse().unwrap();
        assert!(ipn_a.matches_node(&ipn_b));
        assert!(!ipn_a.matches_node(&node));

        assert_eq!(app.node_id(), Some(node));
        assert_eq!(Eid::Null.node_id(), None);
    }

    #[test]
    fn cbor_round_trip() {
        for s in ["dtn:none", "dtn://node/a/b", "ipn:1.2"] {
            let eid: Eid = s.parse().unwrap();
            let mut encoder = cbor::encode::Encoder::new();
            eid.emit_cbor(&mut encoder);
            let data = encoder.build();
            let mut decoder = cbor::decode::Decoder::new(&data);
            assert_eq!(Eid::parse_cbor(&mut decoder).unwrap(), eid);
        }
    }
}
