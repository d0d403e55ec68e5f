use crate::{cbor, creation_timestamp::CreationTimestamp, eid::Eid, error::CaptureFieldErr, Error};
use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// Fragmentation identity fields: present only when the bundle is a fragment.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentInfo {
    pub offset: u64,
    pub total_adu_length: u64,
}

/// The identity of a bundle: source endpoint, creation timestamp, and (for
/// fragments) the fragment offset and total application data length.
#[derive(
    Default, Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BundleId {
    pub source: Eid,
    pub timestamp: CreationTimestamp,
    pub fragment_info: Option<FragmentInfo>,
}

impl BundleId {
    /// A printable, filesystem-safe key for this identity.
    pub fn to_key(&self) -> String {
        let mut encoder = cbor::encode::Encoder::new();
        encoder.emit_array(
            if self.fragment_info.is_some() { 5 } else { 3 },
            |a| {
                self.source.emit_cbor(a);
                a.emit_uint(
                    self.timestamp
                        .creation_time
                        .map(|t| t.millisecs())
                        .unwrap_or(0),
                );
                a.emit_uint(self.timestamp.sequence_number);
                if let Some(fragment_info) = &self.fragment_info {
                    a.emit_uint(fragment_info.offset);
                    a.emit_uint(fragment_info.total_adu_length);
                }
            },
        );
        BASE64_URL_SAFE_NO_PAD.encode(encoder.build())
    }

    pub fn from_key(key: &str) -> Result<Self, Error> {
        let data = BASE64_URL_SAFE_NO_PAD
            .decode(key)
            .map_field_err("bundle id key")?;
        let mut decoder = cbor::decode::Decoder::new(&data);
        let count = decoder.parse_array()?;
        let source = Eid::parse_cbor(&mut decoder).map_field_err("source EID")?;
        let creation_time = decoder.parse_uint()?;
        let id = Self {
            source,
            timestamp: CreationTimestamp {
                creation_time: (creation_time != 0)
                    .then(|| crate::dtn_time::DtnTime::new(creation_time)),
                sequence_number: decoder.parse_uint()?,
            },
            fragment_info: if count == 5 {
                Some(FragmentInfo {
                    offset: decoder.parse_uint()?,
                    total_adu_length: decoder.parse_uint()?,
                })
            } else {
                None
            },
        };
        decoder.end()?;
        Ok(id)
    }
}

impl std::fmt::Display for BundleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.source, self.timestamp)?;
        if let Some(fragment_info) = &self.fragment_info {
            write!(
                f,
                "-{}:{}",
                fragment_info.offset, fragment_info.total_adu_length
            )?;
        }
        Ok(())
    }
}
