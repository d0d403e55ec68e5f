use crate::{
    block::{BlockData, CanonicalBlock},
    block_flags::BlockFlags,
    bundle::Bundle,
    bundle_flags::BundleFlags,
    bundle_id::BundleId,
    crc::CrcType,
    creation_timestamp::CreationTimestamp,
    eid::Eid,
    hop_info::HopInfo,
    Error,
};

/// An endpoint argument to the [`Builder`]: either an already parsed [`Eid`]
/// or its URI text, resolved at build time.
#[derive(Debug, Clone)]
pub enum EndpointSpec {
    Parsed(Eid),
    Text(String),
}

impl EndpointSpec {
    fn resolve(self) -> Result<Eid, Error> {
        match self {
            EndpointSpec::Parsed(eid) => Ok(eid),
            EndpointSpec::Text(s) => s.parse().map_err(Error::InvalidEid),
        }
    }
}

impl From<Eid> for EndpointSpec {
    fn from(eid: Eid) -> Self {
        EndpointSpec::Parsed(eid)
    }
}

impl From<&str> for EndpointSpec {
    fn from(s: &str) -> Self {
        EndpointSpec::Text(s.to_string())
    }
}

/// A duration argument to the [`Builder`]: a microsecond count or a duration
/// string such as `"30m"`, resolved at build time.
#[derive(Debug, Clone)]
pub enum DurationSpec {
    Micros(u64),
    Text(String),
}

impl DurationSpec {
    fn resolve(self) -> Result<u64, Error> {
        match self {
            DurationSpec::Micros(us) => Ok(us),
            DurationSpec::Text(s) => {
                let duration =
                    humantime::parse_duration(&s).map_err(|e| Error::InvalidLifetime(e.to_string()))?;
                u64::try_from(duration.as_micros())
                    .map_err(|_| Error::InvalidLifetime(s))
            }
        }
    }
}

impl From<u64> for DurationSpec {
    fn from(us: u64) -> Self {
        DurationSpec::Micros(us)
    }
}

impl From<std::time::Duration> for DurationSpec {
    fn from(duration: std::time::Duration) -> Self {
        DurationSpec::Micros(duration.as_micros().min(u64::MAX as u128) as u64)
    }
}

impl From<&str> for DurationSpec {
    fn from(s: &str) -> Self {
        DurationSpec::Text(s.to_string())
    }
}

/// A fluent builder for new bundles.
///
/// ```rust
/// # use drover_bpv7::builder::Builder;
/// let bundle = Builder::new()
///     .source("dtn://src/")
///     .destination("dtn://dest/")
///     .lifetime("30m")
///     .hop_count(64)
///     .payload(b"hello world".to_vec())
///     .build()
///     .unwrap();
/// ```
pub struct Builder {
    flags: BundleFlags,
    crc_type: CrcType,
    source: Option<EndpointSpec>,
    destination: Option<EndpointSpec>,
    report_to: Option<EndpointSpec>,
    creation_timestamp: CreationTimestamp,
    lifetime: DurationSpec,
    hop_limit: Option<u64>,
    previous_node: Option<EndpointSpec>,
    payload: Option<Vec<u8>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            flags: BundleFlags::default(),
            crc_type: CrcType::Crc32Castagnoli,
            source: None,
            destination: None,
            report_to: None,
            creation_timestamp: CreationTimestamp::now(),
            lifetime: DurationSpec::Micros(24 * 60 * 60 * 1_000_000),
            hop_limit: None,
            previous_node: None,
            payload: None,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn flags(mut self, flags: BundleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Marks the bundle as carrying an administrative record.
    pub fn administrative(mut self) -> Self {
        self.flags.is_admin_record = true;
        self
    }

    pub fn crc_type(mut self, crc_type: CrcType) -> Self {
        self.crc_type = crc_type;
        self
    }

    pub fn source(mut self, source: impl Into<EndpointSpec>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn destination(mut self, destination: impl Into<EndpointSpec>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn report_to(mut self, report_to: impl Into<EndpointSpec>) -> Self {
        self.report_to = Some(report_to.into());
        self
    }

    pub fn creation_timestamp(mut self, timestamp: CreationTimestamp) -> Self {
        self.creation_timestamp = timestamp;
        self
    }

    pub fn lifetime(mut self, lifetime: impl Into<DurationSpec>) -> Self {
        self.lifetime = lifetime.into();
        self
    }

    pub fn hop_count(mut self, limit: u64) -> Self {
        self.hop_limit = Some(limit);
        self
    }

    /// Records the forwarding node in a Previous Node block.
    pub fn previous_node(mut self, node: impl Into<EndpointSpec>) -> Self {
        self.previous_node = Some(node.into());
        self
    }

    pub fn payload(mut self, data: Vec<u8>) -> Self {
        self.payload = Some(data);
        self
    }

    pub fn build(self) -> Result<Bundle, Error> {
        let (Some(source), Some(destination)) = (self.source, self.destination) else {
            return Err(Error::MissingEndpoints);
        };
        let source = source.resolve()?;
        let destination = destination.resolve()?;
        if destination.is_null() {
            return Err(Error::NullDestination);
        }

        // Report-to defaults to the source
        let report_to = match self.report_to {
            Some(report_to) => report_to.resolve()?,
            None => source.clone(),
        };

        let mut bundle = Bundle {
            id: BundleId {
                source,
                timestamp: self.creation_timestamp,
                fragment_info: None,
            },
            flags: self.flags,
            crc_type: self.crc_type,
            destination,
            report_to,
            lifetime: self.lifetime.resolve()?,
            blocks: vec![CanonicalBlock::new_payload_block(
                self.payload.unwrap_or_default(),
            )],
        };

        if let Some(limit) = self.hop_limit {
            bundle.add_extension_block(BlockFlags::default(), BlockData::HopCount(HopInfo::new(limit)));
        }

        if let Some(previous_node) = self.previous_node {
            bundle.add_extension_block(
                BlockFlags::default(),
                BlockData::PreviousNode(previous_node.resolve()?),
            );
        }

        // Clockless sources must carry a Bundle Age block
        if bundle.id.timestamp.creation_time.is_none() {
            bundle.add_extension_block(BlockFlags::default(), BlockData::BundleAge(0));
        }

        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_type::BlockType;

    #[test]
    fn text_specs() {
        let bundle = Builder::new()
            .source("dtn://src/")
            .destination("dtn://dest/app")
            .lifetime("30m")
            .payload(b"hi".to_vec())
            .build()
            .unwrap();

        assert_eq!(bundle.lifetime, 30 * 60 * 1_000_000);
        assert_eq!(bundle.report_to, bundle.id.source);
        assert_eq!(bundle.payload(), Some(b"hi".as_slice()));
    }

    #[test]
    fn clockless_source_gets_age_block() {
        let bundle = Builder::new()
            .source(Eid::Null)
            .destination("ipn:2.1")
            .creation_timestamp(CreationTimestamp::clockless())
            .build()
            .unwrap();

        assert_eq!(bundle.age(), Some(0));
        assert!(bundle.extension_block(BlockType::BundleAge).is_some());
    }

    #[test]
    fn validation() {
        assert!(matches!(
            Builder::new().source("dtn://src/").build(),
            Err(Error::MissingEndpoints)
        ));
        assert!(matches!(
            Builder::new()
                .source("dtn://src/")
                .destination(Eid::Null)
                .build(),
            Err(Error::NullDestination)
        ));
        assert!(matches!(
            Builder::new()
                .source("dtn://src/")
                .destination("dtn://dest/")
                .lifetime("not a duration")
                .build(),
            Err(Error::InvalidLifetime(_))
        ));
    }
}
