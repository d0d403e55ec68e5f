use crate::{
    bundle::Bundle,
    bundle_id::{BundleId, FragmentInfo},
    cbor,
    creation_timestamp::CreationTimestamp,
    dtn_time::DtnTime,
    eid::Eid,
    error::CaptureFieldErr,
    Error,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusReportError {
    #[error("Unknown administrative record type {0}")]
    UnknownRecordType(u64),

    #[error("Malformed status assertion")]
    MalformedAssertion,

    #[error(transparent)]
    InvalidCbor(#[from] cbor::decode::Error),

    #[error(transparent)]
    InvalidEid(#[from] crate::eid::EidError),
}

/// Status report reason codes, RFC 9171 section 9.4.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonCode {
    #[default]
    NoInformation,
    LifetimeExpired,
    ForwardedUnidirectionalLink,
    TransmissionCanceled,
    DepletedStorage,
    DestinationEndpointUnintelligible,
    NoRouteToDestination,
    NoTimelyContact,
    BlockUnintelligible,
    HopLimitExceeded,
    TrafficPared,
    Unassigned(u64),
}

impl From<ReasonCode> for u64 {
    fn from(value: ReasonCode) -> Self {
        match value {
            ReasonCode::NoInformation => 0,
            ReasonCode::LifetimeExpired => 1,
            ReasonCode::ForwardedUnidirectionalLink => 2,
            ReasonCode::TransmissionCanceled => 3,
            ReasonCode::DepletedStorage => 4,
            ReasonCode::DestinationEndpointUnintelligible => 5,
            ReasonCode::NoRouteToDestination => 6,
            ReasonCode::NoTimelyContact => 7,
            ReasonCode::BlockUnintelligible => 8,
            ReasonCode::HopLimitExceeded => 9,
            ReasonCode::TrafficPared => 10,
            ReasonCode::Unassigned(v) => v,
        }
    }
}

impl From<u64> for ReasonCode {
    fn from(value: u64) -> Self {
        match value {
            0 => ReasonCode::NoInformation,
            1 => ReasonCode::LifetimeExpired,
            2 => ReasonCode::ForwardedUnidirectionalLink,
            3 => ReasonCode::TransmissionCanceled,
            4 => ReasonCode::DepletedStorage,
            5 => ReasonCode::DestinationEndpointUnintelligible,
            6 => ReasonCode::NoRouteToDestination,
            7 => ReasonCode::NoTimelyContact,
            8 => ReasonCode::BlockUnintelligible,
            9 => ReasonCode::HopLimitExceeded,
            10 => ReasonCode::TrafficPared,
            v => ReasonCode::Unassigned(v),
        }
    }
}

/// The four kinds of status information a report can assert about its
/// subject bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusInformation {
    ReceivedBundle,
    ForwardedBundle,
    DeliveredBundle,
    DeletedBundle,
}

/// A single status assertion: asserted, with an optional assertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusAssertion(pub Option<DtnTime>);

fn emit_status_assertion(a: &mut cbor::encode::Encoder, assertion: &Option<StatusAssertion>) {
    match assertion {
        None => a.emit_array(1, |a| a.emit_bool(false)),
        Some(StatusAssertion(None)) => a.emit_array(1, |a| a.emit_bool(true)),
        Some(StatusAssertion(Some(timestamp))) => a.emit_array(2, |a| {
            a.emit_bool(true);
            a.emit_uint(timestamp.millisecs());
        }),
    }
}

fn parse_status_assertion(
    d: &mut cbor::decode::Decoder,
) -> Result<Option<StatusAssertion>, StatusReportError> {
    match d.parse_array()? {
        1 => {
            if d.parse_bool()? {
                Ok(Some(StatusAssertion(None)))
            } else {
                Ok(None)
            }
        }
        2 => {
            if !d.parse_bool()? {
                return Err(StatusReportError::MalformedAssertion);
            }
            Ok(Some(StatusAssertion(Some(DtnTime::new(d.parse_uint()?)))))
        }
        _ => Err(StatusReportError::MalformedAssertion),
    }
}

/// A bundle status report, RFC 9171 section 6.1.1.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct BundleStatusReport {
    pub bundle_id: BundleId,
    pub received: Option<StatusAssertion>,
    pub forwarded: Option<StatusAssertion>,
    pub delivered: Option<StatusAssertion>,
    pub deleted: Option<StatusAssertion>,
    pub reason: ReasonCode,
}

impl BundleStatusReport {
    /// A report asserting a single kind of status information about
    /// `subject`, with the assertion time filled in when the subject
    /// requested status times.
    pub fn new(
        subject: &Bundle,
        status: StatusInformation,
        reason: ReasonCode,
        timestamp: Option<DtnTime>,
    ) -> Self {
        let assertion = Some(StatusAssertion(if subject.flags.report_status_time {
            timestamp
        } else {
            None
        }));

        let mut report = Self {
            bundle_id: subject.id.clone(),
            reason,
            ..Default::default()
        };
        match status {
            StatusInformation::ReceivedBundle => report.received = assertion,
            StatusInformation::ForwardedBundle => report.forwarded = assertion,
            StatusInformation::DeliveredBundle => report.delivered = assertion,
            StatusInformation::DeletedBundle => report.deleted = assertion,
        }
        report
    }

    /// The kinds of status information this report asserts.
    pub fn asserted(&self) -> Vec<StatusInformation> {
        let mut asserted = Vec::new();
        if self.received.is_some() {
            asserted.push(StatusInformation::ReceivedBundle);
        }
        if self.forwarded.is_some() {
            asserted.push(StatusInformation::ForwardedBundle);
        }
        if self.delivered.is_some() {
            asserted.push(StatusInformation::DeliveredBundle);
        }
        if self.deleted.is_some() {
            asserted.push(StatusInformation::DeletedBundle);
        }
        asserted
    }

    fn emit_cbor(&self, a: &mut cbor::encode::Encoder) {
        a.emit_array(
            if self.bundle_id.fragment_info.is_some() {
                6
            } else {
                4
            },
            |a| {
                a.emit_array(4, |a| {
                    emit_status_assertion(a, &self.received);
                    emit_status_assertion(a, &self.forwarded);
                    emit_status_assertion(a, &self.delivered);
                    emit_status_assertion(a, &self.deleted);
                });
                a.emit_uint(self.reason.into());
                self.bundle_id.source.emit_cbor(a);
                a.emit_array(2, |a| {
                    a.emit_uint(
                        self.bundle_id
                            .timestamp
                            .creation_time
                            .map(|t| t.millisecs())
                            .unwrap_or(0),
                    );
                    a.emit_uint(self.bundle_id.timestamp.sequence_number);
                });
                if let Some(fragment_info) = &self.bundle_id.fragment_info {
                    a.emit_uint(fragment_info.offset);
                    a.emit_uint(fragment_info.total_adu_length);
                }
            },
        )
    }

    fn parse_cbor(d: &mut cbor::decode::Decoder) -> Result<Self, StatusReportError> {
        let count = d.parse_array()?;
        if d.parse_array()? != 4 {
            return Err(StatusReportError::MalformedAssertion);
        }

        let mut report = Self {
            received: parse_status_assertion(d)?,
            forwarded: parse_status_assertion(d)?,
            delivered: parse_status_assertion(d)?,
            deleted: parse_status_assertion(d)?,
            ..Default::default()
        };
        report.reason = d.parse_uint()?.into();

        let source = Eid::parse_cbor(d)?;
        d.parse_array()?;
        let creation_time = d.parse_uint()?;
        report.bundle_id = BundleId {
            source,
            timestamp: CreationTimestamp {
                creation_time: (creation_time != 0).then(|| DtnTime::new(creation_time)),
                sequence_number: d.parse_uint()?,
            },
            fragment_info: if count == 6 {
                Some(FragmentInfo {
                    offset: d.parse_uint()?,
                    total_adu_length: d.parse_uint()?,
                })
            } else {
                None
            },
        };
        Ok(report)
    }
}

/// An administrative record, carried as the payload of a bundle whose
/// primary-block flags mark it administrative.  Record type 1 is the bundle
/// status report.
#[derive(Debug, Clone, PartialEq)]
pub enum AdministrativeRecord {
    BundleStatusReport(BundleStatusReport),
}

impl AdministrativeRecord {
    /// Encodes this record as payload-block bytes.
    pub fn to_payload(&self) -> Vec<u8> {
        cbor::encode::emit_array(2, |a| match self {
            AdministrativeRecord::BundleStatusReport(report) => {
                a.emit_uint(1);
                report.emit_cbor(a);
            }
        })
    }

    /// Decodes a record from payload-block bytes.
    pub fn from_payload(data: &[u8]) -> Result<Self, Error> {
        let mut d = cbor::decode::Decoder::new(data);
        d.parse_array()?;
        match d.parse_uint()? {
            1 => {
                let report =
                    BundleStatusReport::parse_cbor(&mut d).map_field_err("bundle status report")?;
                d.end()?;
                Ok(AdministrativeRecord::BundleStatusReport(report))
            }
            v => Err(Error::InvalidField {
                field: "administrative record type",
                source: StatusReportError::UnknownRecordType(v).into(),
            }),
        }
    }
}
