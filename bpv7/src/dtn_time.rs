use serde::{Deserialize, Serialize};

const DTN_EPOCH: time::OffsetDateTime = time::macros::datetime!(2000-01-01 00:00:00 UTC);

/// A point in time expressed as milliseconds since the DTN epoch
/// (2000-01-01T00:00:00Z), per RFC 9171 section 4.2.6.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DtnTime {
    millisecs: u64,
}

impl DtnTime {
    pub fn now() -> Self {
        Self {
            millisecs: ((time::OffsetDateTime::now_utc() - DTN_EPOCH).whole_milliseconds()).max(0)
                as u64,
        }
    }

    pub fn new(millisecs: u64) -> Self {
        Self { millisecs }
    }

    pub fn millisecs(&self) -> u64 {
        self.millisecs
    }
}

impl TryFrom<time::OffsetDateTime> for DtnTime {
    type Error = time::error::ConversionRange;

    fn try_from(instant: time::OffsetDateTime) -> Result<Self, Self::Error> {
        let millisecs = (instant - DTN_EPOCH).whole_milliseconds();
        if millisecs < 0 || millisecs > u64::MAX as i128 {
            Err(time::error::ConversionRange)
        } else {
            Ok(Self {
                millisecs: millisecs as u64,
            })
        }
    }
}

impl From<DtnTime> for time::OffsetDateTime {
    fn from(dtn_time: DtnTime) -> Self {
        DTN_EPOCH.saturating_add(time::Duration::milliseconds(
            dtn_time.millisecs.min(i64::MAX as u64) as i64,
        ))
    }
}

impl std::fmt::Display for DtnTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", time::OffsetDateTime::from(*self))
    }
}
