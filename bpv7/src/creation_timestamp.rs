use crate::dtn_time::DtnTime;
use serde::{Deserialize, Serialize};

/// A bundle creation timestamp: the DTN time at which the bundle was created,
/// and a sequence number distinguishing bundles created within the same
/// millisecond.
///
/// A `creation_time` of `None` encodes the on-wire value zero, meaning the
/// originating node has no synchronized clock; such bundles must carry a
/// Bundle Age extension block instead.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CreationTimestamp {
    pub creation_time: Option<DtnTime>,
    pub sequence_number: u64,
}

impl CreationTimestamp {
    pub fn now() -> Self {
        Self {
            creation_time: Some(DtnTime::now()),
            sequence_number: 0,
        }
    }

    /// A zero creation time, for sources without a synchronized clock.
    pub fn clockless() -> Self {
        Self {
            creation_time: None,
            sequence_number: 0,
        }
    }
}

impl std::fmt::Display for CreationTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({},{})",
            self.creation_time.map(|t| t.millisecs()).unwrap_or(0),
            self.sequence_number
        )
    }
}
