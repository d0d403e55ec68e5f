use super::*;
use drover_bpv7::{bundle::Bundle, dtn_time::DtnTime, eid::Eid};
use std::collections::HashMap;

/// Reconciles creation-timestamp sequence numbers for locally originated
/// bundles, so that every bundle identity issued for a given source is
/// unique over the process lifetime.
///
/// Updated only by the pipeline's transmit entry point.
#[derive(Default)]
pub struct IdKeeper {
    seen: HashMap<Eid, LastIssued>,
}

struct LastIssued {
    creation_time: Option<DtnTime>,
    sequence_number: u64,
}

impl IdKeeper {
    /// Assigns the next sequence number for the bundle's source if and only
    /// if its existing timestamp collides with one already seen.
    pub fn update(&mut self, bundle: &mut Bundle) {
        let timestamp = &mut bundle.id.timestamp;

        match self.seen.get_mut(&bundle.id.source) {
            Some(last) if last.creation_time == timestamp.creation_time => {
                if timestamp.sequence_number <= last.sequence_number {
                    last.sequence_number += 1;
                    trace!(
                        "Assigned sequence number {} for {}",
                        last.sequence_number,
                        bundle.id.source
                    );
                    timestamp.sequence_number = last.sequence_number;
                } else {
                    last.sequence_number = timestamp.sequence_number;
                }
            }
            _ => {
                self.seen.insert(
                    bundle.id.source.clone(),
                    LastIssued {
                        creation_time: timestamp.creation_time,
                        sequence_number: timestamp.sequence_number,
                    },
                );
            }
        }
    }
}
