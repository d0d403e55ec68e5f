/*!
A data model for Bundle Protocol Version 7 (BPv7) bundles, as defined in
[RFC 9171](https://www.rfc-editor.org/rfc/rfc9171.html).

This crate provides the in-memory representation of a bundle that the
`drover-bpa` processing pipeline operates on: endpoint identifiers,
primary-block fields, canonical blocks with typed payloads, bundle identity,
and administrative records.  The full on-wire bundle codec is a
convergence-layer concern and is not part of this crate; only the
administrative-record payload format and the printable bundle-id key are
encoded here.

# Key Modules

- [`bundle`]: The primary [`Bundle`](bundle::Bundle) struct and its accessors.
- [`builder`]: A fluent [`Builder`](builder::Builder) for constructing new bundles.
- [`eid`]: Endpoint Identifiers (EIDs) for the `dtn` and `ipn` schemes.
- [`block`]: Canonical blocks and their typed payloads.
- [`status_report`]: Bundle status reports and administrative records.

# Usage Example

```rust
use drover_bpv7::builder::Builder;

let bundle = Builder::new()
    .source("dtn://src/")
    .destination("dtn://dest/incoming")
    .lifetime("30m")
    .hop_count(64)
    .payload(b"hello world".to_vec())
    .build()
    .unwrap();

assert_eq!(bundle.destination.to_string(), "dtn://dest/incoming");
```
*/

pub mod block;
pub mod block_flags;
pub mod block_type;
pub mod builder;
pub mod bundle;
pub mod bundle_flags;
pub mod bundle_id;
pub mod cbor;
pub mod crc;
pub mod creation_timestamp;
pub mod dtn_time;
pub mod eid;
pub mod hop_info;
pub mod status_report;

mod error;
pub use error::Error;
