//! A deliberately small CBOR subset: unsigned integers, booleans, byte and
//! text strings, and definite-length arrays.  This is all the framing the
//! administrative-record payload format and the printable bundle-id key
//! require; the full bundle wire codec lives with the convergence layers.

pub mod decode;
pub mod encode;
