use serde::{Deserialize, Serialize};

/// CRC type codes, RFC 9171 section 4.2.1.
///
/// CRC calculation and verification happen at the wire codec; the model only
/// carries the declared type.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrcType {
    #[default]
    None,
    Crc16,
    Crc32Castagnoli,
}

impl From<CrcType> for u64 {
    fn from(value: CrcType) -> Self {
        match value {
            CrcType::None => 0,
            CrcType::Crc16 => 1,
            CrcType::Crc32Castagnoli => 2,
        }
    }
}
