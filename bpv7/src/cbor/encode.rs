const MAJOR_UINT: u8 = 0;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_SIMPLE: u8 = 7;

/// A streaming CBOR encoder over an owned buffer.
#[derive(Default)]
pub struct Encoder {
    data: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit_header(&mut self, major: u8, value: u64) {
        let major = major << 5;
        match value {
            0..=23 => self.data.push(major | value as u8),
            24..=0xFF => {
                self.data.push(major | 24);
                self.data.push(value as u8);
            }
            0x100..=0xFFFF => {
                self.data.push(major | 25);
                self.data.extend((value as u16).to_be_bytes());
            }
            0x1_0000..=0xFFFF_FFFF => {
                self.data.push(major | 26);
                self.data.extend((value as u32).to_be_bytes());
            }
            _ => {
                self.data.push(major | 27);
                self.data.extend(value.to_be_bytes());
            }
        }
    }

    pub fn emit_uint(&mut self, value: u64) {
        self.emit_header(MAJOR_UINT, value);
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.data.push((MAJOR_SIMPLE << 5) | if value { 21 } else { 20 });
    }

    pub fn emit_bytes(&mut self, value: &[u8]) {
        self.emit_header(MAJOR_BYTES, value.len() as u64);
        self.data.extend(value);
    }

    pub fn emit_text(&mut self, value: &str) {
        self.emit_header(MAJOR_TEXT, value.len() as u64);
        self.data.extend(value.as_bytes());
    }

    /// Emits a definite-length array of `count` items, written by `f`.
    pub fn emit_array(&mut self, count: usize, f: impl FnOnce(&mut Self)) {
        self.emit_header(MAJOR_ARRAY, count as u64);
        f(self)
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Convenience wrapper: encode a single definite-length array.
pub fn emit_array(count: usize, f: impl FnOnce(&mut Encoder)) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder.emit_array(count, f);
    encoder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_widths() {
        let mut e = Encoder::new();
        e.emit_uint(0);
        e.emit_uint(23);
        e.emit_uint(24);
        e.emit_uint(0x1234);
        e.emit_uint(0x1_0000);
        e.emit_uint(u64::MAX);
        assert_eq!(
            e.build(),
            vec![
                0x00, 0x17, 0x18, 0x18, 0x19, 0x12, 0x34, 0x1A, 0x00, 0x01, 0x00, 0x00, 0x1B,
                0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF
            ]
        );
    }

    #[test]
    fn arrays_and_strings() {
        let data = emit_array(3, |a| {
            a.emit_bool(true);
            a.emit_text("hi");
            a.emit_bytes(&[1, 2, 3]);
        });
        assert_eq!(data, vec![0x83, 0xF5, 0x62, b'h', b'i', 0x43, 1, 2, 3]);
    }
}
