use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Need at least {0} more bytes of data")]
    NeedMoreData(usize),

    #[error("Expecting {expected}, found {found}")]
    IncorrectType { expected: &'static str, found: u8 },

    #[error("Indefinite-length items are not supported")]
    IndefiniteLength,

    #[error("Reserved additional-information value {0}")]
    ReservedAdditionalInfo(u8),

    #[error("Invalid UTF-8 in text string")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("{0} bytes of additional data after end of CBOR item")]
    AdditionalData(usize),
}

/// A cursor-style decoder over a CBOR byte slice.
///
/// Only the subset emitted by [`super::encode`] is understood; anything else
/// is an error, which the pipeline treats as an unintelligible record.
pub struct Decoder<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read_header(&mut self) -> Result<(u8, u64), Error> {
        let Some(&initial) = self.data.get(self.offset) else {
            return Err(Error::NeedMoreData(1));
        };
        self.offset += 1;

        let major = initial >> 5;
        let info = initial & 0x1F;
        let value = match info {
            0..=23 => info as u64,
            24..=27 => {
                let len = 1usize << (info - 24);
                let Some(bytes) = self.data.get(self.offset..self.offset + len) else {
                    return Err(Error::NeedMoreData(len));
                };
                self.offset += len;
                bytes.iter().fold(0u64, |v, b| (v << 8) | *b as u64)
            }
            31 => return Err(Error::IndefiniteLength),
            info => return Err(Error::ReservedAdditionalInfo(info)),
        };
        Ok((major, value))
    }

    pub fn parse_uint(&mut self) -> Result<u64, Error> {
        match self.read_header()? {
            (0, value) => Ok(value),
            (major, _) => Err(Error::IncorrectType {
                expected: "unsigned integer",
                found: major,
            }),
        }
    }

    pub fn parse_bool(&mut self) -> Result<bool, Error> {
        match self.read_header()? {
            (7, 20) => Ok(false),
            (7, 21) => Ok(true),
            (major, _) => Err(Error::IncorrectType {
                expected: "boolean",
                found: major,
            }),
        }
    }

    pub fn parse_bytes(&mut self) -> Result<&'a [u8], Error> {
        match self.read_header()? {
            (2, len) => self.take(len as usize),
            (major, _) => Err(Error::IncorrectType {
                expected: "byte string",
                found: major,
            }),
        }
    }

    pub fn parse_text(&mut self) -> Result<&'a str, Error> {
        match self.read_header()? {
            (3, len) => Ok(std::str::from_utf8(self.take(len as usize)?)?),
            (major, _) => Err(Error::IncorrectType {
                expected: "text string",
                found: major,
            }),
        }
    }

    /// Opens a definite-length array, returning its item count.
    pub fn parse_array(&mut self) -> Result<u64, Error> {
        match self.read_header()? {
            (4, count) => Ok(count),
            (major, _) => Err(Error::IncorrectType {
                expected: "array",
                found: major,
            }),
        }
    }

    /// The major type of the next item, without consuming it.
    pub fn peek_major(&self) -> Result<u8, Error> {
        self.data
            .get(self.offset)
            .map(|b| b >> 5)
            .ok_or(Error::NeedMoreData(1))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let Some(bytes) = self.data.get(self.offset..self.offset + len) else {
            return Err(Error::NeedMoreData(len));
        };
        self.offset += len;
        Ok(bytes)
    }

    /// Fails unless every byte of the input has been consumed.
    pub fn end(&self) -> Result<(), Error> {
        if self.offset < self.data.len() {
            Err(Error::AdditionalData(self.data.len() - self.offset))
        } else {
            Ok(())
        }
    }
}
