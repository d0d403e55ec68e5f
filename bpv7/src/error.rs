use thiserror::Error;

/// Top-level error type for bundle model operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Bundle has no payload block")]
    MissingPayload,

    #[error("Bundle payload block must be block number 1")]
    InvalidPayloadBlockNumber,

    #[error("Bundle has more than one block with block number {0}")]
    DuplicateBlockNumber(u64),

    #[error("Bundle has multiple {0:?} blocks")]
    DuplicateBlocks(crate::block_type::BlockType),

    #[error("Bundle source has no clock, and there is no Bundle Age extension block")]
    MissingBundleAge,

    #[error("Both source and destination must be set")]
    MissingEndpoints,

    #[error("The null endpoint is not a valid destination")]
    NullDestination,

    #[error("Invalid lifetime duration: {0}")]
    InvalidLifetime(String),

    #[error(transparent)]
    InvalidEid(#[from] crate::eid::EidError),

    #[error(transparent)]
    InvalidCbor(#[from] crate::cbor::decode::Error),

    #[error("Failed to parse {field}: {source}")]
    InvalidField {
        field: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub(crate) trait CaptureFieldErr<T> {
    fn map_field_err(self, field: &'static str) -> Result<T, Error>;
}

impl<T, E: Into<Box<dyn std::error::Error + Send + Sync>>> CaptureFieldErr<T>
    for std::result::Result<T, E>
{
    fn map_field_err(self, field: &'static str) -> Result<T, Error> {
        self.map_err(|e| Error::InvalidField {
            field,
            source: e.into(),
        })
    }
}
