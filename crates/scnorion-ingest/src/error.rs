use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] scnorion_store::StoreError),

    #[error(transparent)]
    Bus(#[from] scnorion_bus::BusError),

    #[error("compile error: {0}")]
    Compile(String),
}

pub type IngestResult<T> = Result<T, IngestError>;
