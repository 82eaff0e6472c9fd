use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] openssl::error::ErrorStack),

    #[error("packaging error: {0}")]
    Packaging(String),

    #[error(transparent)]
    Store(#[from] scnorion_store::StoreError),

    #[error(transparent)]
    Bus(#[from] scnorion_bus::BusError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type CaResult<T> = Result<T, CaError>;
