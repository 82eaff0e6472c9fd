use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no SMTP settings loaded")]
    NoSettings,

    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("message build error: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("address error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("attachment decode error: {0}")]
    Attachment(#[from] base64::DecodeError),

    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error(transparent)]
    Store(#[from] scnorion_store::StoreError),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
