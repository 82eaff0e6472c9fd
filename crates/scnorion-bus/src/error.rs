use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("connect error: {0}")]
    Connect(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("no reply subject on message")]
    NoReplySubject,
}

pub type BusResult<T> = Result<T, BusError>;
