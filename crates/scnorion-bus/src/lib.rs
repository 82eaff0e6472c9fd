pub mod error;
pub mod fake;
pub mod message;
pub mod nats;
pub mod traits;

pub use error::{BusError, BusResult};
pub use fake::FakeBus;
pub use message::IncomingMessage;
pub use nats::NatsBus;
pub use traits::{Bus, Subscription};
