pub mod error;
pub mod publisher;
pub mod token;

pub use error::BusError;
pub use publisher::{LoggingPublisher, PubSubPublisher, Publisher, EVENT_TOPIC};
pub use token::{AdcTokenProvider, StaticToken, TokenProvider};
