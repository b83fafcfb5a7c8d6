pub mod channel;
pub mod error;
pub mod memory;
pub mod message;
pub mod postgres;

pub use channel::EventChannel;
pub use error::{ChannelError, Result};
pub use memory::{InMemoryEventChannel, PUBLISHED_HISTORY_LIMIT};
pub use message::{Message, MessageId};
pub use postgres::PostgresEventChannel;
