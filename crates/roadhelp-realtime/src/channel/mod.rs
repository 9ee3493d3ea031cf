//! Named delivery channels (rooms) over the connection pool.

pub mod registry;
pub mod types;

pub use registry::ChannelRegistry;
pub use types::ChannelType;
