pub mod db;
pub mod in_memory;
pub mod models;
pub mod pg;
pub mod schema;
pub mod store;

mod error;

pub use error::Error;
pub use in_memory::InMemoryStore;
pub use pg::PgStore;
pub use store::{AgentStore, MemoryStore, QueueStore, Store};

pub type Result<T, E = Error> = std::result::Result<T, E>;
