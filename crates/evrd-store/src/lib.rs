pub mod directory;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod queue;

pub use directory::SiteDirectory;
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use queue::EventQueue;
