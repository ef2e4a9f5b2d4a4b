pub mod index_build;
pub mod memory;
pub mod schema;
pub mod search;
pub mod store;
pub mod table;
pub mod writer;

pub use index_build::IndexBuilder;
pub use memory::MemoryStore;
pub use store::LanceStore;
