pub mod index;
pub mod loader;
pub mod memory;
pub mod store;

pub use index::VisitIndex;
pub use loader::{load_data_dir, LoadError, LoadSummary};
pub use memory::{MemoryAdapter, StoreCounts};
pub use store::EntityStore;
