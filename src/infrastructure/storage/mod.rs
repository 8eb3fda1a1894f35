mod compression;
mod local_filesystem_store;
mod memory_store;
mod path_builder;

pub use local_filesystem_store::LocalFilesystemStore;
pub use memory_store::MemoryStore;
pub use path_builder::PathBuilder;
