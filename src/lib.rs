//! # segmented_store - Indexed Segmented Stream Codec
//!
//! Stores a data unit as named channels. Each channel is a sequence of
//! parts, each part a sequence of segments, with side-car offset indexes
//! giving random access to any part or segment without scanning.
//!
//! ## Architecture Layers
//!
//! - **Domain**: value objects, entities, codec errors
//! - **Application**: the byte stream port, sessions and use cases
//! - **Codec**: offset index, nested, segment and multiplexed streams
//! - **Infrastructure**: filesystem and in-memory stream factories
//!
//! ## Example Usage
//!
//! ```no_run
//! use segmented_store::application::data_store::DataStore;
//! use segmented_store::domain::entities::DataUnit;
//! use segmented_store::infrastructure::storage::MemoryStore;
//! use std::io::Write;
//! use std::rc::Rc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = DataStore::new(Rc::new(MemoryStore::new()), 8192);
//! let unit = DataUnit::new(1u64, "document");
//!
//! let mut writer = store.open_writer_session(&unit);
//! writer.part(0)?.get()?.write_all(b"hello")?;
//! writer.close()?;
//!
//! let mut reader = store.open_reader_session(&unit);
//! let bytes = reader.part(0)?.get()?.read_to_vec()?;
//! assert_eq!(bytes, b"hello");
//! reader.close()?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod codec;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{data_store::DataStore, dto, ports, use_cases};
pub use config::Config;
pub use domain::errors::{CodecError, CodecResult, StorageError};
pub use domain::{entities, value_objects};
