//! Project access: where source text comes from.

mod loader;

pub use loader::{ContentLoader, FsLoader, LoadError, MemoryLoader};
