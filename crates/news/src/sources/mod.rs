//! Feed source descriptors and the registry that holds them.

mod catalog;
mod registry;

pub use catalog::default_sources;
pub use registry::SourceRegistry;
