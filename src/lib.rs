//! Area map viewer core for Infinity Engine ARE/WED resources.
//!
//! Parses areas and their tile layouts, indexes their sub-structures by offset,
//! composites the tile map and exposes placed objects as renderable layers.

pub mod compositor;
pub mod config;
pub mod format;
pub mod index;
pub mod layer;
pub mod overlay;
pub mod resource;

#[cfg(test)]
mod testdata;

pub use compositor::{CompositorError, DoorState, Lighting, MapCompositor, VariantChange};
pub use config::{SettingsError, ViewerSettings};
pub use index::{CategoryKey, ContainerKind, StructureIndex};
pub use layer::{ItemDescriptor, LayerKind, LayerRegistry, Viewport};
pub use resource::{DirectoryProvider, MemoryProvider, ResourceProvider};
