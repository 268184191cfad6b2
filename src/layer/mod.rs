//! # Layer Objects
//!
//! Placed objects of a map turned into renderable items: icons for point objects and
//! rebased polygons or ellipses for shapes. Doors and door polygons hold separate open
//! and closed item sets. Actors, ambient sounds, animations and spawn points carry an
//! hourly schedule.
//!
//! ## Modules
//! - `geometry`: map-to-device transform and render items.
//! - `object`: layer kinds and the per-object model.
//! - `build`: per-kind construction from the structure index.
//! - `registry`: lazily loaded collections and visibility state.

mod build;
mod geometry;
mod object;
mod registry;

pub use build::{transition_strip, TRANSITION_STRIPE};
pub use geometry::{Geometry, Placement, Point, RenderItem, Viewport};
pub use object::{AnimationMode, Edge, ItemDescriptor, LayerKind, LayerObject, ObjectShapes, Schedule};
pub use registry::{LayerCollection, LayerRegistry, LoadState, SoundScope};
