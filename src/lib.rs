//! A sparse chunked 3D thermodynamic cellular simulation engine.
//!
//! Three subsystems share the world's invariants (mass conservation, energy
//! conservation, determinism): sparse chunked storage ([`world`], [`chunk`]),
//! a multi-material cell model ([`cell`], [`material`]), and a composable
//! physics pipeline ([`simulation`]). The crate is embeddable: no renderer,
//! no input handling, no persistence, no networking, and nothing runs on a
//! background thread — a step is one sequential pass, driven entirely by the
//! caller through [`world::World::step`]/[`world::World::step_flags`].
//!
//! External callers mutate the world through tool APIs
//! ([`world::World::add_heat_at`], [`world::World::remove_heat_at`],
//! [`world::World::add_water_at`]) and `get_cell`/`get_cell_for_write`, then
//! drive time forward with `step`. Terrain is seeded once via
//! [`world::World::init_terrain`] from a 2D height map produced by an
//! external terrain collaborator.

pub mod cell;
pub mod chunk;
pub mod config;
pub mod coords;
pub mod error;
mod hash;
pub mod material;
pub mod simulation;
pub mod world;

pub use cell::{GridCell, MaterialEntry};
pub use chunk::{Chunk, ChunkIndex, DirtyRegion};
pub use config::{FlowConfig, GasConfig, HeatConfig, WorldConfig};
pub use coords::{CellCoord, ChunkCoord, CoordSpace, Face, LocalCoord, WorldPos};
pub use error::{DomainError, WriteError};
pub use material::{Color, MaterialId, MaterialProperties, MaterialRegistry, Phase};
pub use world::{CellInfo, World};
