//! Terrain initialization from a 2D integer height map: the only path by
//! which the world acquires matter at startup.

use crate::coords::CellCoord;
use crate::material::MaterialId;

/// Thickness, in cells, of the `DIRT` topsoil layer above `ROCK`.
const TOPSOIL_THICKNESS: i64 = 2;

/// A read-only 2D array of column heights, indexed `[x][z]`. Each value is
/// the height (in cell units) of solid ground at that column; columns are
/// addressed relative to cell `(0, *, 0)`.
pub struct HeightMap {
  width_x: usize,
  width_z: usize,
  heights: Vec<i64>,
}

impl HeightMap {
  pub fn new(width_x: usize, width_z: usize, heights: Vec<i64>) -> Self {
    assert_eq!(heights.len(), width_x * width_z, "height map size mismatch");
    Self {
      width_x,
      width_z,
      heights,
    }
  }

  #[inline]
  pub fn height_at(&self, x: usize, z: usize) -> i64 {
    self.heights[z * self.width_x + x]
  }

  pub fn width_x(&self) -> usize {
    self.width_x
  }

  pub fn width_z(&self) -> usize {
    self.width_z
  }
}

/// Fills `world` deterministically from `height_map`: for each column,
/// cells below the column height become `ROCK`, with a thin `DIRT`
/// topsoil, at ambient temperature; cells above remain vacuum.
pub fn fill(world: &mut super::World, height_map: &HeightMap) {
  let ambient = world.config().ambient_temperature_k;
  let cp_rock = crate::material::MaterialRegistry::get(MaterialId::Rock).molar_heat_capacity;
  let cp_dirt = crate::material::MaterialRegistry::get(MaterialId::Dirt).molar_heat_capacity;

  for x in 0..height_map.width_x() {
    for z in 0..height_map.width_z() {
      let height = height_map.height_at(x, z);
      if height <= 0 {
        continue;
      }
      let topsoil_start = (height - TOPSOIL_THICKNESS).max(0);
      for y in 0..height {
        let coord = CellCoord::new(x as i64, y, z as i64);
        let (id, cp) = if y >= topsoil_start {
          (MaterialId::Dirt, cp_dirt)
        } else {
          (MaterialId::Rock, cp_rock)
        };
        // One mole per cell is an arbitrary but fixed unit of "solid fill";
        // the spec leaves solid-phase mole quantities unconstrained.
        let cell = world
          .get_cell_for_write(coord)
          .expect("terrain fill never hits chunk allocation failure in practice");
        cell
          .add_material(id, 1.0, cp * ambient)
          .expect("terrain constants are always finite and non-negative");
      }
    }
  }
}
