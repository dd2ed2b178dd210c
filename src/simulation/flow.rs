//! Gravity-driven liquid transfer: downward flow into vacuum/gas/liquid
//! cells up to a capacity, with horizontal spread once a cell's downward
//! path is blocked or saturated. Gas displaced by incoming liquid is pushed
//! into the cell the liquid fell from.
//!
//! Flow is inherently asymmetric (gravity has no "up" counterpart), so
//! unlike heat conduction and gas diffusion it does not use the
//! doubled-sided `Face::POSITIVE` discipline; each cell independently
//! considers its one cell below and its four lateral neighbors.

use crate::cell::{GridCell, EPSILON_MOLES};
use crate::chunk::{Chunk, ChunkIndex, DirtyRegion};
use crate::coords::{Face, LocalCoord};
use crate::material::{MaterialId, MaterialRegistry, Phase};
use crate::world::World;

use super::stepper::{step_local, with_cell_pair_mut};

/// The four horizontal faces, used by [`apply_spread`].
const LATERAL_FACES: [Face; 4] = [Face::PosX, Face::NegX, Face::PosZ, Face::NegZ];

enum FlowOutcome {
  Moved,
  Blocked,
  NotLiquid,
}

/// Runs one flow pass (gravity, then spread for cells that didn't fall)
/// over every cell in `region`.
pub fn step_region(world: &mut World, index: ChunkIndex, region: DirtyRegion) {
  let locals: Vec<LocalCoord> = Chunk::locals_in_region(region).collect();
  for &local in &locals {
    match apply_gravity(world, index, local) {
      FlowOutcome::Blocked => apply_spread(world, index, local),
      FlowOutcome::Moved | FlowOutcome::NotLiquid => {}
    }
  }
}

fn total_liquid_moles(cell: &GridCell) -> f64 {
  cell
    .iter_present()
    .filter(|&id| MaterialRegistry::get(id).phase == Phase::Liquid)
    .map(|id| cell.entry(id).moles)
    .sum()
}

fn liquid_ids_present(cell: &GridCell) -> Vec<MaterialId> {
  cell
    .iter_present()
    .filter(|&id| MaterialRegistry::get(id).phase == Phase::Liquid)
    .collect()
}

/// Pushes every gas-phase material out of `below` and up into `source`,
/// ahead of liquid entering `below`. Preserves moles and energy per material.
fn displace_gas_upward(source: &mut GridCell, below: &mut GridCell) {
  let gas_ids: Vec<MaterialId> = below
    .iter_present()
    .filter(|&id| MaterialRegistry::get(id).phase == Phase::Gas)
    .collect();
  for id in gas_ids {
    let moles = below.entry(id).moles;
    let energy = below.entry(id).thermal_energy;
    let (taken_moles, taken_energy) = below.withdraw(id, moles, energy);
    if taken_moles > 0.0 {
      let _ = source.add_material(id, taken_moles, taken_energy);
    }
  }
}

/// Considers the cell directly below `local`: blocked by a solid or a
/// missing neighbor chunk, saturated at capacity, or open for a
/// `fall_fraction` share of each present liquid's moles.
fn apply_gravity(world: &mut World, index: ChunkIndex, local: LocalCoord) -> FlowOutcome {
  if !world.chunk(index).cell(local).has_phase(Phase::Liquid) {
    return FlowOutcome::NotLiquid;
  }
  let Some((below_index, below_local)) = step_local(world, index, local, Face::NegY) else {
    return FlowOutcome::Blocked;
  };
  if world.chunk(below_index).cell(below_local).has_phase(Phase::Solid) {
    return FlowOutcome::Blocked;
  }

  let capacity = world.config().flow.liquid_capacity_moles;
  let fall_fraction = world.config().flow.fall_fraction;
  let below_liquid_total = total_liquid_moles(world.chunk(below_index).cell(below_local));
  let remaining_capacity = (capacity - below_liquid_total).max(0.0);
  if remaining_capacity <= EPSILON_MOLES {
    return FlowOutcome::Blocked;
  }

  let liquid_ids = liquid_ids_present(world.chunk(index).cell(local));

  let moved = with_cell_pair_mut(world, index, local, below_index, below_local, |source, below| {
    displace_gas_upward(source, below);
    let mut remaining = remaining_capacity;
    let mut moved_any = false;
    for id in liquid_ids {
      if remaining <= EPSILON_MOLES {
        break;
      }
      let n = source.entry(id).moles;
      if n <= EPSILON_MOLES {
        continue;
      }
      let proposed = (n * fall_fraction).min(remaining);
      if proposed <= EPSILON_MOLES {
        continue;
      }
      let energy = source.entry(id).thermal_energy * (proposed / n);
      let (taken_moles, taken_energy) = source.withdraw(id, proposed, energy);
      if taken_moles > 0.0 {
        let _ = below.add_material(id, taken_moles, taken_energy);
        remaining -= taken_moles;
        moved_any = true;
      }
    }
    moved_any
  });

  if moved {
    world.mark_chunk_dirty(index, local);
    world.mark_chunk_dirty(below_index, below_local);
    FlowOutcome::Moved
  } else {
    FlowOutcome::Blocked
  }
}

/// Equalizes liquid levels with each lateral neighbor that holds less and
/// is not solid, moving up to `spread_fraction / 4` of the difference.
fn apply_spread(world: &mut World, index: ChunkIndex, local: LocalCoord) {
  if !world.chunk(index).cell(local).has_phase(Phase::Liquid) {
    return;
  }
  let capacity = world.config().flow.liquid_capacity_moles;
  let spread_fraction = world.config().flow.spread_fraction;

  for face in LATERAL_FACES {
    let Some((n_index, n_local)) = step_local(world, index, local, face) else {
      continue;
    };
    if world.chunk(n_index).cell(n_local).has_phase(Phase::Solid) {
      continue;
    }
    let liquid_ids = liquid_ids_present(world.chunk(index).cell(local));
    if liquid_ids.is_empty() {
      return;
    }
    let neighbor_liquid_total = total_liquid_moles(world.chunk(n_index).cell(n_local));
    let remaining_capacity = (capacity - neighbor_liquid_total).max(0.0);
    if remaining_capacity <= EPSILON_MOLES {
      continue;
    }

    let moved = with_cell_pair_mut(world, index, local, n_index, n_local, |source, neighbor| {
      let mut remaining = remaining_capacity;
      let mut moved_any = false;
      for id in liquid_ids {
        if remaining <= EPSILON_MOLES {
          break;
        }
        let source_moles = source.entry(id).moles;
        let neighbor_moles = neighbor.entry(id).moles;
        let diff = source_moles - neighbor_moles;
        if diff <= EPSILON_MOLES {
          continue;
        }
        let proposed = (diff * spread_fraction / 4.0).min(remaining).min(source_moles);
        if proposed <= EPSILON_MOLES {
          continue;
        }
        let energy = source.entry(id).thermal_energy * (proposed / source_moles);
        let (taken_moles, taken_energy) = source.withdraw(id, proposed, energy);
        if taken_moles > 0.0 {
          let _ = neighbor.add_material(id, taken_moles, taken_energy);
          remaining -= taken_moles;
          moved_any = true;
        }
      }
      moved_any
    });

    if moved {
      world.mark_chunk_dirty(index, local);
      world.mark_chunk_dirty(n_index, n_local);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::sim_flags;
  use crate::coords::CellCoord;

  fn flat_rock_floor(world: &mut World, half_width: i64) {
    for x in -half_width..=half_width {
      for z in -half_width..=half_width {
        world
          .get_cell_for_write(CellCoord::new(x, 0, z))
          .unwrap()
          .add_material(MaterialId::Rock, 1.0, 100.0)
          .unwrap();
      }
    }
  }

  #[test]
  fn liquid_falls_onto_solid_floor() {
    let mut world = World::init();
    flat_rock_floor(&mut world, 5);
    world
      .get_cell_for_write(CellCoord::new(5, 8, 5))
      .unwrap()
      .add_material(MaterialId::Water, 10.0, 10.0 * 75.3 * 293.0)
      .unwrap();
    for _ in 0..200 {
      world.step_flags(1.0, sim_flags::FLOW);
    }
    let total = world.total_mass(MaterialId::Water);
    assert!((total - 10.0).abs() / 10.0 < 0.01, "total={total}");
    // Spec scenario 3 measures the sum across the floor layer, not a single
    // cell: water sheds from the landing column to its lateral neighbors as
    // it spreads, so no one cell need retain 90% on its own.
    let mut on_floor = 0.0;
    for x in -5..=5i64 {
      for z in -5..=5i64 {
        on_floor += world.get_cell(CellCoord::new(x, 1, z)).entry(MaterialId::Water).moles;
      }
    }
    assert!(on_floor >= 9.0, "on_floor={on_floor}");
  }

  #[test]
  fn blocked_drop_spreads_to_all_four_corners() {
    let mut world = World::init();
    flat_rock_floor(&mut world, 2);
    world
      .get_cell_for_write(CellCoord::new(0, 1, 0))
      .unwrap()
      .add_material(MaterialId::Water, 100.0, 100.0 * 75.3 * 293.0)
      .unwrap();
    for _ in 0..500 {
      world.step_flags(1.0, sim_flags::FLOW);
    }
    for &(x, z) in &[(-2i64, -2i64), (-2, 2), (2, -2), (2, 2)] {
      let corner = world.get_cell(CellCoord::new(x, 1, z));
      assert!(
        corner.entry(MaterialId::Water).moles >= 1.0,
        "corner ({x},{z}) has {}",
        corner.entry(MaterialId::Water).moles
      );
    }
  }

  #[test]
  fn solid_floor_blocks_all_downward_flow() {
    let mut world = World::init();
    world
      .get_cell_for_write(CellCoord::new(0, 0, 0))
      .unwrap()
      .add_material(MaterialId::Rock, 1.0, 100.0)
      .unwrap();
    world
      .get_cell_for_write(CellCoord::new(0, 1, 0))
      .unwrap()
      .add_material(MaterialId::Water, 5.0, 5.0 * 75.3 * 293.0)
      .unwrap();
    for _ in 0..20 {
      world.step_flags(1.0, sim_flags::FLOW);
    }
    let floor = world.get_cell(CellCoord::new(0, 0, 0));
    assert!(!floor.has(MaterialId::Water));
  }
}
