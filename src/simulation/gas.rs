//! Isotropic gas diffusion with an upward bias proportional to temperature
//! above ambient. Like heat conduction, this walks only the `+x, +y, +z`
//! neighbors of each dirty cell so every inter-cell face is touched exactly
//! once per pass; the upward bias is layered on top of the `+y` term rather
//! than processed separately, so it never double-counts a face.

use crate::cell::EPSILON_MOLES;
use crate::chunk::{Chunk, ChunkIndex, DirtyRegion};
use crate::config::GasConfig;
use crate::coords::{Face, LocalCoord};
use crate::material::{MaterialId, MaterialRegistry, Phase};
use crate::world::World;

use super::stepper::{step_local, with_cell_pair_mut};

/// Runs one gas diffusion pass over `region`.
pub fn diffuse_region(world: &mut World, index: ChunkIndex, region: DirtyRegion, dt: f64) {
  let config = world.config().gas;
  let ambient = world.config().ambient_temperature_k;
  for local in Chunk::locals_in_region(region) {
    for face in Face::POSITIVE {
      let Some((n_index, n_local)) = step_local(world, index, local, face) else {
        continue;
      };
      diffuse_pair(world, index, local, n_index, n_local, face, &config, ambient, dt);
    }
  }
}

/// Moves gas moles (and their proportional share of energy) from the
/// higher-density side of one face-adjacent pair to the lower, per present
/// gas material. A `+y` step adds an upward bias proportional to how far the
/// donor's temperature sits above ambient, capped at `max_upward_bias`.
fn diffuse_pair(
  world: &mut World,
  a_index: ChunkIndex,
  a_local: LocalCoord,
  b_index: ChunkIndex,
  b_local: LocalCoord,
  face: Face,
  config: &GasConfig,
  ambient: f64,
  dt: f64,
) {
  let gas_ids: Vec<MaterialId> = {
    let a_cell = world.chunk(a_index).cell(a_local);
    let b_cell = world.chunk(b_index).cell(b_local);
    a_cell
      .iter_present()
      .chain(b_cell.iter_present())
      .filter(|&id| MaterialRegistry::get(id).phase == Phase::Gas)
      .collect()
  };
  if gas_ids.is_empty() {
    return;
  }

  for id in gas_ids {
    let (a_moles, a_temp) = {
      let cell = world.chunk(a_index).cell(a_local);
      (cell.entry(id).moles, cell.get_temperature())
    };
    let (b_moles, b_temp) = {
      let cell = world.chunk(b_index).cell(b_local);
      (cell.entry(id).moles, cell.get_temperature())
    };
    let diff = a_moles - b_moles;

    // Downhill diffusion term: positive `flow` moves moles a -> b.
    let mut flow = diff * config.diffusion_fraction * dt;

    // Upward bias only applies along +y, and only pushes moles from the
    // hotter side toward the cooler/upper side if that side is actually
    // above ambient; it never reverses the direction diffusion would move
    // moles on its own when the donor is already below ambient.
    if face == Face::PosY {
      let donor_temp = if flow >= 0.0 { a_temp } else { b_temp };
      let donor_moles = if flow >= 0.0 { a_moles } else { b_moles };
      if donor_moles > EPSILON_MOLES && donor_temp > ambient {
        let bias = ((donor_temp - ambient) * config.upward_bias_per_kelvin).min(config.max_upward_bias);
        let bias_flow = donor_moles * bias * dt;
        flow += bias_flow;
      }
    }

    let donor_moles = if flow >= 0.0 { a_moles } else { b_moles };
    flow = flow.clamp(-donor_moles, donor_moles);
    if flow.abs() <= EPSILON_MOLES {
      continue;
    }

    let moved = with_cell_pair_mut(world, a_index, a_local, b_index, b_local, |a, b| {
      if flow > 0.0 {
        let share = flow / a_moles.max(EPSILON_MOLES);
        let energy = a.entry(id).thermal_energy * share.min(1.0);
        let (taken_moles, taken_energy) = a.withdraw(id, flow, energy);
        if taken_moles > 0.0 {
          let _ = b.add_material(id, taken_moles, taken_energy);
          return true;
        }
      } else {
        let amount = -flow;
        let share = amount / b_moles.max(EPSILON_MOLES);
        let energy = b.entry(id).thermal_energy * share.min(1.0);
        let (taken_moles, taken_energy) = b.withdraw(id, amount, energy);
        if taken_moles > 0.0 {
          let _ = a.add_material(id, taken_moles, taken_energy);
          return true;
        }
      }
      false
    });

    if moved {
      world.mark_chunk_dirty(a_index, a_local);
      world.mark_chunk_dirty(b_index, b_local);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::sim_flags;
  use crate::coords::CellCoord;

  #[test]
  fn gas_diffuses_from_dense_to_sparse_neighbor() {
    let mut world = World::init();
    world
      .get_cell_for_write(CellCoord::new(0, 0, 0))
      .unwrap()
      .add_material(MaterialId::Nitrogen, 10.0, 10.0 * 29.1 * 293.0)
      .unwrap();
    // A trace amount, not zero, so the neighbor is a real (if nearly
    // empty) gas cell rather than vacuum.
    world
      .get_cell_for_write(CellCoord::new(1, 0, 0))
      .unwrap()
      .add_material(MaterialId::Nitrogen, 1e-6, 1e-6 * 29.1 * 293.0)
      .unwrap();
    let total_before = world.total_mass(MaterialId::Nitrogen);
    for _ in 0..50 {
      world.step_flags(1.0, sim_flags::GAS);
    }
    let a = world.get_cell(CellCoord::new(0, 0, 0)).entry(MaterialId::Nitrogen).moles;
    let b = world.get_cell(CellCoord::new(1, 0, 0)).entry(MaterialId::Nitrogen).moles;
    assert!(b > 1e-6, "gas should have diffused into the sparser neighbor, b={b}");
    assert!(a < 10.0);
    let total_after = world.total_mass(MaterialId::Nitrogen);
    assert!((total_after - total_before).abs() / total_before < 1e-9);
  }

  #[test]
  fn hot_steam_rises_faster_than_cool_steam() {
    let mut hot_world = World::init();
    hot_world
      .get_cell_for_write(CellCoord::new(0, 0, 0))
      .unwrap()
      .add_material(MaterialId::Steam, 10.0, 10.0 * 37.5 * 500.0)
      .unwrap();
    hot_world
      .get_cell_for_write(CellCoord::new(0, 1, 0))
      .unwrap()
      .add_material(MaterialId::Steam, 1e-6, 1e-6 * 37.5 * 293.0)
      .unwrap();

    let mut cool_world = World::init();
    cool_world
      .get_cell_for_write(CellCoord::new(0, 0, 0))
      .unwrap()
      .add_material(MaterialId::Steam, 10.0, 10.0 * 37.5 * 293.1)
      .unwrap();
    cool_world
      .get_cell_for_write(CellCoord::new(0, 1, 0))
      .unwrap()
      .add_material(MaterialId::Steam, 1e-6, 1e-6 * 37.5 * 293.0)
      .unwrap();

    for _ in 0..20 {
      hot_world.step_flags(1.0, sim_flags::GAS);
      cool_world.step_flags(1.0, sim_flags::GAS);
    }
    let hot_risen = hot_world.get_cell(CellCoord::new(0, 1, 0)).entry(MaterialId::Steam).moles;
    let cool_risen = cool_world.get_cell(CellCoord::new(0, 1, 0)).entry(MaterialId::Steam).moles;
    assert!(hot_risen > cool_risen, "hot={hot_risen} cool={cool_risen}");
  }

  #[test]
  fn gas_diffusion_leaves_vacuum_untouched() {
    let mut world = World::init();
    world
      .get_cell_for_write(CellCoord::new(0, 0, 0))
      .unwrap()
      .add_material(MaterialId::Oxygen, 5.0, 5.0 * 29.4 * 293.0)
      .unwrap();
    for _ in 0..10 {
      world.step_flags(1.0, sim_flags::GAS);
    }
    // The +x neighbor was never allocated, so step_local returns None and
    // diffusion has nowhere to push moles on that face; total mass is
    // unchanged regardless of where within the chunk it settles.
    let total = world.total_mass(MaterialId::Oxygen);
    assert!((total - 5.0).abs() < 1e-9);
  }
}
