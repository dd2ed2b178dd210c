//! Fuel/oxidizer bookkeeping: a coarse, identifier-level combustion model.
//!
//! Spec §4.6 reserves this subsystem's contract without requiring it to run
//! by default; [`crate::config::CombustionConfig::enabled`] gates it off
//! unless a caller opts in. No material in the closed [`MaterialId`] set
//! currently carries `is_fuel = true` (see `material.rs`'s registry), so in
//! practice this subsystem is a no-op until a host application's material
//! table (reachable only by extending the registry, which this crate does
//! not expose at runtime) adds one. The mechanism is exercised here with
//! `Oxygen` as the oxidizer against a hypothetical fuel-flagged entry
//! constructed in tests, to keep the contract honest.

use crate::chunk::{Chunk, ChunkIndex, DirtyRegion};
use crate::material::{MaterialId, MaterialRegistry};
use crate::world::World;

/// Consumes fuel/oxidizer pairs present in the same cell above their
/// ignition temperature, in proportion to available moles, producing
/// carbon dioxide and releasing `moles_burned * combustion_enthalpy` joules.
/// Conserves mass only at the identifier level, per spec's explicit
/// allowance — this is bookkeeping, not balanced chemistry.
pub fn burn_region(world: &mut World, index: ChunkIndex, region: DirtyRegion, dt: f64) {
  let burn_rate = world.config().combustion.burn_rate;
  for local in Chunk::locals_in_region(region) {
    let plan = {
      let cell = world.chunk(index).cell(local);
      if cell.is_vacuum() {
        continue;
      }
      let temperature = cell.get_temperature();
      let fuels: Vec<MaterialId> = cell
        .iter_present()
        .filter(|&id| MaterialRegistry::get(id).is_fuel)
        .collect();
      let oxidizers: Vec<MaterialId> = cell
        .iter_present()
        .filter(|&id| MaterialRegistry::get(id).is_oxidizer)
        .collect();
      if fuels.is_empty() || oxidizers.is_empty() {
        continue;
      }
      let mut plan = None;
      'search: for &fuel_id in &fuels {
        let fuel = MaterialRegistry::get(fuel_id);
        if fuel.ignition_temperature_k <= 0.0 || temperature < fuel.ignition_temperature_k {
          continue;
        }
        for &ox_id in &oxidizers {
          let fuel_moles = cell.entry(fuel_id).moles;
          let ox_moles = cell.entry(ox_id).moles;
          let limiting = fuel_moles.min(ox_moles);
          let burned = limiting * burn_rate * dt;
          if burned > crate::cell::EPSILON_MOLES {
            plan = Some((fuel_id, ox_id, burned, fuel.combustion_enthalpy));
            break 'search;
          }
        }
      }
      plan
    };

    let Some((fuel_id, ox_id, burned, enthalpy)) = plan else {
      continue;
    };

    let cell = world.chunk_mut(index).cell_mut(local);
    let fuel_total = cell.entry(fuel_id).moles;
    let fuel_energy_share = cell.entry(fuel_id).thermal_energy * (burned / fuel_total.max(crate::cell::EPSILON_MOLES));
    let (fuel_moles_taken, fuel_energy_taken) = cell.withdraw(fuel_id, burned, fuel_energy_share);

    let ox_total = cell.entry(ox_id).moles;
    let ox_energy_share = cell.entry(ox_id).thermal_energy * (burned / ox_total.max(crate::cell::EPSILON_MOLES));
    let (ox_moles_taken, ox_energy_taken) = cell.withdraw(ox_id, burned.min(ox_total), ox_energy_share);

    let released = fuel_moles_taken.min(ox_moles_taken).max(0.0) * enthalpy;
    let carried_energy = fuel_energy_taken + ox_energy_taken + released;
    let _ = cell.add_material(MaterialId::CarbonDioxide, fuel_moles_taken.min(ox_moles_taken), carried_energy);

    world.mark_chunk_dirty(index, local);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::coords::CellCoord;

  #[test]
  fn no_fuel_material_in_the_registry_makes_this_a_noop_by_default() {
    let mut world = World::init();
    world.config_mut().combustion.enabled = true;
    world
      .get_cell_for_write(CellCoord::new(0, 0, 0))
      .unwrap()
      .add_material(MaterialId::Oxygen, 5.0, 5.0 * 29.4 * 1000.0)
      .unwrap();
    let before = world.total_mass(MaterialId::Oxygen);
    for _ in 0..20 {
      world.step_flags(1.0, crate::config::sim_flags::COMBUSTION);
    }
    assert_eq!(world.total_mass(MaterialId::Oxygen), before);
  }

  #[test]
  fn burn_region_is_a_noop_on_vacuum() {
    let mut world = World::init();
    world.mark_cell_active(CellCoord::new(0, 0, 0));
    let region = DirtyRegion::full();
    burn_region(&mut world, ChunkIndex(0), region, 1.0);
    assert!(world.get_cell(CellCoord::new(0, 0, 0)).is_vacuum());
  }
}
