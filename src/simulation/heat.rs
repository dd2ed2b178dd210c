//! Intra-cell equilibration, inter-cell Fourier conduction, and optional
//! radiation to ambient. Conduction walks only the `+x, +y, +z` neighbors of
//! each dirty cell so every inter-cell face is touched exactly once per pass.

use crate::cell::EPSILON_MOLES;
use crate::chunk::{Chunk, ChunkIndex, DirtyRegion};
use crate::config::HeatConfig;
use crate::coords::{Face, LocalCoord};
use crate::world::World;

use super::stepper::{step_local, with_cell_pair_mut};

/// Rebalances every dirty cell in `region` to a single internal temperature,
/// without moving energy between cells.
pub fn equilibrate_region(world: &mut World, index: ChunkIndex, region: DirtyRegion) {
  for local in Chunk::locals_in_region(region) {
    world.chunk_mut(index).cell_mut(local).equilibrate();
  }
}

/// Inter-cell Fourier conduction over a dirty region, followed by radiation
/// to ambient if enabled.
pub fn conduct_region(world: &mut World, index: ChunkIndex, region: DirtyRegion, dt: f64) {
  let config = world.config().heat;
  for local in Chunk::locals_in_region(region) {
    for face in Face::POSITIVE {
      let Some((n_index, n_local)) = step_local(world, index, local, face) else {
        continue;
      };
      conduct_pair(world, index, local, n_index, n_local, &config, dt);
    }
  }
  if config.radiation_enabled {
    radiate_region(world, index, region, dt);
  }
}

/// Moves energy between one face-adjacent pair. Skips if either side is
/// vacuum (heat does not flow into nothing). Clamps the transfer to the
/// donor's `max_donor_fraction` so a single step cannot oscillate.
fn conduct_pair(
  world: &mut World,
  a_index: ChunkIndex,
  a_local: LocalCoord,
  b_index: ChunkIndex,
  b_local: LocalCoord,
  config: &HeatConfig,
  dt: f64,
) {
  let a_cell = world.chunk(a_index).cell(a_local);
  let b_cell = world.chunk(b_index).cell(b_local);
  if a_cell.is_vacuum() || b_cell.is_vacuum() {
    return;
  }
  let delta_t = a_cell.get_temperature() - b_cell.get_temperature();
  if delta_t.abs() <= f64::EPSILON {
    return;
  }
  let conductivity = (a_cell.effective_conductivity() + b_cell.effective_conductivity()) / 2.0;
  let mut rate = config.base_conduction_rate * conductivity;
  if delta_t.abs() >= config.hot_cold_threshold_k {
    rate *= config.hot_cold_boost;
  }
  let mut delta_energy = rate * delta_t * dt;

  // Positive delta_energy flows a -> b; the donor is whichever side is
  // giving energy away.
  let donor_energy = if delta_energy > 0.0 {
    a_cell.total_energy()
  } else {
    b_cell.total_energy()
  };
  let cap = donor_energy * config.max_donor_fraction;
  delta_energy = delta_energy.clamp(-cap, cap);
  if delta_energy.abs() <= EPSILON_MOLES {
    return;
  }

  with_cell_pair_mut(world, a_index, a_local, b_index, b_local, |a, b| {
    a.add_energy_distributed(-delta_energy);
    b.add_energy_distributed(delta_energy);
  });

  world.mark_chunk_dirty(a_index, a_local);
  world.mark_chunk_dirty(b_index, b_local);
}

/// Loses a small fraction of energy above ambient to the environment.
/// Disabled by default; gated by [`HeatConfig::radiation_enabled`].
fn radiate_region(world: &mut World, index: ChunkIndex, region: DirtyRegion, dt: f64) {
  let ambient = world.config().ambient_temperature_k;
  let rate = world.config().heat.radiation_rate;
  let max_fraction = world.config().heat.max_radiation_fraction;
  for local in Chunk::locals_in_region(region) {
    let radiated = {
      let cell = world.chunk_mut(index).cell_mut(local);
      if cell.is_vacuum() {
        false
      } else {
        let temperature = cell.get_temperature();
        if temperature <= ambient {
          false
        } else {
          let loss = (rate * (temperature - ambient) * dt).min(cell.total_energy() * max_fraction);
          if loss <= EPSILON_MOLES {
            false
          } else {
            cell.add_energy_distributed(-loss);
            true
          }
        }
      }
    };
    if radiated {
      world.mark_chunk_dirty(index, local);
    }
  }
}
