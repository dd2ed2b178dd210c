//! Fixed pipeline order, flag gating, per-chunk dirty-region handling, and
//! the active/stable/dormant state machine.

use crate::chunk::{ChunkIndex, DirtyRegion};
use crate::config::sim_flags::{self, SimFlags};
use crate::world::World;

use super::{combustion, flow, gas, heat};

/// Drives one fixed-dt pipeline pass over the world's active chunk list.
pub struct Stepper;

impl Stepper {
  /// Runs one sub-step: equilibration, conduction, flow, gas diffusion,
  /// then (if enabled) combustion, over every non-stable active chunk,
  /// followed by equilibrium bookkeeping for the whole snapshot.
  pub fn advance(world: &mut World, dt: f64, flags: SimFlags) {
    let snapshot: Vec<ChunkIndex> = world.active_indices().to_vec();

    // Capture each chunk's dirty box as the region to scan this tick, then
    // clear it immediately so only *new* writes during this tick leave it
    // non-empty by the time we check for equilibrium below.
    let mut scan_regions: Vec<(ChunkIndex, DirtyRegion)> = Vec::with_capacity(snapshot.len());
    for &index in &snapshot {
      let chunk = world.chunk_mut(index);
      if chunk.is_stable {
        continue;
      }
      let region = chunk.dirty;
      chunk.dirty.reset();
      if region.dirty {
        scan_regions.push((index, region));
      }
    }

    if sim_flags::contains(flags, sim_flags::HEAT) {
      for &(index, region) in &scan_regions {
        heat::equilibrate_region(world, index, region);
      }
      for &(index, region) in &scan_regions {
        heat::conduct_region(world, index, region, dt);
      }
    }
    if sim_flags::contains(flags, sim_flags::FLOW) {
      for &(index, region) in &scan_regions {
        flow::step_region(world, index, region);
      }
    }
    if sim_flags::contains(flags, sim_flags::GAS) {
      for &(index, region) in &scan_regions {
        gas::diffuse_region(world, index, region, dt);
      }
    }
    if sim_flags::contains(flags, sim_flags::COMBUSTION) && world.config().combustion.enabled {
      for &(index, region) in &scan_regions {
        combustion::burn_region(world, index, region, dt);
      }
    }

    let threshold = world.config().stable_frame_threshold;
    for &index in &snapshot {
      Self::update_equilibrium(world, index, threshold);
    }
  }

  fn update_equilibrium(world: &mut World, index: ChunkIndex, threshold: u32) {
    // A chunk removed from the active list mid-tick (by an earlier
    // iteration's swap-remove repointing this index) is no longer present
    // under this handle; guard defensively.
    if index.0 >= world.chunk_count() {
      return;
    }
    let touched = world.chunk(index).dirty.dirty;
    if touched {
      let chunk = world.chunk_mut(index);
      chunk.stable_frames = 0;
      chunk.is_stable = false;
      return;
    }
    let stable_frames = {
      let chunk = world.chunk_mut(index);
      chunk.stable_frames = chunk.stable_frames.saturating_add(1);
      chunk.stable_frames
    };
    if stable_frames >= threshold {
      world.chunk_mut(index).is_stable = true;
    }
    if stable_frames >= threshold.saturating_mul(2) {
      world.demote_to_dormant(index);
    }
  }
}

/// Steps `local` one cell along `face`. If the step stays inside
/// `[0, CHUNK_SIDE)` on every axis, the result is the same chunk; otherwise
/// it resolves through `index`'s cached neighbor link for that face,
/// wrapping the stepped axis onto the opposite edge of the neighbor chunk.
/// Returns `None` when the step crosses a chunk boundary that has no
/// loaded neighbor — callers treat that uniformly as "nothing there"
/// (vacuum for heat/gas, a blocking boundary for flow).
pub(super) fn step_local(
  world: &World,
  index: ChunkIndex,
  local: crate::coords::LocalCoord,
  face: crate::coords::Face,
) -> Option<(ChunkIndex, crate::coords::LocalCoord)> {
  let side = crate::coords::CHUNK_SIDE as i32;
  let (dx, dy, dz) = face.chunk_delta();
  let nx = local.x as i32 + dx;
  let ny = local.y as i32 + dy;
  let nz = local.z as i32 + dz;
  if (0..side).contains(&nx) && (0..side).contains(&ny) && (0..side).contains(&nz) {
    return Some((index, crate::coords::LocalCoord::new(nx as u8, ny as u8, nz as u8)));
  }
  let neighbor_index = world.neighbor_index(index, face)?;
  let wrap = |v: i32| -> u8 {
    if v < 0 {
      (side - 1) as u8
    } else if v >= side {
      0
    } else {
      v as u8
    }
  };
  Some((
    neighbor_index,
    crate::coords::LocalCoord::new(wrap(nx), wrap(ny), wrap(nz)),
  ))
}

/// Gives a subsystem mutable access to two cells addressed by
/// `(chunk, local)` pairs that may belong to the same chunk or two
/// different ones, via [`Chunk::cell_pair_mut`] or
/// [`World::chunk_pair_mut`] as appropriate — never unsafe aliasing.
pub(super) fn with_cell_pair_mut<R>(
  world: &mut World,
  a_index: ChunkIndex,
  a_local: crate::coords::LocalCoord,
  b_index: ChunkIndex,
  b_local: crate::coords::LocalCoord,
  f: impl FnOnce(&mut crate::cell::GridCell, &mut crate::cell::GridCell) -> R,
) -> R {
  if a_index.0 == b_index.0 {
    let chunk = world.chunk_mut(a_index);
    let (ca, cb) = chunk.cell_pair_mut(a_local, b_local);
    f(ca, cb)
  } else {
    let (ca_chunk, cb_chunk) = world.chunk_pair_mut(a_index, b_index);
    f(ca_chunk.cell_mut(a_local), cb_chunk.cell_mut(b_local))
  }
}
