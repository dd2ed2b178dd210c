//! Sparse chunk container: hash table keyed by chunk coordinate, dense
//! active-chunk list with back-indices, tick/accumulator, tool APIs, and
//! cell accessors with cross-chunk fallthrough.

pub mod terrain;

use tracing::{trace, warn};

use crate::cell::{GridCell, VACUUM_SENTINEL};
use crate::chunk::{Chunk, ChunkIndex};
use crate::config::{sim_flags, WorldConfig};
use crate::coords::{CellCoord, ChunkCoord, CoordSpace, Face, LocalCoord, WorldPos};
use crate::error::{DomainError, WriteError};
use crate::material::{MaterialId, MaterialRegistry, Phase};
use crate::simulation::stepper::Stepper;

/// Number of buckets in the chunk hash table. The spec's reference
/// implementation sizes this for roughly a 512-chunk working set; 1024
/// keeps the expected chain length under 1 well past that.
const TABLE_BUCKET_COUNT: usize = 1024;

/// Separate-chaining hash table mapping chunk coordinates to dense-vector
/// indices. Walking a bucket's chain is a linear scan over a short `Vec`
/// rather than an intrusive linked list, so no unsafe pointer work is
/// needed to keep it correct under chunk creation.
#[derive(Default)]
struct ChunkTable {
  buckets: Vec<Vec<(ChunkCoord, ChunkIndex)>>,
}

impl ChunkTable {
  fn new() -> Self {
    Self {
      buckets: vec![Vec::new(); TABLE_BUCKET_COUNT],
    }
  }

  #[inline]
  fn bucket_of(coord: ChunkCoord) -> usize {
    (crate::hash::chunk_coord_hash(coord) as usize) % TABLE_BUCKET_COUNT
  }

  fn get(&self, coord: ChunkCoord) -> Option<ChunkIndex> {
    self.buckets[Self::bucket_of(coord)]
      .iter()
      .find(|(c, _)| *c == coord)
      .map(|(_, idx)| *idx)
  }

  fn insert(&mut self, coord: ChunkCoord, index: ChunkIndex) {
    self.buckets[Self::bucket_of(coord)].push((coord, index));
  }

  fn remove(&mut self, coord: ChunkCoord) {
    let bucket = &mut self.buckets[Self::bucket_of(coord)];
    bucket.retain(|(c, _)| *c != coord);
  }

  /// Updates the index stored for `coord`, used after a swap-remove moves
  /// the chunk previously at the tail into a freed slot.
  fn repoint(&mut self, coord: ChunkCoord, new_index: ChunkIndex) {
    let bucket = &mut self.buckets[Self::bucket_of(coord)];
    if let Some(entry) = bucket.iter_mut().find(|(c, _)| *c == coord) {
      entry.1 = new_index;
    }
  }
}

/// Read-only summary of one cell, for UI overlays. Never mutates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellInfo {
  pub valid: bool,
  pub material_count: u32,
  pub primary_material: Option<MaterialId>,
  pub temperature: f64,
  pub primary_phase: Option<Phase>,
}

/// The sparse 3D thermodynamic simulation world.
pub struct World {
  chunks: Vec<Chunk>,
  table: ChunkTable,
  active: Vec<ChunkIndex>,
  tick: u64,
  accumulator: f64,
  coord_space: CoordSpace,
  config: WorldConfig,
}

impl World {
  pub fn new(config: WorldConfig, coord_space: CoordSpace) -> Self {
    Self {
      chunks: Vec::new(),
      table: ChunkTable::new(),
      active: Vec::new(),
      tick: 0,
      accumulator: 0.0,
      coord_space,
      config,
    }
  }

  /// `World::init()`: a fresh world with default configuration and
  /// coordinate space, no matter yet.
  pub fn init() -> Self {
    Self::new(WorldConfig::default(), CoordSpace::default())
  }

  pub fn config(&self) -> &WorldConfig {
    &self.config
  }

  pub fn config_mut(&mut self) -> &mut WorldConfig {
    &mut self.config
  }

  pub fn coord_space(&self) -> CoordSpace {
    self.coord_space
  }

  pub fn tick(&self) -> u64 {
    self.tick
  }

  pub fn active_count(&self) -> usize {
    self.active.len()
  }

  pub fn chunk_count(&self) -> usize {
    self.chunks.len()
  }

  // === Chunk lifecycle ===

  fn find_chunk_index(&self, coord: ChunkCoord) -> Option<ChunkIndex> {
    self.table.get(coord)
  }

  /// Looks up the chunk at `coord`, creating it (and linking it to any
  /// existing face-adjacent neighbors) if absent.
  fn get_or_create_chunk(&mut self, coord: ChunkCoord) -> ChunkIndex {
    if let Some(index) = self.table.get(coord) {
      return index;
    }
    let index = ChunkIndex(self.chunks.len());
    self.chunks.push(Chunk::new_empty(coord));
    self.table.insert(coord, index);
    self.link_neighbors(coord, index);
    trace!(
      cx = coord.x,
      cy = coord.y,
      cz = coord.z,
      chunk_count = self.chunks.len(),
      "allocated chunk"
    );
    index
  }

  /// Wires the new chunk's six neighbor slots against any already-present
  /// neighbors, and sets their reciprocal slot back to the new chunk.
  fn link_neighbors(&mut self, coord: ChunkCoord, index: ChunkIndex) {
    for face in Face::ALL {
      let (dx, dy, dz) = face.chunk_delta();
      let neighbor_coord = coord.offset(dx, dy, dz);
      if let Some(neighbor_index) = self.table.get(neighbor_coord) {
        self.chunks[index.0].set_neighbor(face, Some(neighbor_index));
        self.chunks[neighbor_index.0].set_neighbor(face.opposite(), Some(index));
      }
    }
  }

  /// Unwires every neighbor's reciprocal slot pointing at `index`.
  fn unlink_neighbors(&mut self, index: ChunkIndex) {
    for face in Face::ALL {
      if let Some(neighbor_index) = self.chunks[index.0].neighbor(face) {
        self.chunks[neighbor_index.0].set_neighbor(face.opposite(), None);
      }
    }
  }

  /// Removes a chunk by swap-remove, patching the table entry and the
  /// active-list back-index of whatever chunk moved into its slot, and
  /// unlinking/relinking neighbors.
  fn remove_chunk(&mut self, index: ChunkIndex) {
    self.unlink_neighbors(index);
    if self.chunks[index.0].is_active() {
      self.remove_from_active_list(index);
    }
    let coord = self.chunks[index.0].coord;
    self.table.remove(coord);

    let last = self.chunks.len() - 1;
    if index.0 != last {
      self.chunks.swap(index.0, last);
      let moved_coord = self.chunks[index.0].coord;
      self.table.repoint(moved_coord, index);
      if let Some(active_idx) = self.chunks[index.0].active_list_idx {
        self.active[active_idx] = index;
      }
      // The moved chunk's neighbors still hold `ChunkIndex(last)`; repair them.
      for face in Face::ALL {
        if let Some(neighbor_index) = self.chunks[index.0].neighbor(face) {
          self.chunks[neighbor_index.0].set_neighbor(face.opposite(), Some(index));
        }
      }
    }
    self.chunks.pop();
  }

  // === Active list ===

  fn push_active(&mut self, index: ChunkIndex) {
    if self.chunks[index.0].is_active() {
      return;
    }
    let active_idx = self.active.len();
    self.active.push(index);
    self.chunks[index.0].active_list_idx = Some(active_idx);
    self.chunks[index.0].stable_frames = 0;
    self.chunks[index.0].is_stable = false;
  }

  fn remove_from_active_list(&mut self, index: ChunkIndex) {
    let Some(active_idx) = self.chunks[index.0].active_list_idx else {
      return;
    };
    let last = self.active.len() - 1;
    self.active.swap(active_idx, last);
    self.active.pop();
    self.chunks[index.0].active_list_idx = None;
    if active_idx < self.active.len() {
      let moved = self.active[active_idx];
      self.chunks[moved.0].active_list_idx = Some(active_idx);
    }
  }

  /// Reactivates a chunk (resetting its stable counter) without touching
  /// its dirty region; used by neighbor-originated flow and tool writes.
  pub(crate) fn reactivate_chunk(&mut self, index: ChunkIndex) {
    self.push_active(index);
    self.chunks[index.0].stable_frames = 0;
    self.chunks[index.0].is_stable = false;
  }

  /// Takes a chunk fully off the active list once it has stayed stable for
  /// twice the threshold, so the stepper stops even scanning it for a
  /// dirty region. A later write or neighbor flow re-adds it via
  /// [`World::reactivate_chunk`].
  pub(crate) fn demote_to_dormant(&mut self, index: ChunkIndex) {
    self.remove_from_active_list(index);
  }

  // === Cell access ===

  /// Read-only cell access. Returns the process-wide vacuum sentinel for
  /// any cell whose chunk has not been created.
  pub fn get_cell(&self, coord: CellCoord) -> &GridCell {
    let (chunk_coord, local) = coord.to_chunk_and_local();
    match self.find_chunk_index(chunk_coord) {
      Some(index) => self.chunks[index.0].cell(local),
      None => &VACUUM_SENTINEL,
    }
  }

  /// Writable cell access, creating the owning chunk on demand and marking
  /// it active (expanding its dirty region to include this cell).
  pub fn get_cell_for_write(&mut self, coord: CellCoord) -> Result<&mut GridCell, WriteError> {
    let (chunk_coord, local) = coord.to_chunk_and_local();
    let index = self.get_or_create_chunk(chunk_coord);
    self.mark_chunk_dirty(index, local);
    Ok(self.chunks[index.0].cell_mut(local))
  }

  pub(crate) fn mark_chunk_dirty(&mut self, index: ChunkIndex, local: LocalCoord) {
    self.chunks[index.0].dirty.expand(local);
    self.reactivate_chunk(index);
  }

  /// Forces the chunk owning `coord` onto the active list, creating it if
  /// absent, without otherwise touching the cell.
  pub fn mark_cell_active(&mut self, coord: CellCoord) {
    let (chunk_coord, local) = coord.to_chunk_and_local();
    let index = self.get_or_create_chunk(chunk_coord);
    self.mark_chunk_dirty(index, local);
  }

  /// Gives a subsystem simultaneous mutable access to two distinct chunks
  /// by index, via `split_at_mut` rather than unsafe pointer aliasing.
  pub(crate) fn chunk_pair_mut(&mut self, a: ChunkIndex, b: ChunkIndex) -> (&mut Chunk, &mut Chunk) {
    assert_ne!(a.0, b.0, "chunk_pair_mut requires distinct indices");
    if a.0 < b.0 {
      let (left, right) = self.chunks.split_at_mut(b.0);
      (&mut left[a.0], &mut right[0])
    } else {
      let (left, right) = self.chunks.split_at_mut(a.0);
      (&mut right[0], &mut left[b.0])
    }
  }

  pub(crate) fn chunk(&self, index: ChunkIndex) -> &Chunk {
    &self.chunks[index.0]
  }

  pub(crate) fn chunk_mut(&mut self, index: ChunkIndex) -> &mut Chunk {
    &mut self.chunks[index.0]
  }

  pub(crate) fn active_indices(&self) -> &[ChunkIndex] {
    &self.active
  }

  pub(crate) fn neighbor_index(&self, index: ChunkIndex, face: Face) -> Option<ChunkIndex> {
    self.chunks[index.0].neighbor(face)
  }

  // === Tool APIs ===

  /// Converts `joules` to per-material shares proportional to each
  /// present material's current heat capacity and adds them. A vacuum
  /// cell rejects heat (there is nothing to carry it). Marks the owning
  /// chunk active.
  pub fn add_heat_at(&mut self, pos: WorldPos, joules: f64) -> Result<(), DomainError> {
    DomainError::check_quantity(0.0, joules)?;
    let cell_coord = self.coord_space.world_to_cell(pos);
    let (chunk_coord, local) = cell_coord.to_chunk_and_local();
    let Some(index) = self.find_chunk_index(chunk_coord) else {
      warn!(?pos, "add_heat_at: no chunk allocated, heat rejected");
      return Ok(());
    };
    let cell = self.chunks[index.0].cell_mut(local);
    if cell.is_vacuum() {
      warn!(?pos, "add_heat_at: vacuum cell rejects heat");
      return Ok(());
    }
    let total_capacity: f64 = cell
      .iter_present()
      .map(|id| cell.entry(id).heat_capacity(MaterialRegistry::get(id).molar_heat_capacity))
      .sum();
    if total_capacity <= 0.0 {
      return Ok(());
    }
    let shares: Vec<(MaterialId, f64)> = cell
      .iter_present()
      .map(|id| {
        let capacity = cell
          .entry(id)
          .heat_capacity(MaterialRegistry::get(id).molar_heat_capacity);
        (id, capacity / total_capacity)
      })
      .collect();
    for (id, share) in shares {
      cell.add_energy(id, joules * share);
    }
    self.mark_chunk_dirty(index, local);
    trace!(?pos, joules, "add_heat_at applied");
    Ok(())
  }

  /// Symmetric to [`World::add_heat_at`]: removes `joules`, clamped so no
  /// entry's energy goes negative.
  pub fn remove_heat_at(&mut self, pos: WorldPos, joules: f64) -> Result<(), DomainError> {
    DomainError::check_quantity(0.0, joules)?;
    let cell_coord = self.coord_space.world_to_cell(pos);
    let (chunk_coord, local) = cell_coord.to_chunk_and_local();
    let Some(index) = self.find_chunk_index(chunk_coord) else {
      return Ok(());
    };
    let cell = self.chunks[index.0].cell_mut(local);
    if cell.is_vacuum() {
      return Ok(());
    }
    let total_capacity: f64 = cell
      .iter_present()
      .map(|id| cell.entry(id).heat_capacity(MaterialRegistry::get(id).molar_heat_capacity))
      .sum();
    if total_capacity <= 0.0 {
      return Ok(());
    }
    let shares: Vec<(MaterialId, f64)> = cell
      .iter_present()
      .map(|id| {
        let capacity = cell
          .entry(id)
          .heat_capacity(MaterialRegistry::get(id).molar_heat_capacity);
        (id, capacity / total_capacity)
      })
      .collect();
    for (id, share) in shares {
      cell.add_energy(id, -joules * share);
    }
    self.mark_chunk_dirty(index, local);
    trace!(?pos, joules, "remove_heat_at applied");
    Ok(())
  }

  /// Adds liquid water at ambient temperature, marking the cell active.
  pub fn add_water_at(&mut self, pos: WorldPos, moles: f64) -> Result<(), DomainError> {
    let cp_water = MaterialRegistry::get(MaterialId::Water).molar_heat_capacity;
    let energy = moles * cp_water * self.config.ambient_temperature_k;
    DomainError::check_quantity(moles, energy)?;
    let cell_coord = self.coord_space.world_to_cell(pos);
    let cell = self.get_cell_for_write(cell_coord)?;
    cell.add_material(MaterialId::Water, moles, energy)?;
    trace!(?pos, moles, "add_water_at applied");
    Ok(())
  }

  /// Read-only summary of the cell at `pos`, for UI overlays. Never
  /// mutates or creates a chunk.
  pub fn get_cell_info(&self, pos: WorldPos) -> CellInfo {
    let cell_coord = self.coord_space.world_to_cell(pos);
    let cell = self.get_cell(cell_coord);
    if cell.is_vacuum() {
      return CellInfo {
        valid: true,
        material_count: 0,
        primary_material: None,
        temperature: 0.0,
        primary_phase: None,
      };
    }
    let primary = cell.primary_material();
    CellInfo {
      valid: true,
      material_count: cell.iter_present().count() as u32,
      primary_material: primary,
      temperature: cell.get_temperature(),
      primary_phase: primary.map(|id| MaterialRegistry::get(id).phase),
    }
  }

  // === Stepping ===

  /// Advances the full pipeline (all subsystems enabled).
  pub fn step(&mut self, dt: f64) {
    self.step_flags(dt, sim_flags::ALL);
  }

  /// Advances the pipeline with a caller-selected subsystem subset.
  #[tracing::instrument(skip(self), fields(tick = self.tick))]
  pub fn step_flags(&mut self, dt: f64, flags: sim_flags::SimFlags) {
    self.accumulator += dt;
    let sub_step = self.config.sub_step_seconds;
    while self.accumulator >= sub_step {
      self.accumulator -= sub_step;
      Stepper::advance(self, sub_step, flags);
      self.tick = self.tick.wrapping_add(1);
    }
  }

  // === Terrain ===

  /// Fills the world from a 2D integer height map: cells below `height[x][z]`
  /// become `ROCK`, with a thin `DIRT` topsoil layer, at ambient
  /// temperature; cells above stay vacuum. Deterministic in the height map.
  pub fn init_terrain(&mut self, height_map: &terrain::HeightMap) {
    terrain::fill(self, height_map);
  }

  // === Maintenance & audits ===

  /// Removes every chunk that holds no matter and is not on the active
  /// list. Reserved low-frequency maintenance, not automatic GC during
  /// stepping.
  pub fn cleanup(&mut self) {
    let mut index = ChunkIndex(0);
    while index.0 < self.chunks.len() {
      let chunk = &self.chunks[index.0];
      let empty = !chunk.is_active() && MaterialId::ALL.iter().all(|&id| chunk.total_mass(id) <= 0.0);
      if empty {
        self.remove_chunk(index);
      } else {
        index.0 += 1;
      }
    }
  }

  /// Total moles of `id` across every allocated chunk.
  pub fn total_mass(&self, id: MaterialId) -> f64 {
    self.chunks.iter().map(|c| c.total_mass(id)).sum()
  }

  /// Total thermal energy across every allocated chunk.
  pub fn total_energy(&self) -> f64 {
    self.chunks.iter().map(|c| c.total_energy()).sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn test_world() -> World {
    World::init()
  }

  #[test]
  fn get_cell_on_unallocated_space_returns_vacuum_sentinel() {
    let world = test_world();
    let cell = world.get_cell(CellCoord::new(100, 100, 100));
    assert!(cell.is_vacuum());
  }

  #[test]
  fn get_cell_for_write_creates_chunk_and_marks_active() {
    let mut world = test_world();
    assert_eq!(world.chunk_count(), 0);
    world
      .get_cell_for_write(CellCoord::new(0, 0, 0))
      .unwrap()
      .add_material(MaterialId::Water, 1.0, 100.0)
      .unwrap();
    assert_eq!(world.chunk_count(), 1);
    assert_eq!(world.active_count(), 1);
  }

  #[test]
  fn add_water_then_read_back() {
    let mut world = test_world();
    let pos = WorldPos::new(1.5, 1.5, 1.5);
    world.add_water_at(pos, 2.0).unwrap();
    let info = world.get_cell_info(pos);
    assert_eq!(info.primary_material, Some(MaterialId::Water));
    assert!(info.temperature > 0.0);
  }

  #[test]
  fn add_heat_to_vacuum_is_rejected_silently() {
    let mut world = test_world();
    let pos = WorldPos::new(0.5, 0.5, 0.5);
    world.add_heat_at(pos, 1000.0).unwrap();
    assert_eq!(world.total_energy(), 0.0);
  }

  #[test]
  fn neighbor_links_form_when_adjacent_chunks_created() {
    let mut world = test_world();
    world
      .get_cell_for_write(CellCoord::new(0, 0, 0))
      .unwrap();
    world
      .get_cell_for_write(CellCoord::new(32, 0, 0))
      .unwrap();
    let a = world.find_chunk_index(ChunkCoord::new(0, 0, 0)).unwrap();
    let b = world.find_chunk_index(ChunkCoord::new(1, 0, 0)).unwrap();
    assert_eq!(world.chunk(a).neighbor(Face::PosX), Some(b));
    assert_eq!(world.chunk(b).neighbor(Face::NegX), Some(a));
  }

  #[test]
  fn cleanup_removes_empty_inactive_chunks_and_preserves_others() {
    let mut world = test_world();
    world
      .get_cell_for_write(CellCoord::new(0, 0, 0))
      .unwrap()
      .add_material(MaterialId::Water, 1.0, 100.0)
      .unwrap();
    // A second, neighboring chunk allocated but never written with matter.
    world.get_or_create_chunk(ChunkCoord::new(1, 0, 0));
    world.remove_from_active_list(ChunkIndex(1));
    assert_eq!(world.chunk_count(), 2);
    world.cleanup();
    assert_eq!(world.chunk_count(), 1);
    assert!(world.total_mass(MaterialId::Water) > 0.0);
  }

  #[test]
  fn active_list_back_indices_stay_consistent_under_removal() {
    let mut world = test_world();
    for i in 0..5 {
      world
        .get_cell_for_write(CellCoord::new(i * 32, 0, 0))
        .unwrap()
        .add_material(MaterialId::Water, 1.0, 10.0)
        .unwrap();
    }
    assert_eq!(world.active_count(), 5);
    let victim = world.active[2];
    world.remove_from_active_list(victim);
    assert_eq!(world.active_count(), 4);
    for &idx in &world.active.clone() {
      assert_eq!(world.chunk(idx).active_list_idx, world.active.iter().position(|&i| i == idx));
    }
  }
}
