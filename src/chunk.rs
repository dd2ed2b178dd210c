//! Chunk storage: a dense `CHUNK_SIDE`^3 array of cells plus the
//! bookkeeping the stepper needs to skip quiescent regions and walk
//! between neighboring chunks without a hash lookup per cell.

use crate::cell::GridCell;
use crate::coords::{Face, LocalCoord, CHUNK_SIDE, CHUNK_VOLUME};

/// Stable handle to a chunk inside [`crate::world::World`]'s dense chunk
/// vector. Valid only as long as no chunk is removed by swap-remove; the
/// world never reassigns an index to a chunk while other chunks still hold
/// neighbor links to the old occupant, so links are patched on removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkIndex(pub usize);

/// Tracks the smallest axis-aligned box of local coordinates touched since
/// the last reset, so a subsystem pass can skip untouched chunks instead of
/// visiting every cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyRegion {
  pub dirty: bool,
  pub min: LocalCoord,
  pub max: LocalCoord,
}

impl Default for DirtyRegion {
  fn default() -> Self {
    Self::empty()
  }
}

impl DirtyRegion {
  pub fn empty() -> Self {
    Self {
      dirty: false,
      min: LocalCoord::new(0, 0, 0),
      max: LocalCoord::new(0, 0, 0),
    }
  }

  /// A region covering the entire chunk, used on creation and terrain fill.
  pub fn full() -> Self {
    let last = (CHUNK_SIDE - 1) as u8;
    Self {
      dirty: true,
      min: LocalCoord::new(0, 0, 0),
      max: LocalCoord::new(last, last, last),
    }
  }

  /// Widens the box to include `local`, marking it dirty.
  pub fn expand(&mut self, local: LocalCoord) {
    if !self.dirty {
      self.min = local;
      self.max = local;
      self.dirty = true;
      return;
    }
    self.min.x = self.min.x.min(local.x);
    self.min.y = self.min.y.min(local.y);
    self.min.z = self.min.z.min(local.z);
    self.max.x = self.max.x.max(local.x);
    self.max.y = self.max.y.max(local.y);
    self.max.z = self.max.z.max(local.z);
  }

  pub fn reset(&mut self) {
    self.dirty = false;
  }
}

/// One chunk's worth of cells, plus neighbor links and lifecycle state.
///
/// Neighbor links are resolved once when a chunk is created or a
/// neighboring chunk comes into or out of existence, rather than hashed on
/// every access.
pub struct Chunk {
  pub coord: crate::coords::ChunkCoord,
  cells: Box<[GridCell; CHUNK_VOLUME]>,
  /// Indexed by `Face::index()`. `None` means that neighbor is unloaded
  /// (treated as solid boundary by the flow subsystem, as vacuum by heat).
  neighbors: [Option<ChunkIndex>; 6],
  pub dirty: DirtyRegion,
  /// Consecutive ticks this chunk has produced no change worth keeping it
  /// processed for.
  pub stable_frames: u32,
  /// Still on the active list, but skipped by subsystems until an
  /// external write or neighbor flow resets `stable_frames`.
  pub is_stable: bool,
  /// Index into `World::active`, so the chunk can remove itself in O(1)
  /// via swap-remove. `None` while not in the active list (dormant).
  pub active_list_idx: Option<usize>,
}

impl Chunk {
  pub fn new_empty(coord: crate::coords::ChunkCoord) -> Self {
    Self {
      coord,
      cells: Box::new(std::array::from_fn(|_| GridCell::empty())),
      neighbors: [None; 6],
      dirty: DirtyRegion::empty(),
      stable_frames: 0,
      is_stable: false,
      active_list_idx: None,
    }
  }

  #[inline]
  pub fn cell(&self, local: LocalCoord) -> &GridCell {
    &self.cells[local.flat_index()]
  }

  #[inline]
  pub fn cell_mut(&mut self, local: LocalCoord) -> &mut GridCell {
    &mut self.cells[local.flat_index()]
  }

  /// Mutable access to two distinct cells within this chunk, via
  /// `split_at_mut` over the flat array rather than unsafe aliasing.
  /// Mirrors [`crate::world::World::chunk_pair_mut`]'s approach one level
  /// down, for subsystems whose face-stepped neighbor lands in the same
  /// chunk.
  pub fn cell_pair_mut(&mut self, a: LocalCoord, b: LocalCoord) -> (&mut GridCell, &mut GridCell) {
    let ia = a.flat_index();
    let ib = b.flat_index();
    assert_ne!(ia, ib, "cell_pair_mut requires distinct cells");
    if ia < ib {
      let (left, right) = self.cells.split_at_mut(ib);
      (&mut left[ia], &mut right[0])
    } else {
      let (left, right) = self.cells.split_at_mut(ia);
      (&mut right[0], &mut left[ib])
    }
  }

  #[inline]
  pub fn neighbor(&self, face: Face) -> Option<ChunkIndex> {
    self.neighbors[face.index()]
  }

  #[inline]
  pub fn set_neighbor(&mut self, face: Face, index: Option<ChunkIndex>) {
    self.neighbors[face.index()] = index;
  }

  pub fn is_active(&self) -> bool {
    self.active_list_idx.is_some()
  }

  /// Iterates every local coordinate within the chunk's current dirty box
  /// (or its single default cell, if never expanded).
  pub fn iter_dirty_locals(&self) -> impl Iterator<Item = LocalCoord> {
    Self::locals_in_region(self.dirty)
  }

  /// Iterates every local coordinate within a captured [`DirtyRegion`]
  /// snapshot. Used by subsystems that take the region to scan as a
  /// parameter rather than reading `self.dirty` directly, so the region
  /// can be reset up front while the scan still covers the pre-reset box.
  pub fn locals_in_region(region: DirtyRegion) -> impl Iterator<Item = LocalCoord> {
    (region.min.z..=region.max.z).flat_map(move |z| {
      (region.min.y..=region.max.y)
        .flat_map(move |y| (region.min.x..=region.max.x).map(move |x| LocalCoord::new(x, y, z)))
    })
  }

  /// Iterates every local coordinate in the chunk, regardless of dirty
  /// state. Used by terrain fill and audits.
  pub fn iter_all_locals() -> impl Iterator<Item = LocalCoord> {
    (0..CHUNK_SIDE as u8).flat_map(move |z| {
      (0..CHUNK_SIDE as u8)
        .flat_map(move |y| (0..CHUNK_SIDE as u8).map(move |x| LocalCoord::new(x, y, z)))
    })
  }

  pub fn total_mass(&self, id: crate::material::MaterialId) -> f64 {
    self.cells.iter().map(|c| c.entry(id).moles).sum()
  }

  pub fn total_energy(&self) -> f64 {
    self.cells.iter().map(|c| c.total_energy()).sum()
  }
}
