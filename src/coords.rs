//! Coordinate types and conversions between world space, cell space, and
//! chunk-local space.
//!
//! - [`CellCoord`]: absolute integer cell coordinate (i64, effectively
//!   unbounded).
//! - [`ChunkCoord`]: chunk grid coordinate (i32).
//! - [`LocalCoord`]: position within a chunk, `[0, CHUNK_SIDE)` per axis.
//! - [`WorldPos`]: floating-point world-space position consumed/produced by
//!   the tool APIs.

/// Chunks are `CHUNK_SIDE`^3 cells. 32 is the spec's reference size.
pub const CHUNK_SIDE: usize = 32;
pub const CHUNK_VOLUME: usize = CHUNK_SIDE * CHUNK_SIDE * CHUNK_SIDE;

/// Absolute integer cell coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellCoord {
  pub x: i64,
  pub y: i64,
  pub z: i64,
}

impl CellCoord {
  pub const fn new(x: i64, y: i64, z: i64) -> Self {
    Self { x, y, z }
  }

  /// Splits into the owning chunk coordinate and the local offset within it.
  ///
  /// Uses floor division so negative coordinates map correctly: cell -1
  /// belongs to chunk -1 at local offset `CHUNK_SIDE - 1`.
  pub fn to_chunk_and_local(self) -> (ChunkCoord, LocalCoord) {
    let side = CHUNK_SIDE as i64;
    let cx = self.x.div_euclid(side) as i32;
    let cy = self.y.div_euclid(side) as i32;
    let cz = self.z.div_euclid(side) as i32;
    let lx = self.x.rem_euclid(side) as u8;
    let ly = self.y.rem_euclid(side) as u8;
    let lz = self.z.rem_euclid(side) as u8;
    (ChunkCoord::new(cx, cy, cz), LocalCoord::new(lx, ly, lz))
  }

  pub const fn offset(self, dx: i64, dy: i64, dz: i64) -> Self {
    Self::new(self.x + dx, self.y + dy, self.z + dz)
  }
}

/// Chunk grid coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
  pub x: i32,
  pub y: i32,
  pub z: i32,
}

impl ChunkCoord {
  pub const fn new(x: i32, y: i32, z: i32) -> Self {
    Self { x, y, z }
  }

  /// World-space origin (lowest corner) of this chunk, in cell coordinates.
  pub const fn origin_cell(self) -> CellCoord {
    CellCoord::new(
      self.x as i64 * CHUNK_SIDE as i64,
      self.y as i64 * CHUNK_SIDE as i64,
      self.z as i64 * CHUNK_SIDE as i64,
    )
  }

  pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
    Self::new(self.x + dx, self.y + dy, self.z + dz)
  }
}

/// Position within a chunk, each axis in `[0, CHUNK_SIDE)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalCoord {
  pub x: u8,
  pub y: u8,
  pub z: u8,
}

impl LocalCoord {
  pub const fn new(x: u8, y: u8, z: u8) -> Self {
    Self { x, y, z }
  }

  /// Flattened index into a chunk's dense cell array: `(z*S + y)*S + x`.
  #[inline]
  pub const fn flat_index(self) -> usize {
    (self.z as usize * CHUNK_SIDE + self.y as usize) * CHUNK_SIDE + self.x as usize
  }
}

/// Floating-point world-space position, as used by external tool APIs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldPos {
  pub x: f64,
  pub y: f64,
  pub z: f64,
}

impl WorldPos {
  pub const fn new(x: f64, y: f64, z: f64) -> Self {
    Self { x, y, z }
  }
}

/// Converts between world-space float positions and integer cell
/// coordinates, given a fixed cell size and world origin offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordSpace {
  /// World units per cell edge.
  pub cell_size: f64,
  /// World-space position of cell `(0, 0, 0)`'s minimum corner.
  pub origin: WorldPos,
}

impl Default for CoordSpace {
  fn default() -> Self {
    Self {
      cell_size: 1.0,
      origin: WorldPos::new(0.0, 0.0, 0.0),
    }
  }
}

impl CoordSpace {
  pub const fn new(cell_size: f64, origin: WorldPos) -> Self {
    Self { cell_size, origin }
  }

  /// Maps a world-space position to the cell that contains it.
  pub fn world_to_cell(&self, pos: WorldPos) -> CellCoord {
    CellCoord::new(
      ((pos.x - self.origin.x) / self.cell_size).floor() as i64,
      ((pos.y - self.origin.y) / self.cell_size).floor() as i64,
      ((pos.z - self.origin.z) / self.cell_size).floor() as i64,
    )
  }

  /// Maps a cell coordinate to the world-space center of that cell.
  pub fn cell_to_world(&self, cell: CellCoord) -> WorldPos {
    WorldPos::new(
      self.origin.x + (cell.x as f64 + 0.5) * self.cell_size,
      self.origin.y + (cell.y as f64 + 0.5) * self.cell_size,
      self.origin.z + (cell.z as f64 + 0.5) * self.cell_size,
    )
  }
}

/// One of the six chunk faces, used by the heat/flow/gas subsystems to walk
/// neighbors in a fixed order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
  PosX,
  NegX,
  PosY,
  NegY,
  PosZ,
  NegZ,
}

impl Face {
  pub const ALL: [Face; 6] = [
    Face::PosX,
    Face::NegX,
    Face::PosY,
    Face::NegY,
    Face::PosZ,
    Face::NegZ,
  ];

  /// The "positive" half of the six faces: `+x, +y, +z`. Subsystems that
  /// need to touch each inter-chunk face exactly once per pass iterate only
  /// these three from every active cell.
  pub const POSITIVE: [Face; 3] = [Face::PosX, Face::PosY, Face::PosZ];

  #[inline]
  pub const fn index(self) -> usize {
    match self {
      Face::PosX => 0,
      Face::NegX => 1,
      Face::PosY => 2,
      Face::NegY => 3,
      Face::PosZ => 4,
      Face::NegZ => 5,
    }
  }

  #[inline]
  pub const fn opposite(self) -> Face {
    match self {
      Face::PosX => Face::NegX,
      Face::NegX => Face::PosX,
      Face::PosY => Face::NegY,
      Face::NegY => Face::PosY,
      Face::PosZ => Face::NegZ,
      Face::NegZ => Face::PosZ,
    }
  }

  #[inline]
  pub const fn chunk_delta(self) -> (i32, i32, i32) {
    match self {
      Face::PosX => (1, 0, 0),
      Face::NegX => (-1, 0, 0),
      Face::PosY => (0, 1, 0),
      Face::NegY => (0, -1, 0),
      Face::PosZ => (0, 0, 1),
      Face::NegZ => (0, 0, -1),
    }
  }
}
