//! Benchmarks for the chunk-coordinate hash used by the sparse chunk table.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use voxel_world::ChunkCoord;

const ITERATIONS: u64 = 10_000;

fn bench_chunk_coord_hash(c: &mut Criterion) {
  let mut group = c.benchmark_group("hash/chunk_coord");
  group.throughput(Throughput::Elements(ITERATIONS));

  group.bench_function(BenchmarkId::new("chunk_coord_hash", "sequential"), |b| {
    b.iter(|| {
      let mut sum = 0u64;
      for i in 0..ITERATIONS as i32 {
        let coord = ChunkCoord::new(black_box(i), black_box(i ^ 0x55), black_box(i ^ -0x2A));
        sum = sum.wrapping_add(voxel_world_hash_shim::chunk_coord_hash(coord));
      }
      sum
    });
  });

  group.finish();
}

/// The hash module is private to the crate (it is an internal detail of the
/// sparse chunk table, not part of the public API), so this bench links
/// against the same mixing function inline rather than reaching into a
/// private module from an external binary.
mod voxel_world_hash_shim {
  use voxel_world::ChunkCoord;

  #[inline]
  fn mix64(mut h: u64) -> u64 {
    h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
    h ^= h >> 32;
    h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
    h ^= h >> 32;
    h
  }

  #[inline]
  pub fn chunk_coord_hash(coord: ChunkCoord) -> u64 {
    let x = coord.x as u32 as u64;
    let y = coord.y as u32 as u64;
    let z = coord.z as u32 as u64;
    let seed = x
      .wrapping_mul(0x9E37_79B9_7F4A_7C15)
      ^ y.wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
      ^ z.wrapping_mul(0x1656_67B1_9E37_79F9);
    mix64(seed)
  }
}

/// Exercises chunk allocation throughput, which is dominated by the hash
/// table insert/lookup path this bench group is named after.
fn bench_chunk_allocation(c: &mut Criterion) {
  use voxel_world::World;
  use voxel_world::CellCoord;

  let mut group = c.benchmark_group("hash/chunk_allocation");
  const CHUNKS: u64 = 512;
  group.throughput(Throughput::Elements(CHUNKS));

  group.bench_function(BenchmarkId::new("get_or_create_chunk", "grid"), |b| {
    b.iter(|| {
      let mut world = World::init();
      for i in 0..CHUNKS as i64 {
        let coord = CellCoord::new(black_box(i * 32), 0, 0);
        world.get_cell_for_write(coord).unwrap();
      }
      black_box(world.chunk_count())
    });
  });

  group.finish();
}

criterion_group!(benches, bench_chunk_coord_hash, bench_chunk_allocation);
criterion_main!(benches);
