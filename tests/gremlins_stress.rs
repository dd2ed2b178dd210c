//! Stress test — fires a seeded sequence of random tool-API calls and full
//! pipeline steps, and asserts the invariants that must hold regardless of
//! the specific sequence: no negative moles/energy, and two runs from the
//! same seed reach bit-identical totals (determinism, spec §9).

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use voxel_world::config::sim_flags;
use voxel_world::{CellCoord, MaterialId, World, WorldPos};

const GAS_IDS: [MaterialId; 4] = [
  MaterialId::Nitrogen,
  MaterialId::Oxygen,
  MaterialId::CarbonDioxide,
  MaterialId::Steam,
];

fn run_gremlins(seed: u64, ticks: u32) -> World {
  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  let mut world = World::init();

  for _ in 0..ticks {
    let action = rng.gen_range(0..4);
    let x = rng.gen_range(-16i64..16);
    let y = rng.gen_range(0i64..16);
    let z = rng.gen_range(-16i64..16);
    let pos = WorldPos::new(x as f64 + 0.5, y as f64 + 0.5, z as f64 + 0.5);

    match action {
      0 => {
        let moles = rng.gen_range(0.0..10.0);
        world.add_water_at(pos, moles).unwrap();
      }
      1 => {
        let joules = rng.gen_range(0.0..5000.0);
        world.add_heat_at(pos, joules).unwrap();
      }
      2 => {
        let joules = rng.gen_range(0.0..2000.0);
        world.remove_heat_at(pos, joules).unwrap();
      }
      _ => {
        let id = GAS_IDS[rng.gen_range(0..GAS_IDS.len())];
        let moles = rng.gen_range(0.0..3.0);
        let energy = moles * 30.0 * 293.0;
        if let Ok(cell) = world.get_cell_for_write(CellCoord::new(x, y, z)) {
          let _ = cell.add_material(id, moles, energy);
        }
      }
    }

    world.step_flags(1.0 / 60.0, sim_flags::ALL);
  }

  world
}

#[test]
fn gremlins_never_produce_negative_moles_or_energy() {
  let world = run_gremlins(1337, 400);
  for id in MaterialId::ALL {
    assert!(world.total_mass(id) >= 0.0, "{id:?} went negative");
  }
  assert!(world.total_energy() >= 0.0);
}

#[test]
fn gremlins_are_deterministic_from_the_same_seed() {
  let a = run_gremlins(2024, 200);
  let b = run_gremlins(2024, 200);
  for id in MaterialId::ALL {
    assert_eq!(a.total_mass(id), b.total_mass(id), "{id:?} mass diverged");
  }
  assert_eq!(a.total_energy(), b.total_energy());
  assert_eq!(a.chunk_count(), b.chunk_count());
}

#[test]
fn different_seeds_can_diverge() {
  let a = run_gremlins(1, 200);
  let b = run_gremlins(2, 200);
  // Not a hard guarantee for every possible pair of seeds, but with this
  // many randomized injections across 200 ticks the two runs are
  // overwhelmingly likely to differ in at least one total.
  let same_everything = MaterialId::ALL.iter().all(|&id| a.total_mass(id) == b.total_mass(id))
    && a.total_energy() == b.total_energy();
  assert!(!same_everything, "expected distinct seeds to diverge");
}
