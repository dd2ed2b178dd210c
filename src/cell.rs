//! Grid cell: a fixed-capacity bag of material entries plus a presence
//! bitmask and a cached aggregate temperature.

use crate::error::DomainError;
use crate::material::{MaterialId, MaterialRegistry, MATERIAL_COUNT};

/// Below this many moles, a material entry is considered absent and its
/// presence bit is cleared.
pub const EPSILON_MOLES: f64 = 1e-9;

/// Per-material state held inside a [`GridCell`]: moles present and the
/// thermal energy (joules) carried by those moles.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MaterialEntry {
  pub moles: f64,
  pub thermal_energy: f64,
}

impl MaterialEntry {
  /// `E / (n * Cp)`, clamped at 0 K from below. Zero moles has no defined
  /// temperature and reports 0.
  #[inline]
  pub fn temperature(&self, molar_heat_capacity: f64) -> f64 {
    if self.moles <= EPSILON_MOLES || molar_heat_capacity <= 0.0 {
      return 0.0;
    }
    (self.thermal_energy / (self.moles * molar_heat_capacity)).max(0.0)
  }

  /// Heat capacity of the moles currently present: `n * Cp`.
  #[inline]
  pub fn heat_capacity(&self, molar_heat_capacity: f64) -> f64 {
    self.moles * molar_heat_capacity
  }
}

/// A single addressable simulation cell.
///
/// Holds a dense array of [`MATERIAL_COUNT`] material entries indexed by
/// [`MaterialId::index`], a presence bitmask for O(popcount) iteration, and
/// a cached aggregate temperature invalidated on every mutation. An empty
/// cell (`present == 0`) is vacuum: it has no temperature and does not
/// conduct or receive heat.
#[derive(Clone, Copy, Debug)]
pub struct GridCell {
  entries: [MaterialEntry; MATERIAL_COUNT],
  present: u16,
  /// Cached aggregate temperature. `None` after any mutation; recomputed
  /// (but not restored into the cache, since most reads only hold `&self`)
  /// the next time [`GridCell::get_temperature`] is called.
  cached_temperature: Option<f64>,
}

impl Default for GridCell {
  fn default() -> Self {
    Self::empty()
  }
}

/// A process-lifetime vacuum cell, returned by reference wherever a read
/// touches a cell coordinate whose chunk was never allocated.
pub static VACUUM_SENTINEL: GridCell = GridCell::empty();

impl GridCell {
  /// Returns a vacuum cell: no materials present.
  pub const fn empty() -> Self {
    Self {
      entries: [MaterialEntry {
        moles: 0.0,
        thermal_energy: 0.0,
      }; MATERIAL_COUNT],
      present: 0,
      cached_temperature: Some(0.0),
    }
  }

  #[inline]
  pub fn is_vacuum(&self) -> bool {
    self.present == 0
  }

  #[inline]
  pub fn has(&self, id: MaterialId) -> bool {
    self.present & (1 << id.index()) != 0
  }

  #[inline]
  fn set_presence(&mut self, id: MaterialId, present: bool) {
    let bit = 1u16 << id.index();
    if present {
      self.present |= bit;
    } else {
      self.present &= !bit;
    }
  }

  /// Invalidates the cached aggregate temperature. Must be called after
  /// any mutation to an entry.
  #[inline]
  fn invalidate(&mut self) {
    self.cached_temperature = None;
  }

  pub fn entry(&self, id: MaterialId) -> &MaterialEntry {
    &self.entries[id.index()]
  }

  /// Adds `moles` and `energy` to the entry for `id`, accumulating into any
  /// existing amount (the call is commutative: repeated adds sum). Sets the
  /// presence bit and invalidates the cached temperature.
  ///
  /// Rejects non-finite or negative inputs without mutating state.
  pub fn add_material(
    &mut self,
    id: MaterialId,
    moles: f64,
    energy: f64,
  ) -> Result<(), DomainError> {
    DomainError::check_quantity(moles, energy)?;
    let entry = &mut self.entries[id.index()];
    entry.moles += moles;
    entry.thermal_energy += energy;
    let present = entry.moles > EPSILON_MOLES;
    self.set_presence(id, present);
    self.invalidate();
    Ok(())
  }

  /// Clears the presence bit for `id` and zeros its entry.
  pub fn remove_material(&mut self, id: MaterialId) {
    self.entries[id.index()] = MaterialEntry::default();
    self.set_presence(id, false);
    self.invalidate();
  }

  /// Adds (or, if negative, removes) thermal energy directly, clamping the
  /// result at 0 so energy never goes negative. No-op on an absent
  /// material (vacuum does not receive heat).
  pub fn add_energy(&mut self, id: MaterialId, delta: f64) {
    if !self.has(id) {
      return;
    }
    let entry = &mut self.entries[id.index()];
    entry.thermal_energy = (entry.thermal_energy + delta).max(0.0);
    self.invalidate();
  }

  /// Moves `moles` and `energy` out of this cell's entry for `id`,
  /// clamping so neither drops below zero. Returns the amount actually
  /// removed (which may be less than requested).
  pub fn withdraw(&mut self, id: MaterialId, moles: f64, energy: f64) -> (f64, f64) {
    let entry = &mut self.entries[id.index()];
    let taken_moles = moles.min(entry.moles).max(0.0);
    let taken_energy = energy.min(entry.thermal_energy).max(0.0);
    entry.moles -= taken_moles;
    entry.thermal_energy -= taken_energy;
    let present = entry.moles > EPSILON_MOLES;
    self.set_presence(id, present);
    self.invalidate();
    (taken_moles, taken_energy)
  }

  /// Heat-capacity-weighted average temperature across all present
  /// materials. Returns exactly 0 for vacuum. Cached until the next
  /// mutation.
  pub fn get_temperature(&self) -> f64 {
    if let Some(cached) = self.cached_temperature {
      return cached;
    }
    self.compute_temperature()
  }

  /// Recomputes the aggregate temperature and stores it in the cache.
  /// Prefer this over [`GridCell::get_temperature`] on a hot path that
  /// already holds `&mut self`, so the next read is a plain field load.
  pub fn refresh_temperature_cache(&mut self) -> f64 {
    let temperature = self.compute_temperature();
    self.cached_temperature = Some(temperature);
    temperature
  }

  fn compute_temperature(&self) -> f64 {
    let mut total_capacity = 0.0;
    let mut total_energy = 0.0;
    for id in MaterialId::ALL {
      if !self.has(id) {
        continue;
      }
      let entry = self.entry(id);
      let cp = MaterialRegistry::get(id).molar_heat_capacity;
      total_capacity += entry.heat_capacity(cp);
      total_energy += entry.thermal_energy;
    }
    if total_capacity > 0.0 {
      (total_energy / total_capacity).max(0.0)
    } else {
      0.0
    }
  }

  /// Rebalances total energy across present materials so every present
  /// material ends up at the same temperature, without changing the total.
  /// A no-op for zero or one present material.
  pub fn equilibrate(&mut self) {
    let mut total_capacity = 0.0;
    let mut total_energy = 0.0;
    let mut present_ids = [MaterialId::None; MATERIAL_COUNT];
    let mut present_count = 0;
    for id in MaterialId::ALL {
      if !self.has(id) {
        continue;
      }
      let entry = self.entry(id);
      let cp = MaterialRegistry::get(id).molar_heat_capacity;
      total_capacity += entry.heat_capacity(cp);
      total_energy += entry.thermal_energy;
      present_ids[present_count] = id;
      present_count += 1;
    }
    if present_count < 2 || total_capacity <= 0.0 {
      return;
    }
    let shared_temperature = total_energy / total_capacity;
    for &id in &present_ids[..present_count] {
      let cp = MaterialRegistry::get(id).molar_heat_capacity;
      let entry = &mut self.entries[id.index()];
      entry.thermal_energy = (shared_temperature * entry.heat_capacity(cp)).max(0.0);
    }
    self.invalidate();
  }

  /// Distributes `amount` joules across every present material in
  /// proportion to its current heat capacity (`n * Cp`), the same sharing
  /// rule [`crate::world::World::add_heat_at`] uses for externally
  /// injected heat. A no-op on vacuum. `amount` may be negative (used by
  /// conduction and radiation to withdraw energy from a donor cell); the
  /// per-material clamp in [`GridCell::add_energy`] keeps every entry at
  /// or above zero regardless of sign.
  pub fn add_energy_distributed(&mut self, amount: f64) {
    if self.is_vacuum() {
      return;
    }
    let total_capacity: f64 = self
      .iter_present()
      .map(|id| {
        let cp = MaterialRegistry::get(id).molar_heat_capacity;
        self.entry(id).heat_capacity(cp)
      })
      .sum();
    if total_capacity <= 0.0 {
      return;
    }
    let mut present_ids = [MaterialId::None; MATERIAL_COUNT];
    let mut present_count = 0;
    for id in self.iter_present() {
      present_ids[present_count] = id;
      present_count += 1;
    }
    for &id in &present_ids[..present_count] {
      let cp = MaterialRegistry::get(id).molar_heat_capacity;
      let capacity = self.entry(id).heat_capacity(cp);
      let share = capacity / total_capacity;
      self.add_energy(id, amount * share);
    }
  }

  /// Capacity-weighted average thermal conductivity across present
  /// materials; `0.0` for vacuum. Used by inter-cell conduction to blend
  /// two cells' conductivities into one coupling coefficient.
  pub fn effective_conductivity(&self) -> f64 {
    let mut total_capacity = 0.0;
    let mut weighted = 0.0;
    for id in self.iter_present() {
      let props = MaterialRegistry::get(id);
      let capacity = self.entry(id).heat_capacity(props.molar_heat_capacity);
      total_capacity += capacity;
      weighted += capacity * props.thermal_conductivity;
    }
    if total_capacity > 0.0 {
      weighted / total_capacity
    } else {
      0.0
    }
  }

  /// True if any present material has `phase` as its intrinsic phase.
  pub fn has_phase(&self, phase: crate::material::Phase) -> bool {
    self.iter_present().any(|id| MaterialRegistry::get(id).phase == phase)
  }

  /// Total moles present across every material.
  pub fn total_moles(&self) -> f64 {
    MaterialId::ALL
      .iter()
      .filter(|&&id| self.has(id))
      .map(|&id| self.entry(id).moles)
      .sum()
  }

  /// Total thermal energy present across every material.
  pub fn total_energy(&self) -> f64 {
    MaterialId::ALL
      .iter()
      .filter(|&&id| self.has(id))
      .map(|&id| self.entry(id).thermal_energy)
      .sum()
  }

  /// Iterates present materials in ascending `MaterialId` order.
  pub fn iter_present(&self) -> impl Iterator<Item = MaterialId> + '_ {
    MaterialId::ALL.into_iter().filter(move |&id| self.has(id))
  }

  /// The material with the most moles in this cell, if any are present.
  pub fn primary_material(&self) -> Option<MaterialId> {
    self
      .iter_present()
      .max_by(|&a, &b| self.entry(a).moles.partial_cmp(&self.entry(b).moles).unwrap())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vacuum_has_no_temperature() {
    let cell = GridCell::empty();
    assert_eq!(cell.get_temperature(), 0.0);
    assert!(cell.is_vacuum());
  }

  #[test]
  fn add_then_remove_returns_to_vacuum() {
    let mut cell = GridCell::empty();
    cell.add_material(MaterialId::Water, 1.0, 1000.0).unwrap();
    assert!(cell.has(MaterialId::Water));
    cell.remove_material(MaterialId::Water);
    assert!(!cell.has(MaterialId::Water));
    assert!(cell.is_vacuum());
    assert_eq!(cell.total_moles(), 0.0);
  }

  #[test]
  fn add_material_is_commutative_with_repeats() {
    let mut cell = GridCell::empty();
    cell.add_material(MaterialId::Water, 1.0, 100.0).unwrap();
    cell.add_material(MaterialId::Water, 2.0, 200.0).unwrap();
    let entry = cell.entry(MaterialId::Water);
    assert_eq!(entry.moles, 3.0);
    assert_eq!(entry.thermal_energy, 300.0);
  }

  #[test]
  fn rejects_negative_and_nan() {
    let mut cell = GridCell::empty();
    assert!(cell.add_material(MaterialId::Water, -1.0, 0.0).is_err());
    assert!(cell.add_material(MaterialId::Water, f64::NAN, 0.0).is_err());
    assert!(cell.is_vacuum());
  }

  #[test]
  fn temperature_is_weighted_average() {
    let mut cell = GridCell::empty();
    let cp_water = MaterialRegistry::get(MaterialId::Water).molar_heat_capacity;
    cell
      .add_material(MaterialId::Water, 1.0, cp_water * 300.0)
      .unwrap();
    assert!((cell.get_temperature() - 300.0).abs() < 1e-6);
  }

  #[test]
  fn cache_invalidates_on_mutation() {
    let mut cell = GridCell::empty();
    let cp_water = MaterialRegistry::get(MaterialId::Water).molar_heat_capacity;
    cell
      .add_material(MaterialId::Water, 1.0, cp_water * 300.0)
      .unwrap();
    let _ = cell.get_temperature();
    cell.add_energy(MaterialId::Water, cp_water * 100.0);
    assert!((cell.get_temperature() - 400.0).abs() < 1e-6);
  }

  #[test]
  fn energy_never_goes_negative() {
    let mut cell = GridCell::empty();
    cell.add_material(MaterialId::Water, 1.0, 10.0).unwrap();
    cell.add_energy(MaterialId::Water, -1000.0);
    assert_eq!(cell.entry(MaterialId::Water).thermal_energy, 0.0);
  }

  #[test]
  fn equilibrate_preserves_total_energy() {
    let mut cell = GridCell::empty();
    cell.add_material(MaterialId::Water, 1.0, 1000.0).unwrap();
    cell.add_material(MaterialId::Air, 1.0, 10.0).unwrap();
    let total_before = cell.total_energy();
    cell.equilibrate();
    assert!((cell.total_energy() - total_before).abs() < 1e-9);
    let t_water = cell
      .entry(MaterialId::Water)
      .temperature(MaterialRegistry::get(MaterialId::Water).molar_heat_capacity);
    let t_air = cell
      .entry(MaterialId::Air)
      .temperature(MaterialRegistry::get(MaterialId::Air).molar_heat_capacity);
    assert!((t_water - t_air).abs() < 1e-6);
  }

  #[test]
  fn add_energy_distributed_preserves_shared_temperature() {
    let mut cell = GridCell::empty();
    cell.add_material(MaterialId::Water, 1.0, 1000.0).unwrap();
    cell.add_material(MaterialId::Air, 1.0, 10.0).unwrap();
    cell.equilibrate();
    let before = cell.get_temperature();
    cell.add_energy_distributed(500.0);
    let after = cell.get_temperature();
    assert!(after > before);
    // Both materials stay at the same (new) temperature since the
    // distribution preserves the shared-temperature invariant.
    let t_water = cell
      .entry(MaterialId::Water)
      .temperature(MaterialRegistry::get(MaterialId::Water).molar_heat_capacity);
    let t_air = cell
      .entry(MaterialId::Air)
      .temperature(MaterialRegistry::get(MaterialId::Air).molar_heat_capacity);
    assert!((t_water - t_air).abs() < 1e-6);
  }

  #[test]
  fn add_energy_distributed_is_noop_on_vacuum() {
    let mut cell = GridCell::empty();
    cell.add_energy_distributed(1000.0);
    assert!(cell.is_vacuum());
  }

  #[test]
  fn effective_conductivity_is_zero_for_vacuum() {
    let cell = GridCell::empty();
    assert_eq!(cell.effective_conductivity(), 0.0);
  }

  #[test]
  fn has_phase_detects_present_solid() {
    let mut cell = GridCell::empty();
    cell.add_material(MaterialId::Rock, 1.0, 100.0).unwrap();
    assert!(cell.has_phase(crate::material::Phase::Solid));
    assert!(!cell.has_phase(crate::material::Phase::Liquid));
  }

  #[test]
  fn no_conduction_to_vacuum_is_a_cell_level_guarantee() {
    // Vacuum has no entries to add energy to; add_energy on an absent
    // material is a no-op rather than creating one out of thin air.
    let mut cell = GridCell::empty();
    cell.add_energy(MaterialId::Water, 500.0);
    assert!(cell.is_vacuum());
  }
}
