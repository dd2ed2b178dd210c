//! Material registry: physical constants for every material identifier.
//!
//! Materials are a closed enumeration rather than a polymorphic trait
//! object — operations that vary per material consult a single `const`
//! table indexed by [`MaterialId`]. No dynamic dispatch, no per-material
//! allocation.

/// Number of registered material identifiers, including [`MaterialId::None`].
pub const MATERIAL_COUNT: usize = 9;

/// Closed set of material identifiers. `None` represents the absence of a
/// material entry and is never present in a cell's bitmask; vacuum is the
/// empty bitmask, not an entry for `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MaterialId {
  None = 0,
  Air = 1,
  Water = 2,
  Rock = 3,
  Dirt = 4,
  Nitrogen = 5,
  Oxygen = 6,
  CarbonDioxide = 7,
  Steam = 8,
}

impl MaterialId {
  /// All physical (non-`None`) material identifiers, in registry order.
  pub const ALL: [MaterialId; MATERIAL_COUNT - 1] = [
    MaterialId::Air,
    MaterialId::Water,
    MaterialId::Rock,
    MaterialId::Dirt,
    MaterialId::Nitrogen,
    MaterialId::Oxygen,
    MaterialId::CarbonDioxide,
    MaterialId::Steam,
  ];

  /// Index into the presence bitmask / registry table.
  #[inline]
  pub const fn index(self) -> usize {
    self as usize
  }

  /// Reconstructs a `MaterialId` from its registry index.
  ///
  /// Panics on an out-of-range index; callers only ever pass indices
  /// obtained from [`MaterialId::index`] or bitmask iteration, both of
  /// which are bounded by [`MATERIAL_COUNT`].
  #[inline]
  pub const fn from_index(index: usize) -> MaterialId {
    match index {
      0 => MaterialId::None,
      1 => MaterialId::Air,
      2 => MaterialId::Water,
      3 => MaterialId::Rock,
      4 => MaterialId::Dirt,
      5 => MaterialId::Nitrogen,
      6 => MaterialId::Oxygen,
      7 => MaterialId::CarbonDioxide,
      8 => MaterialId::Steam,
      _ => panic!("material index out of range"),
    }
  }
}

/// Intrinsic phase of a material. Phase never changes at runtime; a
/// material undergoing a phase transition becomes a *different*
/// [`MaterialId`] (e.g. `Water` -> `Steam`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
  Solid,
  Liquid,
  Gas,
}

/// An 8-bit RGB color, informational only (render hint for a host UI).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}

const fn rgb(r: u8, g: u8, b: u8) -> Color {
  Color { r, g, b }
}

/// Physical constants for one material identifier.
#[derive(Clone, Copy, Debug)]
pub struct MaterialProperties {
  pub name: &'static str,
  pub phase: Phase,
  /// kg/mol.
  pub molar_mass: f64,
  /// J/(mol*K).
  pub molar_heat_capacity: f64,
  /// Kelvin; informational.
  pub melting_point_k: f64,
  /// Kelvin; informational.
  pub boiling_point_k: f64,
  /// J/mol; informational.
  pub enthalpy_fusion: f64,
  /// J/mol; informational.
  pub enthalpy_vaporization: f64,
  /// Relative thermal conductivity used by the heat subsystem.
  pub thermal_conductivity: f64,
  /// Relative viscosity; higher values spread more slowly.
  pub viscosity: f64,
  pub is_oxidizer: bool,
  pub is_fuel: bool,
  /// Kelvin; 0.0 means "never ignites".
  pub ignition_temperature_k: f64,
  /// J/mol released per mole burned; only meaningful when `is_fuel`.
  pub combustion_enthalpy: f64,
  pub color: Color,
}

const NONE_PROPERTIES: MaterialProperties = MaterialProperties {
  name: "None",
  phase: Phase::Gas,
  molar_mass: 0.0,
  molar_heat_capacity: 1.0,
  melting_point_k: 0.0,
  boiling_point_k: 0.0,
  enthalpy_fusion: 0.0,
  enthalpy_vaporization: 0.0,
  thermal_conductivity: 0.0,
  viscosity: 0.0,
  is_oxidizer: false,
  is_fuel: false,
  ignition_temperature_k: 0.0,
  combustion_enthalpy: 0.0,
  color: rgb(0, 0, 0),
};

/// The process-lifetime table of material constants, indexed by
/// [`MaterialId::index`].
pub static REGISTRY: [MaterialProperties; MATERIAL_COUNT] = [
  NONE_PROPERTIES,
  // Air
  MaterialProperties {
    name: "Air",
    phase: Phase::Gas,
    molar_mass: 0.029,
    molar_heat_capacity: 29.1,
    melting_point_k: 0.0,
    boiling_point_k: 0.0,
    enthalpy_fusion: 0.0,
    enthalpy_vaporization: 0.0,
    thermal_conductivity: 0.026,
    viscosity: 0.1,
    is_oxidizer: false,
    is_fuel: false,
    ignition_temperature_k: 0.0,
    combustion_enthalpy: 0.0,
    color: rgb(200, 220, 255),
  },
  // Water
  MaterialProperties {
    name: "Water",
    phase: Phase::Liquid,
    molar_mass: 0.018,
    molar_heat_capacity: 75.3,
    melting_point_k: 273.15,
    boiling_point_k: 373.15,
    enthalpy_fusion: 6010.0,
    enthalpy_vaporization: 40_660.0,
    thermal_conductivity: 0.6,
    viscosity: 1.0,
    is_oxidizer: false,
    is_fuel: false,
    ignition_temperature_k: 0.0,
    combustion_enthalpy: 0.0,
    color: rgb(40, 110, 200),
  },
  // Rock
  MaterialProperties {
    name: "Rock",
    phase: Phase::Solid,
    molar_mass: 0.26,
    molar_heat_capacity: 84.0,
    melting_point_k: 1473.0,
    boiling_point_k: 3000.0,
    enthalpy_fusion: 0.0,
    enthalpy_vaporization: 0.0,
    thermal_conductivity: 2.5,
    viscosity: f64::INFINITY,
    is_oxidizer: false,
    is_fuel: false,
    ignition_temperature_k: 0.0,
    combustion_enthalpy: 0.0,
    color: rgb(110, 110, 110),
  },
  // Dirt
  MaterialProperties {
    name: "Dirt",
    phase: Phase::Solid,
    molar_mass: 0.2,
    molar_heat_capacity: 80.0,
    melting_point_k: 1300.0,
    boiling_point_k: 2500.0,
    enthalpy_fusion: 0.0,
    enthalpy_vaporization: 0.0,
    thermal_conductivity: 1.0,
    viscosity: f64::INFINITY,
    is_oxidizer: false,
    is_fuel: false,
    ignition_temperature_k: 0.0,
    combustion_enthalpy: 0.0,
    color: rgb(120, 80, 40),
  },
  // Nitrogen
  MaterialProperties {
    name: "Nitrogen",
    phase: Phase::Gas,
    molar_mass: 0.028,
    molar_heat_capacity: 29.1,
    melting_point_k: 63.2,
    boiling_point_k: 77.4,
    enthalpy_fusion: 720.0,
    enthalpy_vaporization: 5560.0,
    thermal_conductivity: 0.026,
    viscosity: 0.1,
    is_oxidizer: false,
    is_fuel: false,
    ignition_temperature_k: 0.0,
    combustion_enthalpy: 0.0,
    color: rgb(180, 190, 210),
  },
  // Oxygen
  MaterialProperties {
    name: "Oxygen",
    phase: Phase::Gas,
    molar_mass: 0.032,
    molar_heat_capacity: 29.4,
    melting_point_k: 54.4,
    boiling_point_k: 90.2,
    enthalpy_fusion: 444.0,
    enthalpy_vaporization: 6820.0,
    thermal_conductivity: 0.027,
    viscosity: 0.1,
    is_oxidizer: true,
    is_fuel: false,
    ignition_temperature_k: 0.0,
    combustion_enthalpy: 0.0,
    color: rgb(160, 200, 255),
  },
  // CarbonDioxide
  MaterialProperties {
    name: "CarbonDioxide",
    phase: Phase::Gas,
    molar_mass: 0.044,
    molar_heat_capacity: 37.1,
    melting_point_k: 194.7,
    boiling_point_k: 194.7,
    enthalpy_fusion: 0.0,
    enthalpy_vaporization: 25_230.0,
    thermal_conductivity: 0.017,
    viscosity: 0.12,
    is_oxidizer: false,
    is_fuel: false,
    ignition_temperature_k: 0.0,
    combustion_enthalpy: 0.0,
    color: rgb(150, 150, 150),
  },
  // Steam
  MaterialProperties {
    name: "Steam",
    phase: Phase::Gas,
    molar_mass: 0.018,
    molar_heat_capacity: 37.5,
    melting_point_k: 273.15,
    boiling_point_k: 373.15,
    enthalpy_fusion: 6010.0,
    enthalpy_vaporization: 40_660.0,
    thermal_conductivity: 0.02,
    viscosity: 0.12,
    is_oxidizer: false,
    is_fuel: false,
    ignition_temperature_k: 0.0,
    combustion_enthalpy: 0.0,
    color: rgb(230, 230, 240),
  },
];

/// Zero-sized handle onto the static material table.
pub struct MaterialRegistry;

impl MaterialRegistry {
  /// Constant-time lookup of a material's physical properties.
  #[inline]
  pub fn get(id: MaterialId) -> &'static MaterialProperties {
    &REGISTRY[id.index()]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn registry_covers_every_material() {
    for id in MaterialId::ALL {
      let props = MaterialRegistry::get(id);
      assert!(props.molar_heat_capacity > 0.0, "{}", props.name);
      assert!(props.molar_mass > 0.0, "{}", props.name);
    }
  }

  #[test]
  fn index_round_trips() {
    for id in MaterialId::ALL {
      assert_eq!(MaterialId::from_index(id.index()), id);
    }
  }

  #[test]
  fn water_is_liquid_and_fuel_flags_are_coherent() {
    let water = MaterialRegistry::get(MaterialId::Water);
    assert_eq!(water.phase, Phase::Liquid);
    assert!(!water.is_fuel);
    assert!(!water.is_oxidizer);
  }
}
