//! Per-subsystem tunables, mirroring the teacher's small `Clone + Debug`
//! config structs with a `Default` impl for each tunable group.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ambient temperature used for newly created matter (terrain fill,
/// `add_water_at`) absent any other signal. Kelvin.
pub const AMBIENT_TEMPERATURE_K: f64 = 293.0;

/// Fixed sub-step duration the stepper advances by on each pipeline pass.
pub const DEFAULT_SUB_STEP_SECONDS: f64 = 1.0 / 60.0;

/// Tunables for the intra-/inter-cell heat subsystem.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeatConfig {
  /// Base inter-cell conduction rate per sub-step, before any
  /// material-conductivity weighting.
  pub base_conduction_rate: f64,
  /// Multiplier applied to `base_conduction_rate` when both cells'
  /// temperatures are far from each other (hot/cold pair boost).
  pub hot_cold_boost: f64,
  /// Temperature delta, in Kelvin, above which `hot_cold_boost` applies.
  pub hot_cold_threshold_k: f64,
  /// A single conduction step may move at most this fraction of the
  /// donor's thermal energy.
  pub max_donor_fraction: f64,
  /// Whether the optional radiation-to-ambient term runs.
  pub radiation_enabled: bool,
  /// Radiation rate per sub-step, applied to `(T - ambient)`.
  pub radiation_rate: f64,
  /// A radiation step may move at most this fraction of the cell's
  /// thermal energy.
  pub max_radiation_fraction: f64,
}

impl Default for HeatConfig {
  fn default() -> Self {
    Self {
      base_conduction_rate: 0.05,
      hot_cold_boost: 2.0,
      hot_cold_threshold_k: 100.0,
      max_donor_fraction: 0.05,
      radiation_enabled: false,
      radiation_rate: 0.01,
      max_radiation_fraction: 0.01,
    }
  }
}

/// Tunables for the liquid flow subsystem.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlowConfig {
  /// Fraction of a liquid cell's moles that fall to an open cell below,
  /// per sub-step.
  pub fall_fraction: f64,
  /// Fraction of the level difference with a lateral neighbor (divided
  /// four ways across the neighbors actually receiving) that spreads
  /// per sub-step.
  pub spread_fraction: f64,
  /// A cell receiving liquid by gravity stops accepting more once its
  /// total liquid moles reach this cap.
  pub liquid_capacity_moles: f64,
}

impl Default for FlowConfig {
  fn default() -> Self {
    Self {
      fall_fraction: 0.2,
      spread_fraction: 0.4,
      liquid_capacity_moles: 20.0,
    }
  }
}

/// Tunables for the gas diffusion subsystem.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GasConfig {
  /// Fraction of the moles difference with each neighbor that diffuses
  /// per sub-step.
  pub diffusion_fraction: f64,
  /// Additional upward-biased fraction proportional to
  /// `(T - ambient) / hot_bias_reference_k`, capped at `max_upward_bias`.
  pub upward_bias_per_kelvin: f64,
  pub max_upward_bias: f64,
}

impl Default for GasConfig {
  fn default() -> Self {
    Self {
      diffusion_fraction: 0.1,
      upward_bias_per_kelvin: 0.0005,
      max_upward_bias: 0.3,
    }
  }
}

/// Tunables for the (optional, disabled-by-default) combustion subsystem.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CombustionConfig {
  pub enabled: bool,
  /// Fraction of the limiting reactant's moles consumed per sub-step
  /// once ignition conditions hold.
  pub burn_rate: f64,
}

impl Default for CombustionConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      burn_rate: 0.1,
    }
  }
}

/// Flags selecting which pipeline subsystems a stepper invocation runs.
/// Plain `u8` bit constants rather than an external bitflags dependency,
/// following the teacher's preference for small hand-rolled flag sets.
pub mod sim_flags {
  pub type SimFlags = u8;

  pub const HEAT: SimFlags = 1 << 0;
  pub const FLOW: SimFlags = 1 << 1;
  pub const GAS: SimFlags = 1 << 2;
  pub const COMBUSTION: SimFlags = 1 << 3;

  pub const ALL: SimFlags = HEAT | FLOW | GAS | COMBUSTION;
  pub const NONE: SimFlags = 0;

  #[inline]
  pub const fn contains(flags: SimFlags, bit: SimFlags) -> bool {
    flags & bit != 0
  }
}

/// Number of consecutive quiescent ticks before an active chunk is
/// demoted to stable (and later, dormant).
pub const DEFAULT_STABLE_FRAME_THRESHOLD: u32 = 60;

/// Top-level tunables for a [`crate::world::World`], bundling the
/// per-subsystem configs.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig {
  pub heat: HeatConfig,
  pub flow: FlowConfig,
  pub gas: GasConfig,
  pub combustion: CombustionConfig,
  pub sub_step_seconds: f64,
  pub stable_frame_threshold: u32,
  pub ambient_temperature_k: f64,
}

impl Default for WorldConfig {
  fn default() -> Self {
    Self {
      heat: HeatConfig::default(),
      flow: FlowConfig::default(),
      gas: GasConfig::default(),
      combustion: CombustionConfig::default(),
      sub_step_seconds: DEFAULT_SUB_STEP_SECONDS,
      stable_frame_threshold: DEFAULT_STABLE_FRAME_THRESHOLD,
      ambient_temperature_k: AMBIENT_TEMPERATURE_K,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_physically_sane() {
    let cfg = WorldConfig::default();
    assert!(cfg.flow.fall_fraction > 0.0 && cfg.flow.fall_fraction < 1.0);
    assert!(cfg.heat.max_donor_fraction < 1.0);
    assert!(!cfg.combustion.enabled);
  }

  #[test]
  fn sim_flags_compose() {
    use sim_flags::*;
    let flags = HEAT | GAS;
    assert!(contains(flags, HEAT));
    assert!(!contains(flags, FLOW));
    assert!(contains(ALL, COMBUSTION));
    assert!(!contains(NONE, HEAT));
  }
}
