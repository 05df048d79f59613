use std::path::Path;

use blake2::{Blake2b, Digest, digest::consts::U16};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::{ArtifactError, ConfigError, EcotopeResult};

/// blake2b with a 128-bit digest, the scenario fingerprint function.
type Blake2b128 = Blake2b<U16>;

// ================================================================================================
// World
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapFlags {
    pub x: bool,
    pub y: bool,
}

impl Default for WrapFlags {
    fn default() -> Self {
        Self { x: true, y: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Topology marker; only rectangular grids are supported.
    #[serde(rename = "type", default = "default_world_type")]
    pub kind: String,

    pub width: usize,
    pub height: usize,

    #[serde(default)]
    pub wrap: WrapFlags,

    #[serde(default = "default_ticks_per_day")]
    pub ticks_per_day: u32,
}

fn default_world_type() -> String {
    "grid".to_string()
}

fn default_ticks_per_day() -> u32 {
    1440
}

// ================================================================================================
// Randomness
// ================================================================================================

/// Offsets added to the base seed to derive the independent RNG streams.
/// Every stage of initial generation owns exactly one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPartitions {
    pub terrain_elevation: u64,
    pub precipitation: u64,
    pub river_routing: u64,
    pub vegetation_seed: u64,
    pub kernel_noise: u64,
}

impl Default for SeedPartitions {
    fn default() -> Self {
        Self {
            terrain_elevation: 1,
            precipitation: 2,
            river_routing: 3,
            vegetation_seed: 4,
            kernel_noise: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomnessConfig {
    pub seed: u64,

    #[serde(default)]
    pub partitions: SeedPartitions,
}

// ================================================================================================
// Fields
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Advection {
    #[serde(default)]
    pub vx: f64,

    #[serde(default)]
    pub vy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldCoeffs {
    #[serde(default)]
    pub diffusion: f64,

    #[serde(default)]
    pub advection: Advection,

    #[serde(default)]
    pub decay: f64,

    #[serde(default)]
    pub replenish: f64,
}

/// One registered field. Its position in `Scenario::fields` is the stable
/// `field_id` used by the delta journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    /// `[lo, hi]`; every pass clamps the field into this interval.
    pub bounds: (f64, f64),

    #[serde(default)]
    pub coeffs: FieldCoeffs,

    /// Derived fields are recomputed each tick from other fields and are
    /// never journaled.
    #[serde(default)]
    pub derived: bool,
}

// ================================================================================================
// Dynamics / outputs
// ================================================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Boundary {
    #[default]
    Wrap,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassToggles {
    #[serde(default = "enabled")]
    pub diffusion: bool,
    #[serde(default = "enabled")]
    pub advection: bool,
    #[serde(default = "enabled")]
    pub coupling: bool,
    #[serde(default = "enabled")]
    pub decay: bool,
    #[serde(default = "enabled")]
    pub replenishment: bool,
    #[serde(default = "enabled")]
    pub derived: bool,
    #[serde(default = "enabled")]
    pub metrics: bool,
}

fn enabled() -> bool {
    true
}

impl Default for PassToggles {
    fn default() -> Self {
        Self {
            diffusion: true,
            advection: true,
            coupling: true,
            decay: true,
            replenishment: true,
            derived: true,
            metrics: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DynamicsConfig {
    #[serde(default)]
    pub boundary: Boundary,

    #[serde(default)]
    pub passes: PassToggles,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_cadence")]
    pub metrics_cadence: u32,

    #[serde(default = "default_cadence")]
    pub deltas_cadence: u32,

    #[serde(default)]
    pub snapshots_cadence: u32,
}

fn default_cadence() -> u32 {
    1
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metrics_cadence: 1,
            deltas_cadence: 1,
            snapshots_cadence: 0,
        }
    }
}

// ================================================================================================
// Domain profiles
// ================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatProfile {
    #[serde(default = "default_heat_direction")]
    pub direction: String,

    pub amplitude: f64,

    #[serde(default = "default_noise_amp")]
    pub noise_amp: f64,
}

fn default_heat_direction() -> String {
    "north_hot".to_string()
}

fn default_noise_amp() -> f64 {
    0.05
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterProfile {
    pub elevation_scale: f64,
    pub octaves: u32,
    pub ridge_strength: f64,
    pub precipitation_scale: f64,
    pub lake_fill_threshold: f64,
    pub river_percentile: f64,
    pub river_incision: f64,
    pub river_decay_radius: f64,

    #[serde(default = "default_base_moisture")]
    pub base_moisture: f64,

    #[serde(default = "default_river_depth")]
    pub river_depth: f64,

    #[serde(default = "default_lake_depth")]
    pub lake_depth: f64,
}

fn default_base_moisture() -> f64 {
    0.3
}

fn default_river_depth() -> f64 {
    0.9
}

fn default_lake_depth() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VegetationProfile {
    pub k: f64,
    pub water_half: f64,
    pub heat_optimum: f64,
    pub heat_sigma: f64,
    pub carrying_capacity: f64,
}

// ================================================================================================
// Scenario
// ================================================================================================

/// Validated simulation configuration. Identical scenarios hash to the same
/// canonical fingerprint on every platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub world: WorldConfig,
    pub randomness: RandomnessConfig,
    pub fields: Vec<FieldSpec>,

    #[serde(default)]
    pub dynamics: DynamicsConfig,

    #[serde(default)]
    pub outputs: OutputConfig,

    pub heat_profile: HeatProfile,
    pub water_profile: WaterProfile,
    pub vegetation_profile: VegetationProfile,
}

impl Scenario {
    /// The stock four-field scenario: temperature, hydration, vegetation,
    /// and the derived movement-cost surface on a 256x256 torus.
    pub fn default_scenario() -> Self {
        let field = |name: &str, diffusion: f64, derived: bool| FieldSpec {
            name: name.to_string(),
            bounds: (0.0, 1.0),
            coeffs: FieldCoeffs {
                diffusion,
                ..Default::default()
            },
            derived,
        };

        Self {
            world: WorldConfig {
                kind: "grid".to_string(),
                width: 256,
                height: 256,
                wrap: WrapFlags::default(),
                ticks_per_day: 1440,
            },
            randomness: RandomnessConfig {
                seed: 1337,
                partitions: SeedPartitions::default(),
            },
            fields: vec![
                field("temperature", 0.18, false),
                field("hydration", 0.12, false),
                field("vegetation", 0.05, false),
                field("movement_cost", 0.0, true),
            ],
            dynamics: DynamicsConfig::default(),
            outputs: OutputConfig::default(),
            heat_profile: HeatProfile {
                direction: "north_hot".to_string(),
                amplitude: 0.6,
                noise_amp: 0.05,
            },
            water_profile: WaterProfile {
                elevation_scale: 96.0,
                octaves: 4,
                ridge_strength: 0.4,
                precipitation_scale: 128.0,
                lake_fill_threshold: 0.15,
                river_percentile: 0.92,
                river_incision: 0.02,
                river_decay_radius: 6.0,
                base_moisture: 0.3,
                river_depth: 0.9,
                lake_depth: 1.0,
            },
            vegetation_profile: VegetationProfile {
                k: 0.08,
                water_half: 0.35,
                heat_optimum: 0.65,
                heat_sigma: 0.18,
                carrying_capacity: 1.0,
            },
        }
    }

    pub fn from_yaml_str(yaml: &str) -> EcotopeResult<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml).map_err(ConfigError::Yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> EcotopeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> EcotopeResult<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Yaml(e).into())
    }

    pub fn validate(&self) -> EcotopeResult<()> {
        if self.world.width == 0 || self.world.height == 0 {
            return Err(ConfigError::InvalidWorld {
                width: self.world.width,
                height: self.world.height,
                msg: "extent must be positive".to_string(),
            }
            .into());
        }
        if self.world.kind != "grid" {
            return Err(ConfigError::InvalidWorld {
                width: self.world.width,
                height: self.world.height,
                msg: format!("unsupported world type '{}'", self.world.kind),
            }
            .into());
        }
        if self.fields.is_empty() {
            return Err(ConfigError::NoFields.into());
        }
        let mut seen = std::collections::BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateField(field.name.clone()).into());
            }
            let (lo, hi) = field.bounds;
            if !(lo < hi) || !lo.is_finite() || !hi.is_finite() {
                return Err(ConfigError::InvalidBounds {
                    field: field.name.clone(),
                    lo: lo as f32,
                    hi: hi as f32,
                }
                .into());
            }
        }
        if self.outputs.metrics_cadence == 0 {
            return Err(ConfigError::OutOfRange {
                key: "outputs.metrics_cadence".to_string(),
                msg: "cadence must be >= 1".to_string(),
            }
            .into());
        }
        if self.outputs.deltas_cadence == 0 {
            return Err(ConfigError::OutOfRange {
                key: "outputs.deltas_cadence".to_string(),
                msg: "cadence must be >= 1".to_string(),
            }
            .into());
        }
        for (key, value) in [
            ("water_profile.lake_fill_threshold", self.water_profile.lake_fill_threshold),
            ("water_profile.river_percentile", self.water_profile.river_percentile),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    key: key.to_string(),
                    msg: format!("{value} not in [0, 1]"),
                }
                .into());
            }
        }
        if self.water_profile.octaves == 0 {
            return Err(ConfigError::OutOfRange {
                key: "water_profile.octaves".to_string(),
                msg: "at least one octave required".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Canonical fingerprint: blake2b-128 over the sorted-key compact JSON
    /// serialization of the configuration.
    pub fn canonical_hash(&self) -> EcotopeResult<String> {
        let json = self.canonical_json()?;
        let mut hasher = Blake2b128::new();
        hasher.update(json.as_bytes());
        Ok(hex_string(hasher.finalize().as_slice()))
    }

    pub fn canonical_json(&self) -> EcotopeResult<String> {
        let value = serde_json::to_value(self).map_err(ArtifactError::Json)?;
        canonical_json(&value)
    }
}

// ================================================================================================
// Canonical JSON
// ================================================================================================

/// Compact JSON with recursively sorted object keys. The serialization that
/// both the scenario hash and the persisted manifest/scenario files use.
pub fn canonical_json(value: &Value) -> EcotopeResult<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> EcotopeResult<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).map_err(ArtifactError::Json)?);
                out.push(':');
                write_canonical(&map[*key], out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar).map_err(ArtifactError::Json)?),
    }
    Ok(())
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
