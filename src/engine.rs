use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use ndarray::Axis;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ArtifactError, EcotopeResult, InvariantError};
use crate::initgen;
use crate::kernels::{self, DELTA_EPSILON};
use crate::math::stats::{mean, percentile, spatial_coherence, variance};
use crate::registry::FieldRegistry;
use crate::report::checksums::write_checksums;
use crate::report::deltas::DeltaJournal;
use crate::report::events::EventStream;
use crate::report::field_stats::FieldStats;
use crate::report::hydrology::HydrologyStats;
use crate::report::io::{RunDir, ToParquet};
use crate::report::structure::StructureStats;
use crate::scenario::{Scenario, SeedPartitions, WorldConfig, canonical_json};

pub const SCHEMA_VERSION: &str = "1.0";

/// A delta beyond this magnitude on a clamped field is a simulation bug.
const DELTA_MAGNITUDE_BOUND: f32 = 10.0;

// ================================================================================================
// Manifest
// ================================================================================================

/// Run-scoped metadata, written at start and rewritten with the runtime at
/// finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: String,
    pub scenario_hash: String,
    pub seed_partitions: SeedPartitions,
    pub created: u64,
    pub ticks: u32,
    pub world: WorldConfig,
    pub label: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_s: Option<f64>,
}

impl Manifest {
    pub fn write(&self, path: &Path) -> EcotopeResult<()> {
        let value = serde_json::to_value(self).map_err(ArtifactError::Json)?;
        std::fs::write(path, canonical_json(&value)?).map_err(ArtifactError::Io)?;
        Ok(())
    }

    pub fn read(path: &Path) -> EcotopeResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|_| ArtifactError::Missing(path.display().to_string()))?;
        serde_json::from_str(&contents).map_err(|e| ArtifactError::Json(e).into())
    }
}

// ================================================================================================
// Engine
// ================================================================================================

/// Owns one scenario and drives init -> tick loop -> artifact finalize.
/// Given the same scenario hash, the produced tensor trajectory and delta
/// stream are bit-identical regardless of host.
pub struct Engine {
    scenario: Scenario,
    registry: FieldRegistry,
    scenario_hash: String,
}

impl Engine {
    pub fn new(scenario: Scenario) -> EcotopeResult<Self> {
        scenario.validate()?;
        let scenario_hash = scenario.canonical_hash()?;
        let registry = FieldRegistry::from_scenario(&scenario);
        Ok(Self {
            scenario,
            registry,
            scenario_hash,
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn scenario_hash(&self) -> &str {
        &self.scenario_hash
    }

    /// Execute `ticks` steps, journaling sparse deltas and metrics into a
    /// fresh `run-<label>` directory under `out_dir`. Returns the run
    /// directory path.
    pub fn run(
        &self,
        ticks: u32,
        out_dir: &Path,
        label: Option<&str>,
    ) -> EcotopeResult<PathBuf> {
        let started = Instant::now();
        let run_label = label.map(str::to_string).unwrap_or_else(|| {
            chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string()
        });
        let run = RunDir::new(out_dir.join(format!("run-{run_label}")));
        run.create_layout()?;
        info!(label = %run_label, ticks, hash = %self.scenario_hash, "starting run");

        let initial = initgen::generate(&self.scenario, &self.registry);
        let mut tensor = initial.tensor;
        let aux = initial.aux;

        let mut manifest = Manifest {
            schema_version: SCHEMA_VERSION.to_string(),
            scenario_hash: self.scenario_hash.clone(),
            seed_partitions: self.scenario.randomness.partitions,
            created: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            ticks,
            world: self.scenario.world.clone(),
            label: run_label,
            runtime_s: None,
        };
        manifest.write(&run.manifest_path())?;
        self.write_scenario_snapshot(&run)?;

        let mut journal = DeltaJournal::new();
        let mut field_stats = FieldStats::new();
        let mut hydrology = HydrologyStats::new();
        let mut structure = StructureStats::new();
        let mut events = EventStream::create(run.events_path())?;

        let passes = self.scenario.dynamics.passes;
        let metrics_cadence = self.scenario.outputs.metrics_cadence;
        let river_percentile = self.scenario.water_profile.river_percentile;
        let river_cutoff = percentile(
            &aux.flow_accumulation.view(),
            100.0 * (1.0 - river_percentile),
        );
        let river_length = aux
            .flow_accumulation
            .iter()
            .filter(|a| **a >= river_cutoff)
            .count() as i64;
        let lake_area = aux.lake_mask.iter().filter(|m| **m).count() as i64;

        for t in 0..ticks {
            let next = kernels::step(&tensor, &self.scenario, &self.registry)?;

            for field_id in self.registry.journaled_fields() {
                let before = tensor.index_axis(Axis(2), field_id);
                let after = next.index_axis(Axis(2), field_id);
                for ((y, x), prev) in before.indexed_iter() {
                    let delta = after[[y, x]] - prev;
                    if delta.abs() > DELTA_EPSILON {
                        if delta.abs() > DELTA_MAGNITUDE_BOUND {
                            return Err(InvariantError::OversizedDelta {
                                field: self.registry.name(field_id).to_string(),
                                delta,
                            }
                            .into());
                        }
                        journal.push(t as i32, x as i32, y as i32, field_id as i32, delta);
                    }
                }
            }
            tensor = next;

            if passes.metrics && (t + 1) % metrics_cadence == 0 {
                for field_id in self.registry.journaled_fields() {
                    let slab = tensor.index_axis(Axis(2), field_id);
                    let name = self.registry.name(field_id);
                    field_stats.push(t as i32, name, mean(&slab), variance(&slab));
                    structure.push(t as i32, name, spatial_coherence(&slab));
                }
                hydrology.push(t as i32, river_length, lake_area, river_percentile);
            }

            events.append(t as i32, &self.field_means(&tensor))?;
            debug!(tick = t, deltas = journal.len(), "tick complete");
        }

        journal.to_parquet(run.grid_dir())?;
        field_stats.to_parquet(run.metrics_dir())?;
        hydrology.to_parquet(run.metrics_dir())?;
        structure.to_parquet(run.metrics_dir())?;
        events.finish()?;

        let artifacts = vec![
            run.manifest_path(),
            run.scenario_path(),
            run.deltas_path(),
            run.field_stats_path(),
            run.hydrology_path(),
            run.structure_path(),
            run.events_path(),
        ];
        write_checksums(&run, &artifacts)?;

        manifest.runtime_s = Some(started.elapsed().as_secs_f64());
        manifest.write(&run.manifest_path())?;
        info!(
            run_dir = %run.root().display(),
            deltas = journal.len(),
            runtime_s = manifest.runtime_s,
            "run complete"
        );
        Ok(run.root().to_path_buf())
    }

    /// Frozen configuration plus its own hash under `_scenario_hash`.
    fn write_scenario_snapshot(&self, run: &RunDir) -> EcotopeResult<()> {
        let mut value = serde_json::to_value(&self.scenario).map_err(ArtifactError::Json)?;
        if let Value::Object(map) = &mut value {
            map.insert(
                "_scenario_hash".to_string(),
                Value::String(self.scenario_hash.clone()),
            );
        }
        std::fs::write(run.scenario_path(), canonical_json(&value)?)
            .map_err(ArtifactError::Io)?;
        Ok(())
    }

    fn field_means(&self, tensor: &ndarray::Array3<f32>) -> BTreeMap<String, f64> {
        self.registry
            .journaled_fields()
            .map(|field_id| {
                let slab = tensor.index_axis(Axis(2), field_id);
                (self.registry.name(field_id).to_string(), mean(&slab))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_scenario() -> Scenario {
        let mut scenario = Scenario::default_scenario();
        scenario.world.width = 24;
        scenario.world.height = 24;
        scenario
    }

    #[test]
    fn run_produces_the_full_artifact_set() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(small_scenario()).unwrap();
        let run_dir = engine.run(4, dir.path(), Some("artifacts")).unwrap();
        let run = RunDir::new(&run_dir);

        assert!(run.manifest_path().exists());
        assert!(run.scenario_path().exists());
        assert!(run.deltas_path().exists());
        assert!(run.field_stats_path().exists());
        assert!(run.hydrology_path().exists());
        assert!(run.structure_path().exists());
        assert!(run.events_path().exists());
        assert!(run.checksums_dir().join("scenario.json.blake3").exists());

        let manifest = Manifest::read(&run.manifest_path()).unwrap();
        assert_eq!(manifest.ticks, 4);
        assert_eq!(manifest.schema_version, SCHEMA_VERSION);
        assert!(manifest.runtime_s.is_some());

        let events = std::fs::read_to_string(run.events_path()).unwrap();
        assert_eq!(events.lines().count(), 4);
    }

    #[test]
    fn identical_scenarios_produce_identical_journals() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(small_scenario()).unwrap();
        let a = engine.run(6, dir.path(), Some("a")).unwrap();
        let b = engine.run(6, dir.path(), Some("b")).unwrap();

        let ja = DeltaJournal::from_parquet(RunDir::new(&a).deltas_path()).unwrap();
        let jb = DeltaJournal::from_parquet(RunDir::new(&b).deltas_path()).unwrap();
        assert_eq!(ja.len(), jb.len());
        assert!(ja.records().zip(jb.records()).all(|(x, y)| x == y));
    }

    #[test]
    fn metrics_honor_the_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let mut scenario = small_scenario();
        scenario.outputs.metrics_cadence = 3;
        let engine = Engine::new(scenario).unwrap();
        let run_dir = engine.run(7, dir.path(), Some("cadence")).unwrap();

        let df = crate::report::io::read_parquet(RunDir::new(&run_dir).field_stats_path())
            .unwrap();
        // 7 ticks at cadence 3 -> metrics after ticks 2 and 5, 3 fields each.
        assert_eq!(df.height(), 6);
    }

    #[test]
    fn invalid_scenario_refuses_to_start() {
        let mut scenario = small_scenario();
        scenario.fields.clear();
        assert!(Engine::new(scenario).is_err());
    }
}
