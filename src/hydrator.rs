use std::path::Path;

use ndarray::{Array3, Axis};
use serde_json::Value;
use tracing::info;

use crate::engine::Manifest;
use crate::error::{ArtifactError, EcotopeResult, ReplayError};
use crate::initgen;
use crate::registry::FieldRegistry;
use crate::report::deltas::DeltaJournal;
use crate::report::io::RunDir;
use crate::scenario::Scenario;

/// Reconstructs the field tensor at any journaled tick.
///
/// Opening a run re-reads the frozen scenario, verifies its canonical hash
/// against the manifest, regenerates the initial tensor from the same
/// seeds, and loads the delta journal once. Each `hydrate` call then owns a
/// private tensor: initial state plus every delta with `tick <= t`, clamped
/// to field bounds at the end. Repeated calls are idempotent.
pub struct Hydrator {
    scenario: Scenario,
    registry: FieldRegistry,
    initial: Array3<f32>,
    journal: DeltaJournal,
}

impl Hydrator {
    pub fn open(run_dir: impl AsRef<Path>) -> EcotopeResult<Self> {
        let run = RunDir::new(run_dir.as_ref());
        let manifest = Manifest::read(&run.manifest_path())?;

        let contents = std::fs::read_to_string(run.scenario_path())
            .map_err(|_| ArtifactError::Missing(run.scenario_path().display().to_string()))?;
        let mut snapshot: Value =
            serde_json::from_str(&contents).map_err(ArtifactError::Json)?;
        if let Value::Object(map) = &mut snapshot {
            map.remove("_scenario_hash");
        }
        let scenario: Scenario =
            serde_json::from_value(snapshot).map_err(ArtifactError::Json)?;
        scenario.validate()?;

        let recomputed = scenario.canonical_hash()?;
        if recomputed != manifest.scenario_hash {
            return Err(ReplayError::ScenarioHashMismatch {
                manifest: manifest.scenario_hash,
                recomputed,
            }
            .into());
        }

        let registry = FieldRegistry::from_scenario(&scenario);
        let initial = initgen::generate(&scenario, &registry).tensor;
        let journal = DeltaJournal::from_parquet(run.deltas_path())?;
        info!(
            run_dir = %run.root().display(),
            records = journal.len(),
            "hydrator ready"
        );

        Ok(Self {
            scenario,
            registry,
            initial,
            journal,
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.initial.dim()
    }

    /// The tensor the engine held after processing tick `tick`.
    pub fn hydrate(&self, tick: u32) -> EcotopeResult<Array3<f32>> {
        let mut tensor = self.initial.clone();
        let (h, w, f) = tensor.dim();

        for (row, record) in self.journal.records().enumerate() {
            // The journal is tick-ordered, so the replay window is a prefix.
            if record.tick > tick as i32 {
                break;
            }
            let (x, y, field_id) = (
                record.x as usize,
                record.y as usize,
                record.field_id as usize,
            );
            if x >= w || y >= h || field_id >= f || record.x < 0 || record.y < 0 {
                return Err(ReplayError::MalformedDelta {
                    row,
                    msg: format!(
                        "({}, {}, field {}) outside tensor {h}x{w}x{f}",
                        record.x, record.y, record.field_id
                    ),
                }
                .into());
            }
            tensor[[y, x, field_id]] += record.delta;
        }

        for field_id in 0..self.registry.len() {
            let (lo, hi) = self.registry.bounds(field_id);
            tensor
                .index_axis_mut(Axis(2), field_id)
                .mapv_inplace(|v| v.clamp(lo, hi));
        }
        Ok(tensor)
    }
}
