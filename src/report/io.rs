use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::{DataFrame, ParquetReader, ParquetWriter, SerReader};

use crate::error::{ArtifactError, EcotopeResult};

// ================================================================================================
// Traits
// ================================================================================================

/// A table that can materialize itself as a polars DataFrame.
pub trait ToDataFrame {
    fn to_data_frame(&self) -> EcotopeResult<DataFrame>;
}

pub trait ReportName {
    fn base_name(&self) -> &'static str;

    fn filename(&self) -> String {
        format!("{}.parquet", self.base_name())
    }
}

pub trait ToParquet {
    /// Writes the table into `dir` (created if missing) under its canonical
    /// file name. Returns the written path.
    fn to_parquet(&self, dir: impl AsRef<Path>) -> EcotopeResult<PathBuf>;
}

impl<T> ToParquet for T
where
    T: ToDataFrame + ReportName,
{
    fn to_parquet(&self, dir: impl AsRef<Path>) -> EcotopeResult<PathBuf> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                ArtifactError::RunDir(format!(
                    "Failed to create directory {}: {e}",
                    dir.display()
                ))
            })?;
        }
        let path = dir.join(self.filename());
        let mut df = self.to_data_frame()?;
        let file = File::create(&path).map_err(ArtifactError::Io)?;
        ParquetWriter::new(file)
            .finish(&mut df)
            .map_err(|e| ArtifactError::DataFrame(format!("Failed to write parquet: {e}")))?;
        Ok(path)
    }
}

pub fn read_parquet(path: impl AsRef<Path>) -> EcotopeResult<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|_| ArtifactError::Missing(path.display().to_string()))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| ArtifactError::DataFrame(format!("Failed to read parquet: {e}")).into())
}

// ================================================================================================
// Run directory layout
// ================================================================================================

/// The persistent artifact set of one run. One engine owns a run directory;
/// concurrent writers are disallowed.
#[derive(Debug, Clone)]
pub struct RunDir {
    root: PathBuf,
}

impl RunDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory skeleton (grid/, metrics/, streams/).
    pub fn create_layout(&self) -> EcotopeResult<()> {
        for dir in [
            self.root.clone(),
            self.grid_dir(),
            self.metrics_dir(),
            self.streams_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| {
                ArtifactError::RunDir(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn scenario_path(&self) -> PathBuf {
        self.root.join("scenario.json")
    }

    pub fn grid_dir(&self) -> PathBuf {
        self.root.join("grid")
    }

    pub fn deltas_path(&self) -> PathBuf {
        self.grid_dir().join("deltas.parquet")
    }

    pub fn metrics_dir(&self) -> PathBuf {
        self.root.join("metrics")
    }

    pub fn field_stats_path(&self) -> PathBuf {
        self.metrics_dir().join("field_stats.parquet")
    }

    pub fn hydrology_path(&self) -> PathBuf {
        self.metrics_dir().join("hydrology.parquet")
    }

    pub fn structure_path(&self) -> PathBuf {
        self.metrics_dir().join("structure.parquet")
    }

    pub fn streams_dir(&self) -> PathBuf {
        self.root.join("streams")
    }

    pub fn events_path(&self) -> PathBuf {
        self.streams_dir().join("events.ndjson")
    }

    pub fn checksums_dir(&self) -> PathBuf {
        self.root.join("checksums")
    }
}
