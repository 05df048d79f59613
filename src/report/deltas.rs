use std::path::Path;

use polars::df;
use polars::prelude::DataFrame;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{ArtifactError, EcotopeResult, ReplayError};
use crate::report::io::{ReportName, ToDataFrame, read_parquet};

/// Columns of the sparse delta journal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum DeltaCol {
    Tick,
    X,
    Y,
    FieldId,
    Delta,
}

/// One journaled cell change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaRecord {
    pub tick: i32,
    pub x: i32,
    pub y: i32,
    pub field_id: i32,
    pub delta: f32,
}

/// Append-only sparse journal of per-cell field changes, ordered by tick
/// then row-major scan order within the tick.
#[derive(Debug, Clone, Default)]
pub struct DeltaJournal {
    ticks: Vec<i32>,
    xs: Vec<i32>,
    ys: Vec<i32>,
    field_ids: Vec<i32>,
    deltas: Vec<f32>,
}

impl DeltaJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: i32, x: i32, y: i32, field_id: i32, delta: f32) {
        self.ticks.push(tick);
        self.xs.push(x);
        self.ys.push(y);
        self.field_ids.push(field_id);
        self.deltas.push(delta);
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = DeltaRecord> + '_ {
        (0..self.len()).map(|i| DeltaRecord {
            tick: self.ticks[i],
            x: self.xs[i],
            y: self.ys[i],
            field_id: self.field_ids[i],
            delta: self.deltas[i],
        })
    }

    /// Rebuild the journal from a run directory's parquet artifact.
    pub fn from_parquet(path: impl AsRef<Path>) -> EcotopeResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReplayError::JournalMissing(path.display().to_string()).into());
        }
        let df = read_parquet(path)?;
        let ticks = i32_column(&df, DeltaCol::Tick.into())?;
        let xs = i32_column(&df, DeltaCol::X.into())?;
        let ys = i32_column(&df, DeltaCol::Y.into())?;
        let field_ids = i32_column(&df, DeltaCol::FieldId.into())?;
        let deltas = f32_column(&df, DeltaCol::Delta.into())?;

        Ok(Self {
            ticks,
            xs,
            ys,
            field_ids,
            deltas,
        })
    }
}

fn i32_column(df: &DataFrame, name: &str) -> EcotopeResult<Vec<i32>> {
    Ok(df
        .column(name)
        .map_err(|e| ArtifactError::DataFrame(e.to_string()))?
        .as_materialized_series()
        .i32()
        .map_err(|e| ArtifactError::DataFrame(e.to_string()))?
        .into_no_null_iter()
        .collect())
}

fn f32_column(df: &DataFrame, name: &str) -> EcotopeResult<Vec<f32>> {
    Ok(df
        .column(name)
        .map_err(|e| ArtifactError::DataFrame(e.to_string()))?
        .as_materialized_series()
        .f32()
        .map_err(|e| ArtifactError::DataFrame(e.to_string()))?
        .into_no_null_iter()
        .collect())
}

impl ToDataFrame for DeltaJournal {
    fn to_data_frame(&self) -> EcotopeResult<DataFrame> {
        df!(
            <&str>::from(DeltaCol::Tick) => &self.ticks,
            <&str>::from(DeltaCol::X) => &self.xs,
            <&str>::from(DeltaCol::Y) => &self.ys,
            <&str>::from(DeltaCol::FieldId) => &self.field_ids,
            <&str>::from(DeltaCol::Delta) => &self.deltas,
        )
        .map_err(|e| ArtifactError::DataFrame(e.to_string()).into())
    }
}

impl ReportName for DeltaJournal {
    fn base_name(&self) -> &'static str {
        "deltas"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::io::ToParquet;

    #[test]
    fn column_names_are_snake_case() {
        assert_eq!(DeltaCol::FieldId.to_string(), "field_id");
        assert_eq!(DeltaCol::Tick.to_string(), "tick");
    }

    #[test]
    fn parquet_round_trip_preserves_records() {
        let mut journal = DeltaJournal::new();
        journal.push(0, 3, 5, 1, 0.25);
        journal.push(1, 7, 2, 0, -0.125);
        journal.push(1, 7, 3, 2, 1.5);

        let dir = tempfile::tempdir().unwrap();
        let path = journal.to_parquet(dir.path()).unwrap();
        let reloaded = DeltaJournal::from_parquet(&path).unwrap();

        assert_eq!(reloaded.len(), 3);
        let records: Vec<DeltaRecord> = reloaded.records().collect();
        let originals: Vec<DeltaRecord> = journal.records().collect();
        assert_eq!(records, originals);
    }

    #[test]
    fn missing_journal_is_a_replay_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("grid").join("deltas.parquet");
        assert!(DeltaJournal::from_parquet(&missing).is_err());
    }
}
