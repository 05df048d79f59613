use polars::df;
use polars::prelude::DataFrame;
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{ArtifactError, EcotopeResult};
use crate::report::io::{ReportName, ToDataFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StructureCol {
    Tick,
    Field,
    MoranLike,
}

/// Spatial-coherence statistic per field on the metrics cadence.
#[derive(Debug, Clone, Default)]
pub struct StructureStats {
    ticks: Vec<i32>,
    fields: Vec<String>,
    moran_likes: Vec<f64>,
}

impl StructureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: i32, field: &str, moran_like: f64) {
        self.ticks.push(tick);
        self.fields.push(field.to_string());
        self.moran_likes.push(moran_like);
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl ToDataFrame for StructureStats {
    fn to_data_frame(&self) -> EcotopeResult<DataFrame> {
        df!(
            <&str>::from(StructureCol::Tick) => &self.ticks,
            <&str>::from(StructureCol::Field) => &self.fields,
            <&str>::from(StructureCol::MoranLike) => &self.moran_likes,
        )
        .map_err(|e| ArtifactError::DataFrame(e.to_string()).into())
    }
}

impl ReportName for StructureStats {
    fn base_name(&self) -> &'static str {
        "structure"
    }
}
