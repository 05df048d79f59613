use polars::df;
use polars::prelude::DataFrame;
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{ArtifactError, EcotopeResult};
use crate::report::io::{ReportName, ToDataFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum HydrologyCol {
    Tick,
    RiverLength,
    LakeArea,
    FlowThresholds,
}

/// Hydrology aggregates per metrics tick: river cell count, lake cell
/// count, and the river percentile threshold in force.
#[derive(Debug, Clone, Default)]
pub struct HydrologyStats {
    ticks: Vec<i32>,
    river_lengths: Vec<i64>,
    lake_areas: Vec<i64>,
    flow_thresholds: Vec<f64>,
}

impl HydrologyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: i32, river_length: i64, lake_area: i64, flow_threshold: f64) {
        self.ticks.push(tick);
        self.river_lengths.push(river_length);
        self.lake_areas.push(lake_area);
        self.flow_thresholds.push(flow_threshold);
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl ToDataFrame for HydrologyStats {
    fn to_data_frame(&self) -> EcotopeResult<DataFrame> {
        df!(
            <&str>::from(HydrologyCol::Tick) => &self.ticks,
            <&str>::from(HydrologyCol::RiverLength) => &self.river_lengths,
            <&str>::from(HydrologyCol::LakeArea) => &self.lake_areas,
            <&str>::from(HydrologyCol::FlowThresholds) => &self.flow_thresholds,
        )
        .map_err(|e| ArtifactError::DataFrame(e.to_string()).into())
    }
}

impl ReportName for HydrologyStats {
    fn base_name(&self) -> &'static str {
        "hydrology"
    }
}
