use polars::df;
use polars::prelude::DataFrame;
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{ArtifactError, EcotopeResult};
use crate::report::io::{ReportName, ToDataFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FieldStatsCol {
    Tick,
    Field,
    Mean,
    Var,
}

/// Per-tick mean and variance of every non-derived field, collected on the
/// metrics cadence.
#[derive(Debug, Clone, Default)]
pub struct FieldStats {
    ticks: Vec<i32>,
    fields: Vec<String>,
    means: Vec<f64>,
    vars: Vec<f64>,
}

impl FieldStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: i32, field: &str, mean: f64, var: f64) {
        self.ticks.push(tick);
        self.fields.push(field.to_string());
        self.means.push(mean);
        self.vars.push(var);
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl ToDataFrame for FieldStats {
    fn to_data_frame(&self) -> EcotopeResult<DataFrame> {
        df!(
            <&str>::from(FieldStatsCol::Tick) => &self.ticks,
            <&str>::from(FieldStatsCol::Field) => &self.fields,
            <&str>::from(FieldStatsCol::Mean) => &self.means,
            <&str>::from(FieldStatsCol::Var) => &self.vars,
        )
        .map_err(|e| ArtifactError::DataFrame(e.to_string()).into())
    }
}

impl ReportName for FieldStats {
    fn base_name(&self) -> &'static str {
        "field_stats"
    }
}
