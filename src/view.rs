use std::collections::BTreeMap;
use std::path::Path;

use ndarray::{Array2, Array3, ArrayView2, Axis, s};

use crate::error::{DomainError, EcotopeResult};
use crate::hydrator::Hydrator;

/// Read-only accessor over a hydrated tensor, the surface the agent core
/// perceives through. `load_tick` selects the tick; every getter demands a
/// loaded tick first.
pub struct EnvironmentView {
    hydrator: Hydrator,
    tensor: Option<Array3<f32>>,
    current_tick: u32,
}

impl EnvironmentView {
    pub fn open(run_dir: impl AsRef<Path>) -> EcotopeResult<Self> {
        Ok(Self {
            hydrator: Hydrator::open(run_dir)?,
            tensor: None,
            current_tick: 0,
        })
    }

    pub fn load_tick(&mut self, tick: u32) -> EcotopeResult<()> {
        self.tensor = Some(self.hydrator.hydrate(tick)?);
        self.current_tick = tick;
        Ok(())
    }

    pub fn current_tick(&self) -> u32 {
        self.current_tick
    }

    pub fn width(&self) -> usize {
        self.hydrator.shape().1
    }

    pub fn height(&self) -> usize {
        self.hydrator.shape().0
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.hydrator.shape()
    }

    pub fn field_names(&self) -> &[String] {
        self.hydrator.registry().names()
    }

    fn tensor(&self) -> EcotopeResult<&Array3<f32>> {
        self.tensor
            .as_ref()
            .ok_or_else(|| DomainError::TickNotLoaded.into())
    }

    fn check_cell(&self, x: usize, y: usize) -> EcotopeResult<()> {
        let (h, w, _) = self.hydrator.shape();
        if x >= w || y >= h {
            return Err(DomainError::CellOutOfBounds {
                x,
                y,
                width: w,
                height: h,
            }
            .into());
        }
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> EcotopeResult<ArrayView2<'_, f32>> {
        let field_id = self.hydrator.registry().field_id(name)?;
        Ok(self.tensor()?.index_axis(Axis(2), field_id))
    }

    pub fn get_cell(&self, x: usize, y: usize, name: &str) -> EcotopeResult<f32> {
        self.check_cell(x, y)?;
        let field_id = self.hydrator.registry().field_id(name)?;
        Ok(self.tensor()?[[y, x, field_id]])
    }

    pub fn get_all_fields_at(&self, x: usize, y: usize) -> EcotopeResult<BTreeMap<String, f32>> {
        self.check_cell(x, y)?;
        let tensor = self.tensor()?;
        Ok(self
            .hydrator
            .registry()
            .names()
            .iter()
            .enumerate()
            .map(|(field_id, name)| (name.clone(), tensor[[y, x, field_id]]))
            .collect())
    }

    /// Rectangular slices around `(x, y)`, clipped at the grid edges.
    pub fn get_neighborhood(
        &self,
        x: usize,
        y: usize,
        radius: usize,
    ) -> EcotopeResult<BTreeMap<String, Array2<f32>>> {
        self.check_cell(x, y)?;
        let tensor = self.tensor()?;
        let (h, w, _) = tensor.dim();
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(h);
        let x0 = x.saturating_sub(radius);
        let x1 = (x + radius + 1).min(w);

        Ok(self
            .hydrator
            .registry()
            .names()
            .iter()
            .enumerate()
            .map(|(field_id, name)| {
                let window = tensor.slice(s![y0..y1, x0..x1, field_id]).to_owned();
                (name.clone(), window)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::scenario::Scenario;

    fn view(dir: &Path) -> EnvironmentView {
        let mut scenario = Scenario::default_scenario();
        scenario.world.width = 24;
        scenario.world.height = 24;
        let engine = Engine::new(scenario).unwrap();
        let run_dir = engine.run(3, dir, Some("view")).unwrap();
        EnvironmentView::open(run_dir).unwrap()
    }

    #[test]
    fn reads_before_load_tick_are_domain_errors() {
        let dir = tempfile::tempdir().unwrap();
        let v = view(dir.path());
        assert!(v.get_cell(0, 0, "temperature").is_err());
        assert!(v.get_all_fields_at(1, 1).is_err());
    }

    #[test]
    fn cell_and_neighborhood_access() {
        let dir = tempfile::tempdir().unwrap();
        let mut v = view(dir.path());
        v.load_tick(1).unwrap();

        let cell = v.get_cell(5, 7, "vegetation").unwrap();
        let fields = v.get_all_fields_at(5, 7).unwrap();
        assert_eq!(fields["vegetation"], cell);
        assert_eq!(fields.len(), 4);

        let hood = v.get_neighborhood(5, 7, 2).unwrap();
        assert_eq!(hood["vegetation"].dim(), (5, 5));
        assert_eq!(hood["vegetation"][[2, 2]], cell);

        // Edge windows clip instead of wrapping.
        let corner = v.get_neighborhood(0, 0, 2).unwrap();
        assert_eq!(corner["vegetation"].dim(), (3, 3));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut v = view(dir.path());
        v.load_tick(0).unwrap();
        assert!(v.get_cell(0, 0, "magma").is_err());
    }

    #[test]
    fn out_of_extent_cell_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut v = view(dir.path());
        v.load_tick(0).unwrap();
        assert!(v.get_cell(24, 0, "temperature").is_err());
    }
}
