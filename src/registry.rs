use std::collections::HashMap;

use crate::error::{DomainError, EcotopeResult};
use crate::scenario::Scenario;

// Field names with engine-level meaning. Any other registered field is
// transported and journaled but not coupled.
pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_HYDRATION: &str = "hydration";
pub const FIELD_VEGETATION: &str = "vegetation";
pub const FIELD_MOVEMENT_COST: &str = "movement_cost";

/// Per-field kernel coefficients, converted to the f32 domain the tensor
/// lives in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KernelCoeffs {
    pub diffusion: f32,
    pub velocity: (f32, f32),
    pub decay: f32,
    pub replenish: f32,
}

/// Field metadata derived from the scenario's ordered field list. A field's
/// position in this ordering is its stable `field_id`, the identifier the
/// delta journal stores. Building the registry is pure: identical scenarios
/// yield identical registries.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    names: Vec<String>,
    index: HashMap<String, usize>,
    bounds: Vec<(f32, f32)>,
    coeffs: Vec<KernelCoeffs>,
    derived: Vec<bool>,
}

impl FieldRegistry {
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let names: Vec<String> = scenario.fields.iter().map(|f| f.name.clone()).collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let bounds = scenario
            .fields
            .iter()
            .map(|f| (f.bounds.0 as f32, f.bounds.1 as f32))
            .collect();
        let coeffs = scenario
            .fields
            .iter()
            .map(|f| KernelCoeffs {
                diffusion: f.coeffs.diffusion as f32,
                velocity: (f.coeffs.advection.vx as f32, f.coeffs.advection.vy as f32),
                decay: f.coeffs.decay as f32,
                replenish: f.coeffs.replenish as f32,
            })
            .collect();
        let derived = scenario.fields.iter().map(|f| f.derived).collect();

        Self {
            names,
            index,
            bounds,
            coeffs,
            derived,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, field_id: usize) -> &str {
        &self.names[field_id]
    }

    /// Position lookup; `Err(DomainError::UnknownField)` for unregistered
    /// names.
    pub fn field_id(&self, name: &str) -> EcotopeResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DomainError::UnknownField(name.to_string()).into())
    }

    /// Position lookup that tolerates absence, for optional couplings.
    pub fn try_field_id(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn bounds(&self, field_id: usize) -> (f32, f32) {
        self.bounds[field_id]
    }

    pub fn coeffs(&self, field_id: usize) -> &KernelCoeffs {
        &self.coeffs[field_id]
    }

    pub fn is_derived(&self, field_id: usize) -> bool {
        self.derived[field_id]
    }

    /// Iterator over non-derived field ids, the set the journal records.
    pub fn journaled_fields(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|i| !self.derived[*i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips_names() {
        let registry = FieldRegistry::from_scenario(&Scenario::default_scenario());
        for (i, name) in registry.names().iter().enumerate() {
            assert_eq!(registry.field_id(name).unwrap(), i);
        }
    }

    #[test]
    fn positions_are_stable_across_rebuilds() {
        let scenario = Scenario::default_scenario();
        let a = FieldRegistry::from_scenario(&scenario);
        let b = FieldRegistry::from_scenario(&scenario);
        assert_eq!(a.names(), b.names());
        for name in a.names() {
            assert_eq!(a.field_id(name).unwrap(), b.field_id(name).unwrap());
        }
    }

    #[test]
    fn unknown_field_is_a_domain_error() {
        let registry = FieldRegistry::from_scenario(&Scenario::default_scenario());
        assert!(registry.field_id("plasma").is_err());
    }

    #[test]
    fn derived_fields_are_not_journaled() {
        let registry = FieldRegistry::from_scenario(&Scenario::default_scenario());
        let journaled: Vec<usize> = registry.journaled_fields().collect();
        assert_eq!(journaled, vec![0, 1, 2]);
        assert!(registry.is_derived(3));
    }
}
