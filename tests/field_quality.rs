//! Quality of the generated fields at tick 0, pinned to the stock
//! 256x256 scenario with seed 1337.

use ecotope::initgen;
use ecotope::math::stats::{mean, pearson};
use ecotope::registry::{
    FIELD_HYDRATION, FIELD_TEMPERATURE, FIELD_VEGETATION, FieldRegistry,
};
use ecotope::scenario::Scenario;
use ndarray::{Axis, s};

fn initial_tensor() -> (Scenario, FieldRegistry, ndarray::Array3<f32>) {
    let scenario = Scenario::default_scenario();
    let registry = FieldRegistry::from_scenario(&scenario);
    let tensor = initgen::generate(&scenario, &registry).tensor;
    (scenario, registry, tensor)
}

#[test]
fn temperature_is_meridional() {
    let (_, registry, tensor) = initial_tensor();
    let temperature_id = registry.field_id(FIELD_TEMPERATURE).unwrap();
    let temperature = tensor.index_axis(Axis(2), temperature_id);

    let equator_band = temperature.slice(s![118..138, ..]);
    let north_band = temperature.slice(s![0..20, ..]);
    let south_band = temperature.slice(s![236..256, ..]);

    assert!(
        mean(&equator_band) > mean(&north_band),
        "equator should be warmer than the northern edge"
    );
    assert!(
        (mean(&north_band) - mean(&south_band)).abs() < 0.1,
        "poles should be symmetric"
    );
}

#[test]
fn hydration_majority_is_high() {
    let (_, registry, tensor) = initial_tensor();
    let hydration_id = registry.field_id(FIELD_HYDRATION).unwrap();
    let hydration = tensor.index_axis(Axis(2), hydration_id);

    let wet = hydration.iter().filter(|v| **v > 0.8).count();
    let fraction = wet as f64 / hydration.len() as f64;
    assert!(fraction > 0.5, "wet fraction {fraction} too low");
    assert!(mean(&hydration) > 0.5);
}

#[test]
fn vegetation_tracks_temperature() {
    let (_, registry, tensor) = initial_tensor();
    let temperature = tensor.index_axis(Axis(2), registry.field_id(FIELD_TEMPERATURE).unwrap());
    let vegetation = tensor.index_axis(Axis(2), registry.field_id(FIELD_VEGETATION).unwrap());
    let correlation = pearson(&temperature, &vegetation);
    assert!(
        correlation > 0.3,
        "temperature-vegetation correlation {correlation} too weak"
    );
}

#[test]
fn initial_tensor_is_clean() {
    let (_, registry, tensor) = initial_tensor();
    for field_id in 0..registry.len() {
        let (lo, hi) = registry.bounds(field_id);
        for value in tensor.index_axis(Axis(2), field_id).iter() {
            assert!(value.is_finite());
            assert!(*value >= lo && *value <= hi);
        }
    }
}
