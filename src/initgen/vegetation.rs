use ndarray::Array2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::math::filter::gaussian_wrap;
use crate::math::stats::EPS;
use crate::scenario::VegetationProfile;

/// Initial vegetation: carrying capacity scaled by Monod water limitation
/// and a Gaussian thermal optimum, with a whisper of smoothed noise.
pub fn vegetation_seed(
    hydration: &Array2<f32>,
    temperature: &Array2<f32>,
    profile: &VegetationProfile,
    rng: &mut ChaCha8Rng,
) -> Array2<f32> {
    let capacity = profile.carrying_capacity as f32;
    let water_half = profile.water_half as f32;
    let optimum = profile.heat_optimum as f32;
    let sigma = profile.heat_sigma as f32;

    let (h, w) = hydration.dim();
    let mut noise = Array2::<f32>::zeros((h, w));
    for v in noise.iter_mut() {
        *v = rng.sample(StandardNormal);
    }
    let noise = gaussian_wrap(&noise, 2.0);

    Array2::from_shape_fn((h, w), |(y, x)| {
        let water = hydration[[y, x]];
        let heat = temperature[[y, x]];
        let water_factor = water / (water + water_half + EPS);
        let heat_factor = (-0.5 * ((heat - optimum) / (sigma + EPS)).powi(2)).exp();
        (capacity * water_factor * heat_factor + noise[[y, x]] * 0.01).clamp(0.0, 1.0)
    })
}
