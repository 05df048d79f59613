use ndarray::Array2;
use rand_chacha::ChaCha8Rng;

use crate::initgen::filtered_noise;
use crate::math::filter::gaussian_wrap_anisotropic;
use crate::math::stats::min_max_normalize;
use crate::scenario::WaterProfile;

/// Multi-octave elevation: Gaussian-filtered white noise bands with
/// geometric amplitude decay and halving scale, ridge-transformed and
/// re-smoothed.
pub fn elevation(
    height: usize,
    width: usize,
    profile: &WaterProfile,
    rng: &mut ChaCha8Rng,
) -> Array2<f32> {
    let octaves = profile.octaves;
    let base_scale = profile.elevation_scale as f32;
    let ridge_strength = profile.ridge_strength as f32;

    let mut elevation = Array2::<f32>::zeros((height, width));
    let mut amplitude = 1.0f32;
    for octave in 0..octaves {
        let scale = base_scale / 2f32.powi(octave as i32);
        let band = filtered_noise(height, width, scale, rng);
        elevation.zip_mut_with(&band, |e, b| *e += amplitude * b);
        amplitude *= 0.5;
    }
    let mut elevation = min_max_normalize(&elevation);

    // Ridge transform folds mid-range elevations into crests.
    elevation.mapv_inplace(|e| {
        let ridge = 1.0 - (2.0 * e - 1.0).abs();
        (1.0 - ridge_strength) * e + ridge_strength * ridge
    });

    let smooth_sigma = (base_scale / 6.0).max(1.0).floor();
    let smoothed = gaussian_wrap_anisotropic(&elevation, smooth_sigma, smooth_sigma);
    min_max_normalize(&smoothed)
}

/// Precipitation: smoothed noise blended 60/40 with an orographic term that
/// combines a lowland bonus with a west-to-east wind ramp on [0.2, 1].
pub fn precipitation(
    height: usize,
    width: usize,
    profile: &WaterProfile,
    rng: &mut ChaCha8Rng,
    elevation: &Array2<f32>,
) -> Array2<f32> {
    let noise = filtered_noise(height, width, profile.precipitation_scale as f32, rng);
    let noise = min_max_normalize(&noise);
    let elevation_norm = min_max_normalize(elevation);

    let mut rainfall = Array2::<f32>::zeros((height, width));
    let span = if width > 1 { (width - 1) as f32 } else { 1.0 };
    for ((y, x), out) in rainfall.indexed_iter_mut() {
        let wind = 0.2 + 0.8 * (x as f32 / span);
        let orographic = (1.0 - elevation_norm[[y, x]]) * 0.4 + wind * 0.6;
        *out = 0.6 * noise[[y, x]] + 0.4 * orographic;
    }
    min_max_normalize(&rainfall)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::scenario::Scenario;

    fn profile() -> WaterProfile {
        Scenario::default_scenario().water_profile
    }

    #[test]
    fn elevation_is_unit_normalized() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let e = elevation(32, 32, &profile(), &mut rng);
        let min = e.iter().copied().fold(f32::INFINITY, f32::min);
        let max = e.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(min >= 0.0 && min < 1e-3);
        assert!(max <= 1.0 && max > 0.99);
    }

    #[test]
    fn precipitation_increases_downwind() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let e = Array2::from_elem((32, 64), 0.5f32);
        let p = precipitation(32, 64, &profile(), &mut rng, &e);
        let west: f32 = p.slice(ndarray::s![.., 0..8]).iter().sum();
        let east: f32 = p.slice(ndarray::s![.., 56..64]).iter().sum();
        assert!(east > west, "wind ramp should wet the east edge");
    }
}
