use ndarray::Array2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::math::filter::gaussian_wrap;
use crate::scenario::HeatProfile;

/// Meridional temperature: a y-axis equator-to-pole profile broadcast
/// across x, plus smoothed noise of amplitude `noise_amp`, clamped to
/// [0, 1].
pub fn temperature_meridional(
    height: usize,
    width: usize,
    profile: &HeatProfile,
    rng: &mut ChaCha8Rng,
) -> Array2<f32> {
    let amplitude = profile.amplitude as f32;
    let noise_amp = profile.noise_amp as f32;

    let span = if height > 1 { (height - 1) as f32 } else { 1.0 };
    let profile_row: Vec<f32> = (0..height)
        .map(|y| {
            let latitude = y as f32 / span;
            let distance_from_equator = (latitude - 0.5).abs() * 2.0;
            let base = 1.0 - distance_from_equator;
            0.5 + amplitude * (base - 0.5)
        })
        .collect();

    let mut noise = Array2::<f32>::zeros((height, width));
    for v in noise.iter_mut() {
        *v = rng.sample(StandardNormal);
    }
    let noise = gaussian_wrap(&noise, 4.0);

    Array2::from_shape_fn((height, width), |(y, x)| {
        (profile_row[y] + noise[[y, x]] * noise_amp).clamp(0.0, 1.0)
    })
}
