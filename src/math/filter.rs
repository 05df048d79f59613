use ndarray::Array2;

/// Normalized Gaussian kernel truncated at four sigmas, radius
/// `(4σ + 0.5)`.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (4.0 * sigma + 0.5) as usize;
    let mut weights = Vec::with_capacity(2 * radius + 1);
    let denom = 2.0 * sigma * sigma;
    for i in -(radius as i64)..=(radius as i64) {
        let d = i as f32;
        weights.push((-d * d / denom).exp());
    }
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Separable Gaussian smoothing with toroidal (wrap) boundary handling.
pub fn gaussian_wrap(src: &Array2<f32>, sigma: f32) -> Array2<f32> {
    gaussian_wrap_anisotropic(src, sigma, sigma)
}

/// Gaussian smoothing with independent sigmas per axis. Both axes wrap.
pub fn gaussian_wrap_anisotropic(src: &Array2<f32>, sigma_y: f32, sigma_x: f32) -> Array2<f32> {
    let (h, w) = src.dim();
    let kx = gaussian_kernel(sigma_x);
    let ky = gaussian_kernel(sigma_y);
    let rx = kx.len() / 2;
    let ry = ky.len() / 2;

    // Horizontal pass.
    let mut mid = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in kx.iter().enumerate() {
                let sx = (x as i64 + k as i64 - rx as i64).rem_euclid(w as i64) as usize;
                acc += weight * src[[y, sx]];
            }
            mid[[y, x]] = acc;
        }
    }

    // Vertical pass.
    let mut out = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, weight) in ky.iter().enumerate() {
                let sy = (y as i64 + k as i64 - ry as i64).rem_euclid(h as i64) as usize;
                acc += weight * mid[[sy, x]];
            }
            out[[y, x]] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_normalized() {
        for sigma in [1.0f32, 3.0, 12.0] {
            let k = gaussian_kernel(sigma);
            let sum: f32 = k.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "sigma {sigma} sums to {sum}");
        }
    }

    #[test]
    fn smoothing_preserves_constant_field() {
        let src = Array2::from_elem((16, 16), 0.75f32);
        let out = gaussian_wrap(&src, 2.0);
        for v in out.iter() {
            assert!((v - 0.75).abs() < 1e-5);
        }
    }

    #[test]
    fn smoothing_reduces_variance() {
        let mut src = Array2::<f32>::zeros((32, 32));
        src[[16, 16]] = 1.0;
        let out = gaussian_wrap(&src, 2.0);
        let peak = out[[16, 16]];
        assert!(peak < 1.0 && peak > 0.0);
        // Mass is conserved under wrap convolution.
        let total: f32 = out.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }
}
