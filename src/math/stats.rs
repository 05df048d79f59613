use ndarray::{Array2, ArrayView2};

/// Numerical guard used in every rescale denominator.
pub const EPS: f32 = 1e-8;

/// Linear-interpolation percentile over the flattened raster, matching the
/// convention `rank = pct/100 * (n-1)`.
pub fn percentile(values: &ArrayView2<f32>, pct: f64) -> f32 {
    let mut sorted: Vec<f32> = values.iter().copied().collect();
    sorted.sort_by(f32::total_cmp);
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Rescale to [0, 1] by min/max, with an epsilon-guarded denominator.
pub fn min_max_normalize(raster: &Array2<f32>) -> Array2<f32> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for v in raster.iter() {
        min = min.min(*v);
        max = max.max(*v);
    }
    let range = max - min + EPS;
    raster.mapv(|v| (v - min) / range)
}

pub fn mean(values: &ArrayView2<f32>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.iter().map(|v| *v as f64).sum::<f64>() / n as f64
}

/// Population variance.
pub fn variance(values: &ArrayView2<f32>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (*v as f64 - m).powi(2)).sum::<f64>() / n as f64
}

/// Moran-like spatial coherence: mean lag-1 cross-product against the four
/// torus neighbors, normalized by the raster variance.
pub fn spatial_coherence(values: &ArrayView2<f32>) -> f64 {
    let (h, w) = values.dim();
    if h == 0 || w == 0 {
        return 0.0;
    }
    let m = mean(values);
    let v = variance(values) + EPS as f64;
    let cells = (h * w) as f64;

    let mut acc = 0.0f64;
    for y in 0..h {
        let yn = (y + h - 1) % h;
        let yp = (y + 1) % h;
        for x in 0..w {
            let xn = (x + w - 1) % w;
            let xp = (x + 1) % w;
            let c = values[[y, x]] as f64 - m;
            acc += c
                * ((values[[y, xn]] as f64 - m)
                    + (values[[y, xp]] as f64 - m)
                    + (values[[yn, x]] as f64 - m)
                    + (values[[yp, x]] as f64 - m));
        }
    }
    // Two-stage normalization: per-cell average of the 4-neighbor products,
    // then by variance.
    (acc / (4.0 * cells)) / cells / v
}

/// Pearson correlation over two flattened rasters of identical shape.
pub fn pearson(a: &ArrayView2<f32>, b: &ArrayView2<f32>) -> f64 {
    debug_assert_eq!(a.dim(), b.dim());
    let n = a.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let ma = mean(a);
    let mb = mean(b);
    let mut cov = 0.0f64;
    let mut va = 0.0f64;
    let mut vb = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = *x as f64 - ma;
        let dy = *y as f64 - mb;
        cov += dx * dy;
        va += dx * dx;
        vb += dy * dy;
    }
    cov / (va.sqrt() * vb.sqrt() + EPS as f64)
}
