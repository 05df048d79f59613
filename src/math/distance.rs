use ndarray::Array2;

/// Stand-in for infinity that survives squared-distance arithmetic
/// without producing NaN during the parabola intersection step.
const FAR: f32 = 1e20;

/// Exact Euclidean distance transform: for every cell, the distance to the
/// nearest `true` cell in `mask`. Two-pass lower-envelope-of-parabolas
/// method, applied along columns and then rows. Non-wrapping.
pub fn euclidean_distance(mask: &Array2<bool>) -> Array2<f32> {
    let (h, w) = mask.dim();
    let mut sq = Array2::<f32>::from_shape_fn((h, w), |(y, x)| {
        if mask[[y, x]] { 0.0 } else { FAR }
    });

    let mut column = vec![0.0f32; h.max(w)];
    let mut transformed = vec![0.0f32; h.max(w)];

    for x in 0..w {
        for y in 0..h {
            column[y] = sq[[y, x]];
        }
        transform_1d(&column[..h], &mut transformed[..h]);
        for y in 0..h {
            sq[[y, x]] = transformed[y];
        }
    }

    for y in 0..h {
        for x in 0..w {
            column[x] = sq[[y, x]];
        }
        transform_1d(&column[..w], &mut transformed[..w]);
        for x in 0..w {
            sq[[y, x]] = transformed[x].min(FAR);
        }
    }

    sq.mapv_into(f32::sqrt)
}

/// One-dimensional squared distance transform of a sampled function `f`.
fn transform_1d(f: &[f32], d: &mut [f32]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    // v: parabola apex positions, z: boundaries between parabola regions.
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f32; n + 1];
    let mut k = 0usize;
    v[0] = 0;
    z[0] = f32::NEG_INFINITY;
    z[1] = f32::INFINITY;

    for q in 1..n {
        // z[0] = -inf guarantees the walk terminates before k underflows.
        loop {
            let p = v[k];
            let s = ((f[q] + (q * q) as f32) - (f[p] + (p * p) as f32))
                / (2.0 * (q as f32 - p as f32));
            if s <= z[k] {
                k -= 1;
            } else {
                k += 1;
                v[k] = q;
                z[k] = s;
                z[k + 1] = f32::INFINITY;
                break;
            }
        }
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f32 {
            k += 1;
        }
        let p = v[k];
        let dq = q as f32 - p as f32;
        *out = dq * dq + f[p];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_seed_distances() {
        let mut mask = Array2::from_elem((7, 7), false);
        mask[[3, 3]] = true;
        let d = euclidean_distance(&mask);
        assert_eq!(d[[3, 3]], 0.0);
        assert!((d[[3, 5]] - 2.0).abs() < 1e-5);
        assert!((d[[0, 3]] - 3.0).abs() < 1e-5);
        assert!((d[[0, 0]] - (18.0f32).sqrt()).abs() < 1e-4);
    }

    #[test]
    fn multiple_seeds_take_nearest() {
        let mut mask = Array2::from_elem((1, 10), false);
        mask[[0, 0]] = true;
        mask[[0, 9]] = true;
        let d = euclidean_distance(&mask);
        assert!((d[[0, 4]] - 4.0).abs() < 1e-5);
        assert!((d[[0, 6]] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn empty_mask_is_far_everywhere() {
        let mask = Array2::from_elem((4, 4), false);
        let d = euclidean_distance(&mask);
        for v in d.iter() {
            assert!(*v > 1e9);
        }
    }
}
