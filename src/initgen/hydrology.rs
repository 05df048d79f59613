use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use itertools::iproduct;
use ndarray::Array2;
use ordered_float::OrderedFloat;

use crate::math::distance::euclidean_distance;
use crate::math::filter::gaussian_wrap;
use crate::math::stats::{min_max_normalize, percentile};
use crate::scenario::WaterProfile;

/// 8-neighborhood in scan order; steepest-descent ties resolve to the first
/// offset in this list.
const NEIGHBORS_8: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const NEIGHBORS_4: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Steepest-descent flow accumulation over the wrapped elevation raster.
///
/// Every cell points at its strictly-lowest 8-neighbor (or itself when it is
/// a local minimum). Unit mass per cell is propagated topologically from the
/// indegree-0 sources. Returns the accumulation raster and the `closed` mask
/// of cells never reached by the propagation (cycle remnants and sinks).
pub fn flow_accumulation(elevation: &Array2<f32>) -> (Array2<f32>, Array2<bool>) {
    let (h, w) = elevation.dim();
    let wrap = |v: i64, n: usize| v.rem_euclid(n as i64) as usize;

    let mut flow_to = Array2::<(usize, usize)>::from_shape_fn((h, w), |(y, x)| (y, x));
    for (y, x) in iproduct!(0..h, 0..w) {
        let mut lowest = elevation[[y, x]];
        let mut target = (y, x);
        for (dy, dx) in NEIGHBORS_8 {
            let ny = wrap(y as i64 + dy, h);
            let nx = wrap(x as i64 + dx, w);
            if elevation[[ny, nx]] < lowest {
                lowest = elevation[[ny, nx]];
                target = (ny, nx);
            }
        }
        flow_to[[y, x]] = target;
    }

    let mut indegree = Array2::<u32>::zeros((h, w));
    for (y, x) in iproduct!(0..h, 0..w) {
        let (ty, tx) = flow_to[[y, x]];
        if (ty, tx) != (y, x) {
            indegree[[ty, tx]] += 1;
        }
    }

    let mut queue: VecDeque<(usize, usize)> = iproduct!(0..h, 0..w)
        .filter(|&(y, x)| indegree[[y, x]] == 0)
        .collect();

    let mut accumulation = Array2::<f32>::from_elem((h, w), 1.0);
    let mut visited = Array2::<bool>::from_elem((h, w), false);
    while let Some((y, x)) = queue.pop_front() {
        visited[[y, x]] = true;
        let (ty, tx) = flow_to[[y, x]];
        if (ty, tx) == (y, x) {
            continue;
        }
        let upstream = accumulation[[y, x]];
        accumulation[[ty, tx]] += upstream;
        indegree[[ty, tx]] -= 1;
        if indegree[[ty, tx]] == 0 {
            queue.push_back((ty, tx));
        }
    }

    let closed = visited.mapv(|v| !v);
    (accumulation, closed)
}

/// Priority-flood depression filling from the four grid borders.
///
/// The min-heap is keyed on water-surface elevation (ties by `(y, x)`); each
/// popped cell fixes its water level and pushes its wrap-neighbors at
/// `max(level, elevation)`. The lake mask is `water > elevation`, unioned
/// with the top-`threshold` accumulation cells; filled elevation substitutes
/// the water level inside the mask.
pub fn lakes(
    elevation: &Array2<f32>,
    accumulation: &Array2<f32>,
    threshold: f64,
) -> (Array2<bool>, Array2<f32>) {
    let (h, w) = elevation.dim();
    let wrap = |v: i64, n: usize| v.rem_euclid(n as i64) as usize;

    type HeapEntry = Reverse<(OrderedFloat<f32>, usize, usize)>;
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
    for (y, x) in iproduct!(0..h, 0..w) {
        if y == 0 || y == h - 1 || x == 0 || x == w - 1 {
            heap.push(Reverse((OrderedFloat(elevation[[y, x]]), y, x)));
        }
    }

    let mut water = Array2::<f32>::from_elem((h, w), f32::INFINITY);
    while let Some(Reverse((OrderedFloat(level), y, x))) = heap.pop() {
        if water[[y, x]] <= level {
            continue;
        }
        water[[y, x]] = level;
        for (dy, dx) in NEIGHBORS_4 {
            let ny = wrap(y as i64 + dy, h);
            let nx = wrap(x as i64 + dx, w);
            let neighbor_level = level.max(elevation[[ny, nx]]);
            if neighbor_level < water[[ny, nx]] {
                heap.push(Reverse((OrderedFloat(neighbor_level), ny, nx)));
            }
        }
    }

    let mut lake_mask = Array2::<bool>::from_shape_fn((h, w), |(y, x)| {
        water[[y, x]] > elevation[[y, x]]
    });
    let flow_cutoff = percentile(&accumulation.view(), 100.0 * (1.0 - threshold));
    for ((y, x), masked) in lake_mask.indexed_iter_mut() {
        if accumulation[[y, x]] >= flow_cutoff {
            *masked = true;
        }
    }

    let filled = Array2::from_shape_fn((h, w), |(y, x)| {
        if lake_mask[[y, x]] {
            water[[y, x]]
        } else {
            elevation[[y, x]]
        }
    });
    (lake_mask, filled)
}

/// Water availability from the routed hydrology: exponential falloff from
/// rivers (decay 12) and major lakes (decay 20) over the base moisture,
/// plus a lowland bonus, smoothed and clamped to [0, 1].
pub fn hydration(
    filled_elevation: &Array2<f32>,
    accumulation: &Array2<f32>,
    profile: &WaterProfile,
) -> Array2<f32> {
    let (h, w) = filled_elevation.dim();
    let base_moisture = profile.base_moisture as f32;
    let river_depth = profile.river_depth as f32;
    let lake_depth = profile.lake_depth as f32;

    let river_cutoff = percentile(
        &accumulation.view(),
        100.0 * profile.river_percentile,
    );
    let rivers = accumulation.mapv(|a| a >= river_cutoff);

    let lake_cutoff = percentile(
        &accumulation.view(),
        100.0 * (1.0 - profile.lake_fill_threshold),
    );
    let major_lakes = accumulation.mapv(|a| a >= lake_cutoff);

    let river_distance = euclidean_distance(&rivers);
    let lake_distance = euclidean_distance(&major_lakes);
    let elevation_norm = min_max_normalize(filled_elevation);

    let mut moisture = Array2::<f32>::zeros((h, w));
    for ((y, x), out) in moisture.indexed_iter_mut() {
        let river_influence = (-river_distance[[y, x]] / 12.0).exp();
        let lake_influence = (-lake_distance[[y, x]] / 20.0).exp();
        let lowland_bonus = (1.0 - elevation_norm[[y, x]]) * 0.15;
        *out = base_moisture
            + river_influence * (river_depth - base_moisture)
            + lake_influence * (lake_depth - base_moisture)
            + lowland_bonus;
    }

    let smoothed = gaussian_wrap(&moisture, 3.0);
    smoothed.mapv(|v| v.clamp(0.0, 1.0))
}
