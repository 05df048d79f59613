use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::math::stats::mean;

/// One pursuit agent. `hunt_radius` bounds both target acquisition and the
/// threat stamp; `speed` bounds the per-tick step length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predator {
    pub id: u32,
    pub x: usize,
    pub y: usize,
    pub hunt_radius: u32,
    pub speed: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredatorSummary {
    pub active: usize,
    pub positions: Vec<(usize, usize)>,
    pub threat_mean: f64,
    pub threat_max: f32,
}

/// A population of predators plus the scalar threat field they stamp over
/// the grid each update. The system owns both; agents only read the field.
pub struct PredatorSystem {
    width: usize,
    height: usize,
    predators: Vec<Predator>,
    threat_field: Array2<f32>,
    rng: ChaCha8Rng,
}

impl PredatorSystem {
    pub fn new(width: usize, height: usize, count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let predators = (0..count)
            .map(|i| Predator {
                id: i as u32,
                x: rng.random_range(0..width),
                y: rng.random_range(0..height),
                hunt_radius: rng.random_range(5..15),
                speed: rng.random_range(1..3),
                active: true,
            })
            .collect();
        Self {
            width,
            height,
            predators,
            threat_field: Array2::zeros((height, width)),
            rng,
        }
    }

    pub fn predators(&self) -> &[Predator] {
        &self.predators
    }

    pub fn threat_field(&self) -> &Array2<f32> {
        &self.threat_field
    }

    /// Advance every active predator one step and restamp the threat field.
    /// Predators pursue the nearest agent inside their hunt radius, taking
    /// a single axis-aligned step along the larger-displacement axis;
    /// without a target they patrol randomly.
    pub fn update(&mut self, agent_positions: &[(usize, usize)]) {
        self.threat_field.fill(0.0);

        for index in 0..self.predators.len() {
            if !self.predators[index].active {
                continue;
            }
            let target = self.find_closest_agent(&self.predators[index], agent_positions);
            match target {
                Some(t) => {
                    let predator = &mut self.predators[index];
                    let width = self.width;
                    let height = self.height;
                    move_toward(predator, t, width, height);
                }
                None => {
                    let dx = self.rng.random_range(-1i64..2);
                    let dy = self.rng.random_range(-1i64..2);
                    let predator = &mut self.predators[index];
                    predator.x = wrap(predator.x as i64 + dx, self.width);
                    predator.y = wrap(predator.y as i64 + dy, self.height);
                }
            }
            self.stamp_threat(index);
        }
    }

    fn find_closest_agent(
        &self,
        predator: &Predator,
        agent_positions: &[(usize, usize)],
    ) -> Option<(usize, usize)> {
        let mut best = f64::INFINITY;
        let mut closest = None;
        for &(ax, ay) in agent_positions {
            let dist = toroidal_distance(
                (predator.x, predator.y),
                (ax, ay),
                self.width,
                self.height,
            );
            if dist < best && dist <= predator.hunt_radius as f64 {
                best = dist;
                closest = Some((ax, ay));
            }
        }
        closest
    }

    /// Cone of linearly decaying intensity over a square of radius
    /// `hunt_radius + 5`, max-composed across predators.
    fn stamp_threat(&mut self, index: usize) {
        let predator = self.predators[index];
        let radius = (predator.hunt_radius + 5) as i64;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let dist = ((dx * dx + dy * dy) as f64).sqrt();
                if dist > radius as f64 {
                    continue;
                }
                let x = wrap(predator.x as i64 + dx, self.width);
                let y = wrap(predator.y as i64 + dy, self.height);
                let threat = (1.0 - dist / radius as f64).max(0.0) as f32;
                let cell = &mut self.threat_field[[y, x]];
                *cell = cell.max(threat);
            }
        }
    }

    pub fn threat_at(&self, x: usize, y: usize) -> f32 {
        self.threat_field[[y, x]]
    }

    /// Threat values in a window around `(x, y)`, clipped at grid edges.
    pub fn local_threat(&self, x: usize, y: usize, radius: usize) -> Array2<f32> {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(self.height);
        let x0 = x.saturating_sub(radius);
        let x1 = (x + radius + 1).min(self.width);
        self.threat_field
            .slice(ndarray::s![y0..y1, x0..x1])
            .to_owned()
    }

    /// Indices of agents within toroidal distance 1 of any active predator.
    pub fn check_predation(&self, agent_positions: &[(usize, usize)]) -> Vec<usize> {
        let mut caught = Vec::new();
        for (i, &(ax, ay)) in agent_positions.iter().enumerate() {
            let is_caught = self.predators.iter().any(|p| {
                p.active
                    && toroidal_distance((p.x, p.y), (ax, ay), self.width, self.height) <= 1.0
            });
            if is_caught {
                caught.push(i);
            }
        }
        caught
    }

    pub fn summary(&self) -> PredatorSummary {
        let active: Vec<&Predator> = self.predators.iter().filter(|p| p.active).collect();
        PredatorSummary {
            active: active.len(),
            positions: active.iter().map(|p| (p.x, p.y)).collect(),
            threat_mean: mean(&self.threat_field.view()),
            threat_max: self
                .threat_field
                .iter()
                .copied()
                .fold(0.0f32, f32::max),
        }
    }
}

fn wrap(v: i64, n: usize) -> usize {
    v.rem_euclid(n as i64) as usize
}

/// Euclidean distance with per-axis wrap shortening.
fn toroidal_distance(a: (usize, usize), b: (usize, usize), width: usize, height: usize) -> f64 {
    let dx = (a.0 as i64 - b.0 as i64).unsigned_abs() as usize;
    let dy = (a.1 as i64 - b.1 as i64).unsigned_abs() as usize;
    let dx = dx.min(width - dx) as f64;
    let dy = dy.min(height - dy) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// One Chebyshev step of length <= speed along the larger-displacement
/// axis, through the wrap seam when that is shorter.
fn move_toward(predator: &mut Predator, target: (usize, usize), width: usize, height: usize) {
    let mut dx = target.0 as i64 - predator.x as i64;
    let mut dy = target.1 as i64 - predator.y as i64;
    if dx.abs() > width as i64 / 2 {
        dx = -(width as i64 - dx.abs()) * dx.signum();
    }
    if dy.abs() > height as i64 / 2 {
        dy = -(height as i64 - dy.abs()) * dy.signum();
    }

    let speed = predator.speed as i64;
    let (step_x, step_y) = if dx.abs() > dy.abs() {
        (dx.signum() * speed.min(dx.abs()), 0)
    } else {
        (0, dy.signum() * speed.min(dy.abs()))
    };
    predator.x = wrap(predator.x as i64 + step_x, width);
    predator.y = wrap(predator.y as i64 + step_y, height);
}
