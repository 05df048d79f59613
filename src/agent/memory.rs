use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::agent::Action;

pub const MEMORY_CAPACITY: usize = 1000;

/// Compressed perception/outcome snapshot: primitive-typed values only.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    pub band_id: u8,
    pub tick: u64,
    pub action: Action,
    pub affect: f64,
    pub dominant_band: u8,
    pub hunger: f64,
    pub energy: f64,
    pub local_vegetation: f64,
    pub local_hydration: f64,
    pub local_threat: f64,
}

/// Bounded episodic store. Above capacity it thins itself by uniform
/// random down-sampling without replacement; survivors keep insertion
/// order.
#[derive(Debug, Clone)]
pub struct EpisodicMemory {
    records: Vec<MemoryRecord>,
    capacity: usize,
}

impl Default for EpisodicMemory {
    fn default() -> Self {
        Self::new(MEMORY_CAPACITY)
    }
}

impl EpisodicMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MemoryRecord] {
        &self.records
    }

    pub fn write(&mut self, record: MemoryRecord, rng: &mut ChaCha8Rng) {
        self.records.push(record);
        if self.records.len() > self.capacity {
            self.thin(rng);
        }
    }

    fn thin(&mut self, rng: &mut ChaCha8Rng) {
        let n = self.records.len();
        let mut indices: Vec<usize> = (0..n).collect();
        // Partial Fisher-Yates: the first `capacity` entries become a
        // uniform sample without replacement.
        for i in 0..self.capacity {
            let j = rng.random_range(i..n);
            indices.swap(i, j);
        }
        indices.truncate(self.capacity);
        indices.sort_unstable();
        self.records = indices.into_iter().map(|i| self.records[i].clone()).collect();
    }

    /// The `k` records most relevant to the queried hunger level. Positive
    /// affect gives a 1.2x relevance boost.
    pub fn query(&self, hunger: f64, k: usize) -> Vec<&MemoryRecord> {
        let mut scored: Vec<(f64, &MemoryRecord)> = self
            .records
            .iter()
            .map(|record| {
                let mut relevance = (1.0 - (record.hunger - hunger).abs()).max(0.0);
                if record.affect > 0.0 {
                    relevance *= 1.2;
                }
                (relevance, record)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(k).map(|(_, r)| r).collect()
    }
}
