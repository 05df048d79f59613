use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand_chacha::ChaCha8Rng;

use crate::agent::{Action, ActionProposal, ProposalReason};

/// The band whose proposals can veto everything else.
const SAFETY_BAND: u8 = 2;
const SAFETY_VETO_URGENCY: f64 = 8.0;

/// Below this energy the arbiter forces a critical-hunger proposal.
const ENERGY_EMERGENCY: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub action: Action,
    pub band_id: u8,
    pub proposal: Option<ActionProposal>,
}

/// Per-agent selector over the bands' proposals: safety veto first, then
/// the energy-budget override, then softmax sampling with inertia toward
/// the previously dominant band. The hysteresis keeps agents from
/// thrashing between bands when stimuli fluctuate.
pub struct Arbiter {
    inertia: f64,
    temperature: f64,
    rng: ChaCha8Rng,
    previous_action: Option<Action>,
    previous_band: Option<u8>,
    dominant_band_history: Vec<u8>,
}

impl Arbiter {
    pub fn new(inertia: f64, temperature: f64, seed: u64) -> Self {
        Self {
            inertia,
            temperature,
            rng: ChaCha8Rng::seed_from_u64(seed),
            previous_action: None,
            previous_band: None,
            dominant_band_history: Vec::new(),
        }
    }

    pub fn previous_action(&self) -> Option<Action> {
        self.previous_action
    }

    pub fn previous_band(&self) -> Option<u8> {
        self.previous_band
    }

    pub fn select(&mut self, proposals: &[ActionProposal], energy: f64) -> Selection {
        if proposals.is_empty() {
            // Contained agent-scope fault: default to staying put.
            return Selection {
                action: Action::Stay,
                band_id: 0,
                proposal: None,
            };
        }

        if let Some(veto) = proposals
            .iter()
            .find(|p| p.band_id == SAFETY_BAND && p.urgency > SAFETY_VETO_URGENCY)
        {
            return self.commit(veto);
        }

        if energy < ENERGY_EMERGENCY {
            if let Some(emergency) = proposals
                .iter()
                .find(|p| p.band_id == 1 && p.reason == ProposalReason::CriticalHunger)
            {
                return self.commit(emergency);
            }
        }

        let mut urgencies: Vec<f64> = proposals.iter().map(|p| p.urgency).collect();
        if let Some(previous) = self.previous_band {
            for (urgency, proposal) in urgencies.iter_mut().zip(proposals) {
                if proposal.band_id == previous {
                    *urgency *= 1.0 + self.inertia;
                }
            }
        }

        let max = urgencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let weights: Vec<f64> = if max == 0.0 {
            vec![1.0; urgencies.len()]
        } else {
            // Numerically stable softmax at the arbitration temperature.
            let scaled: Vec<f64> = urgencies.iter().map(|u| u / self.temperature).collect();
            let peak = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            scaled.iter().map(|s| (s - peak).exp()).collect()
        };

        let index = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => 0,
        };
        self.commit(&proposals[index])
    }

    fn commit(&mut self, proposal: &ActionProposal) -> Selection {
        self.previous_action = Some(proposal.action);
        self.previous_band = Some(proposal.band_id);
        self.dominant_band_history.push(proposal.band_id);
        Selection {
            action: proposal.action,
            band_id: proposal.band_id,
            proposal: Some(proposal.clone()),
        }
    }

    /// Fraction of decisions each band has dominated.
    pub fn dominant_band_distribution(&self) -> BTreeMap<u8, f64> {
        let total = self.dominant_band_history.len();
        if total == 0 {
            return BTreeMap::new();
        }
        let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
        for band in &self.dominant_band_history {
            *counts.entry(*band).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(band, count)| (band, count as f64 / total as f64))
            .collect()
    }

    pub fn reset(&mut self) {
        self.previous_action = None;
        self.previous_band = None;
        self.dominant_band_history.clear();
    }
}
