use tracing::trace;

use crate::agent::arbiter::Arbiter;
use crate::agent::physiological::PhysiologicalBand;
use crate::agent::{Action, ActionProposal, AgentSnapshot, Band, CellEnvironment, Outcome};

const ENERGY_CAP: f64 = 150.0;
const PREDATION_ENERGY_LOSS: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    pub id: u64,
    pub x: usize,
    pub y: usize,
    pub energy: f64,
    pub tick: u64,
    pub alive: bool,
    pub times_caught: u32,
}

/// One arbitration, for trajectory analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub tick: u64,
    pub position: (usize, usize),
    pub action: Action,
    pub dominant_band: u8,
    pub urgency: f64,
    pub energy: f64,
}

/// An agent driven by the banded controller: every tick each band
/// perceives, evaluates urgency, and proposes; the arbiter picks one
/// action; the agent executes it on the torus and feeds the outcome back
/// into every band.
pub struct BandedAgent {
    pub state: AgentState,
    bands: Vec<Box<dyn Band>>,
    arbiter: Arbiter,
    decisions: Vec<DecisionRecord>,
}

impl BandedAgent {
    pub fn new(id: u64, x: usize, y: usize, initial_energy: f64, seed: u64) -> Self {
        let bands: Vec<Box<dyn Band>> =
            vec![Box::new(PhysiologicalBand::new(1, 2.0, seed.wrapping_add(1000)))];
        Self::with_bands(id, x, y, initial_energy, bands, seed.wrapping_add(2000))
    }

    /// Assemble an agent from an explicit band stack.
    pub fn with_bands(
        id: u64,
        x: usize,
        y: usize,
        initial_energy: f64,
        bands: Vec<Box<dyn Band>>,
        arbiter_seed: u64,
    ) -> Self {
        Self {
            state: AgentState {
                id,
                x,
                y,
                energy: initial_energy,
                tick: 0,
                alive: true,
                times_caught: 0,
            },
            bands,
            arbiter: Arbiter::new(0.3, 2.0, arbiter_seed),
            decisions: Vec::new(),
        }
    }

    pub fn bands(&self) -> &[Box<dyn Band>] {
        &self.bands
    }

    pub fn decisions(&self) -> &[DecisionRecord] {
        &self.decisions
    }

    pub fn band_dominance(&self) -> std::collections::BTreeMap<u8, f64> {
        self.arbiter.dominant_band_distribution()
    }

    /// One timestep: perceive -> decide -> act -> learn. A dead agent's
    /// step is a no-op.
    pub fn step(&mut self, env: &CellEnvironment, world_width: usize, world_height: usize) {
        if !self.state.alive {
            return;
        }

        let snapshot = AgentSnapshot {
            energy: self.state.energy,
            position: (self.state.x, self.state.y),
            tick: self.state.tick,
        };

        let mut perceptions = Vec::with_capacity(self.bands.len());
        let mut proposals: Vec<ActionProposal> = Vec::new();
        for band in &mut self.bands {
            let perception = band.perceive(env, &snapshot);
            band.compute_urgency(&perception);
            proposals.extend(band.propose_actions(&perception));
            perceptions.push(perception);
        }

        let selection = self.arbiter.select(&proposals, self.state.energy);
        self.decisions.push(DecisionRecord {
            tick: self.state.tick,
            position: (self.state.x, self.state.y),
            action: selection.action,
            dominant_band: selection.band_id,
            urgency: self.bands.first().map(|b| b.state().urgency).unwrap_or(0.0),
            energy: self.state.energy,
        });

        let old_position = (self.state.x, self.state.y);
        self.execute_action(selection.action, world_width, world_height);
        let outcome = self.settle_outcome(env, selection.action, old_position, selection.band_id);
        trace!(
            agent = self.state.id,
            tick = self.state.tick,
            action = %selection.action,
            energy = self.state.energy,
            "agent stepped"
        );

        for (band, perception) in self.bands.iter_mut().zip(&perceptions) {
            band.update_state(perception, selection.action, &outcome);
            let affect = band.learning_signal(perception, selection.action, &outcome);
            band.write_memory(perception, selection.action, &outcome, affect);
            band.update_gain();
        }

        self.state.tick += 1;
    }

    /// Cardinal moves wrap modulo the world dimensions.
    fn execute_action(&mut self, action: Action, world_width: usize, world_height: usize) {
        let (dx, dy) = action.offset();
        self.state.x = (self.state.x as i64 + dx).rem_euclid(world_width as i64) as usize;
        self.state.y = (self.state.y as i64 + dy).rem_euclid(world_height as i64) as usize;
    }

    /// Energy accounting for the executed action; death at zero energy.
    fn settle_outcome(
        &mut self,
        env: &CellEnvironment,
        action: Action,
        old_position: (usize, usize),
        dominant_band: u8,
    ) -> Outcome {
        let mut base_cost = -1.0;
        if action.is_move() {
            base_cost -= 2.0 * env.movement_cost;
        }

        let energy_gain = match action {
            Action::Forage => env.vegetation * 10.0,
            Action::Drink => env.hydration * 5.0,
            Action::Rest => 2.0,
            Action::Stay => {
                base_cost = -0.5;
                0.0
            }
            _ => 0.0,
        };

        let energy_delta = base_cost + energy_gain;
        self.state.energy = (self.state.energy + energy_delta).clamp(0.0, ENERGY_CAP);
        if self.state.energy <= 0.0 {
            self.state.alive = false;
        }

        Outcome {
            tick: self.state.tick,
            energy_delta,
            new_energy: self.state.energy,
            new_position: (self.state.x, self.state.y),
            old_position,
            dominant_band,
        }
    }

    /// Being caught costs a flat slab of energy and may be lethal.
    pub fn handle_predation(&mut self) {
        self.state.times_caught += 1;
        self.state.energy = (self.state.energy - PREDATION_ENERGY_LOSS).max(0.0);
        if self.state.energy <= 0.0 {
            self.state.alive = false;
        }
    }
}
