use ndarray::Array2;
use rand::SeedableRng;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;
use strum::Display;

use crate::agent::memory::{EpisodicMemory, MemoryRecord};
use crate::agent::{
    Action, ActionProposal, AgentSnapshot, Band, BandState, CellEnvironment, Outcome, Perception,
    ProposalReason,
};

/// Frozen metabolic and attentional constants of the physiological band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysiologyParams {
    pub passive_hunger_rate: f64,
    pub passive_thirst_rate: f64,
    pub passive_fatigue_rate: f64,

    pub move_energy_cost: f64,
    pub move_hunger_cost: f64,
    pub move_thirst_cost: f64,
    pub move_fatigue_cost: f64,

    pub forage_energy_cost: f64,
    pub forage_fatigue_cost: f64,

    pub rest_fatigue_recovery: f64,

    pub focus_switch_threshold: f64,
    pub focus_buildup_rate: f64,
    pub focus_hysteresis_bonus: f64,
}

impl Default for PhysiologyParams {
    fn default() -> Self {
        Self {
            passive_hunger_rate: 0.008,
            passive_thirst_rate: 0.012,
            passive_fatigue_rate: 0.004,
            move_energy_cost: 1.0,
            move_hunger_cost: 0.01,
            move_thirst_cost: 0.005,
            move_fatigue_cost: 0.005,
            forage_energy_cost: 1.0,
            forage_fatigue_cost: 0.015,
            rest_fatigue_recovery: 0.1,
            focus_switch_threshold: 0.2,
            focus_buildup_rate: 0.1,
            focus_hysteresis_bonus: 0.3,
        }
    }
}

/// The drive currently commanding attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Focus {
    Hunger,
    Thirst,
    Fatigue,
    Threat,
}

/// The band's homeostatic interior. Drives sit in [0, 1] (1 = critical);
/// resources in [0, 100].
#[derive(Debug, Clone, PartialEq)]
pub struct PhysiologyState {
    pub hunger: f64,
    pub thirst: f64,
    pub fatigue: f64,
    pub temperature_stress: f64,

    pub energy: f64,
    pub hydration: f64,

    pub current_focus: Option<Focus>,
    pub focus_strength: f64,
    pub ticks_since_satisfaction: u32,

    pub desperation: f64,
    pub search_radius: u32,
    pub risk_tolerance: f64,

    pub last_action: Option<Action>,
    pub successful_forages: u32,
    pub failed_searches: u32,
}

impl Default for PhysiologyState {
    fn default() -> Self {
        Self {
            hunger: 0.0,
            thirst: 0.0,
            fatigue: 0.0,
            temperature_stress: 0.0,
            energy: 100.0,
            hydration: 100.0,
            current_focus: None,
            focus_strength: 0.0,
            ticks_since_satisfaction: 0,
            desperation: 0.0,
            search_radius: 2,
            risk_tolerance: 0.1,
            last_action: None,
            successful_forages: 0,
            failed_searches: 0,
        }
    }
}

/// Band 1: a multi-drive homeostat with adaptive attentional focus.
///
/// Drives deplete continuously; attention commits to one drive at a time
/// under hysteresis that weakens as drives become extreme; desperation
/// widens the search radius and lowers gradient-follow thresholds. Nothing
/// here encodes "migrate": migration emerges when the local cell cannot
/// keep the drives satisfied.
pub struct PhysiologicalBand {
    band_id: u8,
    params: PhysiologyParams,
    state: BandState,
    physiology: PhysiologyState,
    memory: EpisodicMemory,
    rng: ChaCha8Rng,
}

impl PhysiologicalBand {
    pub fn new(band_id: u8, initial_gain: f64, seed: u64) -> Self {
        Self::with_params(band_id, initial_gain, seed, PhysiologyParams::default())
    }

    pub fn with_params(
        band_id: u8,
        initial_gain: f64,
        seed: u64,
        params: PhysiologyParams,
    ) -> Self {
        Self {
            band_id,
            params,
            state: BandState::with_gain(initial_gain),
            physiology: PhysiologyState::default(),
            memory: EpisodicMemory::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn physiology(&self) -> &PhysiologyState {
        &self.physiology
    }

    pub fn physiology_mut(&mut self) -> &mut PhysiologyState {
        &mut self.physiology
    }

    // ============================================================================================
    // Focus and desperation
    // ============================================================================================

    fn apply_passive_depletion(&mut self) {
        let p = &self.params;
        self.physiology.hunger = (self.physiology.hunger + p.passive_hunger_rate).min(1.0);
        self.physiology.thirst = (self.physiology.thirst + p.passive_thirst_rate).min(1.0);
        self.physiology.fatigue = (self.physiology.fatigue + p.passive_fatigue_rate).min(1.0);
    }

    /// Pick the drive that commands attention, under adaptive hysteresis:
    /// the stickiness of the current focus collapses as drives approach
    /// critical, and a raw drive above 0.9 force-switches regardless.
    /// Returns the weighted urgency of the focused drive.
    fn update_focus(&mut self, perception: &Perception) -> f64 {
        let hunger = self.physiology.hunger;
        let thirst = self.physiology.thirst;
        let fatigue = self.physiology.fatigue;
        let threat = perception.local_threat;

        let weighted = [
            (Focus::Hunger, hunger * 2.0),
            (Focus::Thirst, thirst * 1.3),
            (Focus::Fatigue, fatigue * 0.8),
            (Focus::Threat, threat * 10.0),
        ];
        let max_drive = weighted
            .iter()
            .map(|(_, v)| *v)
            .fold(f64::NEG_INFINITY, f64::max);
        let hysteresis_multiplier = if max_drive > 2.0 {
            0.3
        } else if max_drive > 1.5 {
            0.6
        } else {
            1.0
        };

        let current = self.physiology.current_focus;
        let mut focus_strength = self.physiology.focus_strength;
        let bias =
            focus_strength * self.params.focus_hysteresis_bonus * hysteresis_multiplier;
        let biased_value = |focus: Focus| -> f64 {
            let base = weighted
                .iter()
                .find(|(f, _)| *f == focus)
                .map(|(_, v)| *v)
                .unwrap_or(0.0);
            if current == Some(focus) { base + bias } else { base }
        };

        let mut dominant = weighted[0].0;
        let mut dominant_urgency = f64::NEG_INFINITY;
        for (focus, _) in weighted {
            let value = biased_value(focus);
            if value > dominant_urgency {
                dominant = focus;
                dominant_urgency = value;
            }
        }
        let current_urgency = match current {
            Some(focus) => biased_value(focus),
            None => 0.0,
        };

        let mut next_focus = current;
        if current == Some(dominant) {
            let buildup = self.params.focus_buildup_rate
                * if max_drive < 1.5 { 1.0 } else { 0.5 };
            focus_strength = (focus_strength + buildup).min(1.0);
        } else {
            let critical = match dominant {
                Focus::Hunger => hunger > 0.9,
                Focus::Thirst => thirst > 0.9,
                Focus::Fatigue => fatigue > 0.9,
                Focus::Threat => false,
            };
            if critical {
                // Low initial commitment: stay ready to switch again.
                next_focus = Some(dominant);
                focus_strength = 0.2;
            } else {
                let switch_threshold =
                    self.params.focus_switch_threshold * hysteresis_multiplier;
                if dominant_urgency > current_urgency + switch_threshold {
                    next_focus = Some(dominant);
                    focus_strength = 0.3;
                }
            }
        }

        let focused_urgency = match next_focus {
            Some(focus) => biased_value(focus),
            None => 0.0,
        };
        self.physiology.current_focus = next_focus;
        self.physiology.focus_strength = focus_strength;
        focused_urgency
    }

    /// Desperation rises with squared deficits and with time since the
    /// focused drive was last satisfied; it widens the search radius and
    /// raises risk tolerance.
    fn update_desperation(&mut self) -> f64 {
        let deficit =
            (self.physiology.hunger.powi(2) + self.physiology.thirst.powi(2)) / 2.0;
        let starvation_time =
            (self.physiology.ticks_since_satisfaction as f64 / 50.0).min(1.0);
        let desperation = deficit.max(starvation_time);

        self.physiology.desperation = desperation;
        self.physiology.search_radius = (2.0 + desperation * 8.0) as u32;
        self.physiology.risk_tolerance = 0.1 + desperation * 0.5;
        desperation
    }

    // ============================================================================================
    // Navigation
    // ============================================================================================

    /// Cardinal step toward the lowest value in the local threat patch.
    fn safest_direction(threat: &Array2<f32>) -> Action {
        if threat.is_empty() {
            return Action::Stay;
        }
        let (h, w) = threat.dim();
        let cy = h / 2;
        let cx = w / 2;
        let candidates = [
            (Action::MoveNorth, if cy > 0 { threat[[cy - 1, cx]] } else { 1.0 }),
            (Action::MoveSouth, if cy + 1 < h { threat[[cy + 1, cx]] } else { 1.0 }),
            (Action::MoveEast, if cx + 1 < w { threat[[cy, cx + 1]] } else { 1.0 }),
            (Action::MoveWest, if cx > 0 { threat[[cy, cx - 1]] } else { 1.0 }),
        ];
        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.1 < best.1 {
                best = *candidate;
            }
        }
        best.0
    }

    /// Steepest-ascent step on a resource window. Below the gradient
    /// threshold: desperate agents still follow the best direction, content
    /// agents wander among the candidates.
    fn gradient_direction(
        &mut self,
        window: Option<&Array2<f32>>,
        threshold: f64,
        follow_when_flat: bool,
    ) -> Action {
        let Some(window) = window else {
            return *Action::CARDINALS.choose(&mut self.rng).unwrap_or(&Action::Stay);
        };
        if window.is_empty() {
            return *Action::CARDINALS.choose(&mut self.rng).unwrap_or(&Action::Stay);
        }

        let (h, w) = window.dim();
        let cy = h / 2;
        let cx = w / 2;
        let current = window[[cy, cx]] as f64;

        let mut candidates: Vec<(Action, f64)> = Vec::with_capacity(4);
        if cy > 0 {
            candidates.push((Action::MoveNorth, window[[cy - 1, cx]] as f64));
        }
        if cy + 1 < h {
            candidates.push((Action::MoveSouth, window[[cy + 1, cx]] as f64));
        }
        if cx + 1 < w {
            candidates.push((Action::MoveEast, window[[cy, cx + 1]] as f64));
        }
        if cx > 0 {
            candidates.push((Action::MoveWest, window[[cy, cx - 1]] as f64));
        }
        if candidates.is_empty() {
            return Action::Stay;
        }

        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.1 > best.1 {
                best = *candidate;
            }
        }

        if best.1 > current + threshold || follow_when_flat {
            best.0
        } else {
            candidates
                .choose(&mut self.rng)
                .map(|(action, _)| *action)
                .unwrap_or(Action::Stay)
        }
    }

    // ============================================================================================
    // Proposals per focus
    // ============================================================================================

    fn propose_flee(&self, perception: &Perception) -> Vec<ActionProposal> {
        let action = Self::safest_direction(&perception.neighborhood_threat);
        vec![ActionProposal {
            action,
            urgency: self.state.urgency,
            expected_value: 1.0,
            band_id: self.band_id,
            reason: ProposalReason::FleePredator,
        }]
    }

    fn propose_hunger(&mut self, perception: &Perception) -> Vec<ActionProposal> {
        let desperation = self.physiology.desperation;
        let urgency = self.state.urgency;
        let reason = if self.physiology.hunger > 0.9 {
            ProposalReason::CriticalHunger
        } else {
            ProposalReason::Foraging
        };

        // Acceptable food quality drops as desperation climbs.
        let acceptable = 0.3 - desperation * 0.2;
        if perception.local_vegetation > acceptable {
            return vec![ActionProposal {
                action: Action::Forage,
                urgency,
                expected_value: perception.local_vegetation * 5.0,
                band_id: self.band_id,
                reason,
            }];
        }

        let threshold = 0.03 * (1.0 - desperation * 0.7);
        let action = self.gradient_direction(
            perception.neighborhood_vegetation.as_ref(),
            threshold,
            desperation > 0.5,
        );
        vec![ActionProposal {
            action,
            urgency: urgency * (1.0 + desperation * 0.5),
            expected_value: 1.0,
            band_id: self.band_id,
            reason: if reason == ProposalReason::CriticalHunger {
                reason
            } else {
                ProposalReason::SearchingFood
            },
        }]
    }

    fn propose_thirst(&mut self, perception: &Perception) -> Vec<ActionProposal> {
        let urgency = self.state.urgency;
        if perception.local_hydration > 0.7 {
            return vec![ActionProposal {
                action: Action::Drink,
                urgency,
                expected_value: perception.local_hydration * 4.0,
                band_id: self.band_id,
                reason: ProposalReason::Drinking,
            }];
        }
        let action =
            self.gradient_direction(perception.neighborhood_hydration.as_ref(), 0.05, false);
        vec![ActionProposal {
            action,
            urgency,
            expected_value: 1.0,
            band_id: self.band_id,
            reason: ProposalReason::SearchingWater,
        }]
    }

    fn propose_rest(&self) -> Vec<ActionProposal> {
        vec![ActionProposal {
            action: Action::Rest,
            urgency: self.state.urgency,
            expected_value: 0.5,
            band_id: self.band_id,
            reason: ProposalReason::Resting,
        }]
    }
}

impl Band for PhysiologicalBand {
    fn band_id(&self) -> u8 {
        self.band_id
    }

    fn state(&self) -> &BandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BandState {
        &mut self.state
    }

    fn memory(&self) -> &EpisodicMemory {
        &self.memory
    }

    fn perceive(&self, env: &CellEnvironment, agent: &AgentSnapshot) -> Perception {
        Perception {
            local_temperature: env.temperature,
            local_hydration: env.hydration,
            local_vegetation: env.vegetation,
            local_threat: env.threat,
            neighborhood_threat: env.neighborhood_threat.clone(),
            neighborhood_vegetation: env.neighborhood_vegetation.clone(),
            neighborhood_hydration: env.neighborhood_hydration.clone(),
            energy: agent.energy,
            position: agent.position,
            tick: agent.tick,
        }
    }

    fn compute_urgency(&mut self, perception: &Perception) -> f64 {
        self.apply_passive_depletion();
        let focused_urgency = self.update_focus(perception);
        let desperation = self.update_desperation();
        self.state.urgency = focused_urgency * (1.0 + desperation) * self.state.gain;
        self.state.urgency
    }

    fn propose_actions(&mut self, perception: &Perception) -> Vec<ActionProposal> {
        match self.physiology.current_focus {
            Some(Focus::Threat) => self.propose_flee(perception),
            Some(Focus::Hunger) => self.propose_hunger(perception),
            Some(Focus::Thirst) => self.propose_thirst(perception),
            Some(Focus::Fatigue) => self.propose_rest(),
            None => vec![ActionProposal {
                action: Action::Stay,
                urgency: 0.1,
                expected_value: 0.0,
                band_id: self.band_id,
                reason: ProposalReason::Content,
            }],
        }
    }

    fn update_state(&mut self, perception: &Perception, action: Action, _outcome: &Outcome) {
        let p = self.params;
        self.physiology.last_action = Some(action);

        match action {
            Action::MoveNorth | Action::MoveSouth | Action::MoveEast | Action::MoveWest => {
                self.physiology.energy = (self.physiology.energy - p.move_energy_cost).max(0.0);
                self.physiology.hunger = (self.physiology.hunger + p.move_hunger_cost).min(1.0);
                self.physiology.thirst = (self.physiology.thirst + p.move_thirst_cost).min(1.0);
                self.physiology.fatigue =
                    (self.physiology.fatigue + p.move_fatigue_cost).min(1.0);
            }
            Action::Forage => {
                self.physiology.energy =
                    (self.physiology.energy - p.forage_energy_cost).max(0.0);
                self.physiology.fatigue =
                    (self.physiology.fatigue + p.forage_fatigue_cost).min(1.0);

                let vegetation = perception.local_vegetation;
                if vegetation > 0.2 {
                    self.physiology.hunger =
                        (self.physiology.hunger - vegetation * 0.2).max(0.0);
                    self.physiology.energy =
                        (self.physiology.energy + vegetation * 10.0).min(100.0);
                    self.physiology.successful_forages += 1;
                    self.physiology.ticks_since_satisfaction = 0;
                } else {
                    self.physiology.failed_searches += 1;
                }
            }
            Action::Drink => {
                let hydration = perception.local_hydration;
                if hydration > 0.7 {
                    self.physiology.thirst =
                        (self.physiology.thirst - (hydration - 0.7) * 0.5).max(0.0);
                    self.physiology.ticks_since_satisfaction = 0;
                }
            }
            Action::Rest => {
                self.physiology.fatigue =
                    (self.physiology.fatigue - p.rest_fatigue_recovery).max(0.0);
                self.physiology.hunger =
                    (self.physiology.hunger + p.passive_hunger_rate * 0.5).min(1.0);
            }
            Action::Stay => {}
        }

        let unsatisfied = match action {
            Action::Forage => perception.local_vegetation < 0.2,
            Action::Drink => perception.local_hydration < 0.7,
            _ => true,
        };
        if unsatisfied {
            self.physiology.ticks_since_satisfaction += 1;
        }

        if self.physiology.desperation > 0.6 {
            self.state.frustration = (self.state.frustration + 0.05).min(1.0);
        } else {
            self.state.frustration = (self.state.frustration - 0.02).max(0.0);
        }
    }

    fn learning_signal(&self, perception: &Perception, action: Action, _outcome: &Outcome) -> f64 {
        if self.physiology.current_focus == Some(Focus::Hunger) && action == Action::Forage {
            perception.local_vegetation * 0.5
        } else {
            0.0
        }
    }

    fn write_memory(
        &mut self,
        perception: &Perception,
        action: Action,
        outcome: &Outcome,
        affect: f64,
    ) {
        let record = MemoryRecord {
            band_id: self.band_id,
            tick: outcome.tick,
            action,
            affect,
            dominant_band: outcome.dominant_band,
            hunger: self.physiology.hunger,
            energy: perception.energy,
            local_vegetation: perception.local_vegetation,
            local_hydration: perception.local_hydration,
            local_threat: perception.local_threat,
        };
        self.memory.write(record, &mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn snapshot() -> AgentSnapshot {
        AgentSnapshot {
            energy: 100.0,
            position: (8, 8),
            tick: 0,
        }
    }

    fn band() -> PhysiologicalBand {
        PhysiologicalBand::new(1, 2.0, 99)
    }

    #[test]
    fn quiescent_band_has_zero_urgency_and_stays() {
        let mut band = band();
        let perception = band.perceive(&CellEnvironment::default(), &snapshot());
        let urgency = band.compute_urgency(&perception);
        assert_eq!(urgency, 0.0, "no focus means no urgency");
        let proposals = band.propose_actions(&perception);
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].action, Action::Stay);
        assert_eq!(proposals[0].reason, ProposalReason::Content);
    }

    #[test]
    fn threat_takes_focus_and_proposes_a_move() {
        let mut band = band();
        let env = CellEnvironment {
            threat: 0.9,
            neighborhood_threat: Array2::from_elem((5, 5), 0.5f32),
            ..Default::default()
        };
        let perception = band.perceive(&env, &snapshot());
        let urgency = band.compute_urgency(&perception);
        assert!(urgency > 8.0, "weighted threat of 9 scaled by gain 2");
        assert_eq!(band.physiology().current_focus, Some(Focus::Threat));
        let proposals = band.propose_actions(&perception);
        assert!(proposals[0].action.is_move());
        assert_eq!(proposals[0].reason, ProposalReason::FleePredator);
    }

    #[test]
    fn flee_picks_the_lowest_threat_cell() {
        let threat = array![
            [0.9f32, 0.9, 0.9],
            [0.9, 0.5, 0.1],
            [0.9, 0.3, 0.9],
        ];
        assert_eq!(PhysiologicalBand::safest_direction(&threat), Action::MoveEast);
    }

    #[test]
    fn hungry_band_forages_in_a_rich_cell() {
        let mut band = band();
        band.physiology_mut().hunger = 0.8;
        let env = CellEnvironment {
            vegetation: 0.6,
            ..Default::default()
        };
        let perception = band.perceive(&env, &snapshot());
        band.compute_urgency(&perception);
        assert_eq!(band.physiology().current_focus, Some(Focus::Hunger));
        let proposals = band.propose_actions(&perception);
        assert_eq!(proposals[0].action, Action::Forage);
        assert_eq!(proposals[0].reason, ProposalReason::Foraging);
    }

    #[test]
    fn critical_hunger_is_flagged_for_the_arbiter() {
        let mut band = band();
        band.physiology_mut().hunger = 0.95;
        let env = CellEnvironment {
            vegetation: 0.6,
            ..Default::default()
        };
        let perception = band.perceive(&env, &snapshot());
        band.compute_urgency(&perception);
        let proposals = band.propose_actions(&perception);
        assert_eq!(proposals[0].reason, ProposalReason::CriticalHunger);
    }

    #[test]
    fn hungry_band_climbs_the_vegetation_gradient() {
        let mut band = band();
        band.physiology_mut().hunger = 0.8;
        // Barren cell, richer neighbor to the south.
        let window = array![
            [0.0f32, 0.0, 0.0],
            [0.0, 0.02, 0.0],
            [0.0, 0.4, 0.0],
        ];
        let env = CellEnvironment {
            vegetation: 0.02,
            neighborhood_vegetation: Some(window),
            ..Default::default()
        };
        let perception = band.perceive(&env, &snapshot());
        band.compute_urgency(&perception);
        let proposals = band.propose_actions(&perception);
        assert_eq!(proposals[0].action, Action::MoveSouth);
        assert_eq!(proposals[0].reason, ProposalReason::SearchingFood);
    }

    #[test]
    fn desperation_lowers_the_acceptable_forage_threshold() {
        let mut band = band();
        band.physiology_mut().hunger = 0.8;
        band.physiology_mut().thirst = 0.8;
        // Deficit desperation = (0.64 + 0.64) / 2 = 0.64; acceptable food
        // quality drops to 0.3 - 0.128 ~ 0.17.
        let env = CellEnvironment {
            vegetation: 0.2,
            ..Default::default()
        };
        let perception = band.perceive(&env, &snapshot());
        band.compute_urgency(&perception);
        assert!(band.physiology().desperation > 0.6);
        assert!(band.physiology().search_radius > 2);
        let proposals = band.propose_actions(&perception);
        assert_eq!(proposals[0].action, Action::Forage);
    }

    #[test]
    fn focus_hysteresis_resists_small_challengers() {
        let mut band = band();
        band.physiology_mut().hunger = 0.4;
        let perception = band.perceive(&CellEnvironment::default(), &snapshot());
        band.compute_urgency(&perception);
        assert_eq!(band.physiology().current_focus, Some(Focus::Hunger));

        // Raise thirst so its weighted drive barely edges past hunger; the
        // hysteresis bonus keeps attention on hunger.
        band.physiology_mut().thirst = 0.65;
        band.compute_urgency(&perception);
        assert_eq!(band.physiology().current_focus, Some(Focus::Hunger));

        // A critical thirst force-switches.
        band.physiology_mut().thirst = 0.95;
        band.compute_urgency(&perception);
        assert_eq!(band.physiology().current_focus, Some(Focus::Thirst));
        assert!((band.physiology().focus_strength - 0.2).abs() < 1e-9);
    }

    #[test]
    fn foraging_in_vegetation_restores_the_band() {
        let mut band = band();
        band.physiology_mut().hunger = 0.6;
        band.physiology_mut().ticks_since_satisfaction = 30;
        let env = CellEnvironment {
            vegetation: 0.5,
            ..Default::default()
        };
        let perception = band.perceive(&env, &snapshot());
        let outcome = Outcome {
            tick: 0,
            energy_delta: 4.0,
            new_energy: 104.0,
            new_position: (8, 8),
            old_position: (8, 8),
            dominant_band: 1,
        };
        band.update_state(&perception, Action::Forage, &outcome);
        assert!(band.physiology().hunger < 0.6);
        assert_eq!(band.physiology().successful_forages, 1);
        assert_eq!(band.physiology().ticks_since_satisfaction, 0);
    }

    #[test]
    fn rest_recovers_fatigue_at_a_hunger_price() {
        let mut band = band();
        band.physiology_mut().fatigue = 0.5;
        let perception = band.perceive(&CellEnvironment::default(), &snapshot());
        let outcome = Outcome {
            tick: 0,
            energy_delta: 2.0,
            new_energy: 102.0,
            new_position: (8, 8),
            old_position: (8, 8),
            dominant_band: 1,
        };
        let hunger_before = band.physiology().hunger;
        band.update_state(&perception, Action::Rest, &outcome);
        assert!((band.physiology().fatigue - 0.4).abs() < 1e-9);
        assert!(band.physiology().hunger > hunger_before);
    }

    #[test]
    fn learning_signal_rewards_successful_foraging() {
        let mut band = band();
        band.physiology_mut().hunger = 0.8;
        let env = CellEnvironment {
            vegetation: 0.6,
            ..Default::default()
        };
        let perception = band.perceive(&env, &snapshot());
        band.compute_urgency(&perception);
        let outcome = Outcome {
            tick: 0,
            energy_delta: 5.0,
            new_energy: 105.0,
            new_position: (8, 8),
            old_position: (8, 8),
            dominant_band: 1,
        };
        let signal = band.learning_signal(&perception, Action::Forage, &outcome);
        assert!((signal - 0.3).abs() < 1e-9);
        assert_eq!(band.learning_signal(&perception, Action::Rest, &outcome), 0.0);
    }
}
