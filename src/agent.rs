pub mod arbiter;
pub mod banded;
pub mod memory;
pub mod physiological;
pub mod simulation;

use ndarray::Array2;
use strum::{Display, EnumIter, EnumString};

use crate::agent::memory::EpisodicMemory;

// Gain adaptation shared by every band.
pub const GAIN_MIN: f64 = 0.1;
pub const GAIN_MAX: f64 = 5.0;
pub const GAIN_INCREMENT: f64 = 0.1;
pub const GAIN_FRUSTRATION_THRESHOLD: f64 = 10.0;

// ================================================================================================
// Actions and proposals
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    MoveNorth,
    MoveSouth,
    MoveEast,
    MoveWest,
    Stay,
    Forage,
    Drink,
    Rest,
}

impl Action {
    pub const CARDINALS: [Action; 4] = [
        Action::MoveNorth,
        Action::MoveSouth,
        Action::MoveEast,
        Action::MoveWest,
    ];

    /// Grid displacement; north decreases y.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Action::MoveNorth => (0, -1),
            Action::MoveSouth => (0, 1),
            Action::MoveEast => (1, 0),
            Action::MoveWest => (-1, 0),
            _ => (0, 0),
        }
    }

    pub fn is_move(self) -> bool {
        matches!(
            self,
            Action::MoveNorth | Action::MoveSouth | Action::MoveEast | Action::MoveWest
        )
    }
}

/// Why a band proposed what it proposed. The arbiter's energy-emergency
/// override keys on `CriticalHunger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ProposalReason {
    Content,
    FleePredator,
    CriticalHunger,
    Foraging,
    SearchingFood,
    Drinking,
    SearchingWater,
    Resting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionProposal {
    pub action: Action,
    pub urgency: f64,
    pub expected_value: f64,
    pub band_id: u8,
    pub reason: ProposalReason,
}

// ================================================================================================
// Perception and outcome records
// ================================================================================================

/// What the simulation hands a band about the agent's cell: scalar field
/// values plus the local windows the band navigates by.
#[derive(Debug, Clone)]
pub struct CellEnvironment {
    pub temperature: f64,
    pub hydration: f64,
    pub vegetation: f64,
    pub movement_cost: f64,
    pub threat: f64,
    pub neighborhood_threat: Array2<f32>,
    pub neighborhood_vegetation: Option<Array2<f32>>,
    pub neighborhood_hydration: Option<Array2<f32>>,
}

impl Default for CellEnvironment {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            hydration: 0.5,
            vegetation: 0.0,
            movement_cost: 0.0,
            threat: 0.0,
            neighborhood_threat: Array2::zeros((5, 5)),
            neighborhood_vegetation: None,
            neighborhood_hydration: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AgentSnapshot {
    pub energy: f64,
    pub position: (usize, usize),
    pub tick: u64,
}

/// A band's structured view of one tick. Stable shape: scalars, windows,
/// and the agent's own vitals.
#[derive(Debug, Clone)]
pub struct Perception {
    pub local_temperature: f64,
    pub local_hydration: f64,
    pub local_vegetation: f64,
    pub local_threat: f64,
    pub neighborhood_threat: Array2<f32>,
    pub neighborhood_vegetation: Option<Array2<f32>>,
    pub neighborhood_hydration: Option<Array2<f32>>,
    pub energy: f64,
    pub position: (usize, usize),
    pub tick: u64,
}

/// What one executed action did to the agent.
#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    pub tick: u64,
    pub energy_delta: f64,
    pub new_energy: f64,
    pub new_position: (usize, usize),
    pub old_position: (usize, usize),
    pub dominant_band: u8,
}

// ================================================================================================
// Band contract
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandState {
    pub urgency: f64,
    pub gain: f64,
    pub frustration: f64,
}

impl BandState {
    pub fn with_gain(gain: f64) -> Self {
        Self {
            urgency: 0.0,
            gain,
            frustration: 0.0,
        }
    }
}

/// One layer of the agent controller: perceives its slice of the world,
/// evaluates urgency, proposes actions, and learns from outcomes.
pub trait Band {
    fn band_id(&self) -> u8;

    fn state(&self) -> &BandState;

    fn state_mut(&mut self) -> &mut BandState;

    fn memory(&self) -> &EpisodicMemory;

    /// Transform raw environment and agent state into the band's
    /// perception record.
    fn perceive(&self, env: &CellEnvironment, agent: &AgentSnapshot) -> Perception;

    /// Update internal drives and return the band's urgency for this tick.
    fn compute_urgency(&mut self, perception: &Perception) -> f64;

    fn propose_actions(&mut self, perception: &Perception) -> Vec<ActionProposal>;

    /// Apply action costs and rewards to the band's internal state.
    fn update_state(&mut self, perception: &Perception, action: Action, outcome: &Outcome);

    /// Drive-reduction proxy used as the affect tag on episodic memories.
    fn learning_signal(&self, perception: &Perception, action: Action, outcome: &Outcome) -> f64;

    fn write_memory(
        &mut self,
        perception: &Perception,
        action: Action,
        outcome: &Outcome,
        affect: f64,
    );

    /// Raise gain while chronically frustrated, relax it when quiescent.
    fn update_gain(&mut self) {
        let state = self.state_mut();
        if state.frustration > GAIN_FRUSTRATION_THRESHOLD {
            state.gain = (state.gain + GAIN_INCREMENT).min(GAIN_MAX);
            state.frustration = 0.0;
        } else if state.urgency < 0.1 {
            state.gain = (state.gain - GAIN_INCREMENT * 0.5).max(GAIN_MIN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_match_the_wire_format() {
        assert_eq!(Action::MoveNorth.to_string(), "MOVE_NORTH");
        assert_eq!(Action::Forage.to_string(), "FORAGE");
        assert_eq!("DRINK".parse::<Action>().unwrap(), Action::Drink);
    }

    #[test]
    fn cardinal_offsets_are_unit_steps() {
        for action in Action::CARDINALS {
            let (dx, dy) = action.offset();
            assert_eq!(dx.abs() + dy.abs(), 1);
            assert!(action.is_move());
        }
        assert_eq!(Action::Stay.offset(), (0, 0));
        assert!(!Action::Forage.is_move());
    }
}
