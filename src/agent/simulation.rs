use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::agent::banded::BandedAgent;
use crate::agent::CellEnvironment;
use crate::error::EcotopeResult;
use crate::predator::PredatorSystem;
use crate::registry::{
    FIELD_HYDRATION, FIELD_MOVEMENT_COST, FIELD_TEMPERATURE, FIELD_VEGETATION,
};
use crate::view::EnvironmentView;

const THREAT_WINDOW_RADIUS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct PredationEvent {
    pub tick: u32,
    pub agent_id: u64,
    pub position: (usize, usize),
    pub energy_after: f64,
    pub died: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopulationStats {
    pub tick: u32,
    pub alive: usize,
    pub mean_energy: f64,
    pub std_energy: f64,
    pub min_energy: f64,
    pub max_energy: f64,
    pub mean_band1_urgency: f64,
    pub total_predation_events: usize,
    pub predator_threat_mean: f64,
}

/// Population-level driver: couples a hydrated environment, the predator
/// system, and the banded agents. Per tick the environment resolves first,
/// predators move next, agents step, and the predation check runs last.
pub struct AgentSimulation {
    view: EnvironmentView,
    predators: PredatorSystem,
    agents: Vec<BandedAgent>,
    rng: ChaCha8Rng,
    width: usize,
    height: usize,
    current_tick: u32,
    population: Vec<PopulationStats>,
    predation_events: Vec<PredationEvent>,
}

impl AgentSimulation {
    pub fn new(
        run_dir: impl AsRef<Path>,
        num_predators: usize,
        seed: u64,
    ) -> EcotopeResult<Self> {
        let view = EnvironmentView::open(run_dir)?;
        let width = view.width();
        let height = view.height();
        let predators =
            PredatorSystem::new(width, height, num_predators, seed.wrapping_add(1000));
        Ok(Self {
            view,
            predators,
            agents: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            width,
            height,
            current_tick: 0,
            population: Vec::new(),
            predation_events: Vec::new(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn agents(&self) -> &[BandedAgent] {
        &self.agents
    }

    pub fn predators(&self) -> &PredatorSystem {
        &self.predators
    }

    pub fn population_stats(&self) -> &[PopulationStats] {
        &self.population
    }

    pub fn predation_events(&self) -> &[PredationEvent] {
        &self.predation_events
    }

    /// Spawn agents uniformly at random; per-agent seeds are stable
    /// offsets from `seed_base`.
    pub fn spawn_agents(&mut self, count: usize, initial_energy: f64, seed_base: u64) {
        for i in 0..count {
            let x = self.rng.random_range(0..self.width);
            let y = self.rng.random_range(0..self.height);
            let id = self.agents.len() as u64;
            self.agents.push(BandedAgent::new(
                id,
                x,
                y,
                initial_energy,
                seed_base.wrapping_add(i as u64),
            ));
        }
    }

    /// One simulation tick over the whole population.
    pub fn step(&mut self) -> EcotopeResult<()> {
        self.view.load_tick(self.current_tick)?;

        let alive: Vec<usize> = (0..self.agents.len())
            .filter(|i| self.agents[*i].state.alive)
            .collect();
        let positions: Vec<(usize, usize)> = alive
            .iter()
            .map(|i| (self.agents[*i].state.x, self.agents[*i].state.y))
            .collect();
        self.predators.update(&positions);

        for &index in &alive {
            let (x, y) = (self.agents[index].state.x, self.agents[index].state.y);
            let env = self.cell_environment(x, y)?;
            self.agents[index].step(&env, self.width, self.height);
        }

        let stepped_positions: Vec<(usize, usize)> = alive
            .iter()
            .map(|i| (self.agents[*i].state.x, self.agents[*i].state.y))
            .collect();
        for caught in self.predators.check_predation(&stepped_positions) {
            let agent = &mut self.agents[alive[caught]];
            agent.handle_predation();
            self.predation_events.push(PredationEvent {
                tick: self.current_tick,
                agent_id: agent.state.id,
                position: (agent.state.x, agent.state.y),
                energy_after: agent.state.energy,
                died: !agent.state.alive,
            });
        }

        let stats = self.collect_population_stats();
        self.population.push(stats);
        self.current_tick += 1;
        Ok(())
    }

    pub fn run(&mut self, ticks: u32) -> EcotopeResult<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        info!(
            ticks,
            alive = self.alive_count(),
            predation_events = self.predation_events.len(),
            "agent simulation complete"
        );
        Ok(())
    }

    /// Everything a band perceives about one cell: scalar fields, the
    /// threat raster, and 3x3 resource windows for gradient following.
    fn cell_environment(&self, x: usize, y: usize) -> EcotopeResult<CellEnvironment> {
        let fields = self.view.get_all_fields_at(x, y)?;
        let windows = self.view.get_neighborhood(x, y, 1)?;
        let scalar = |name: &str, default: f64| {
            fields.get(name).map(|v| *v as f64).unwrap_or(default)
        };
        Ok(CellEnvironment {
            temperature: scalar(FIELD_TEMPERATURE, 0.5),
            hydration: scalar(FIELD_HYDRATION, 0.5),
            vegetation: scalar(FIELD_VEGETATION, 0.0),
            movement_cost: scalar(FIELD_MOVEMENT_COST, 0.0),
            threat: self.predators.threat_at(x, y) as f64,
            neighborhood_threat: self.predators.local_threat(x, y, THREAT_WINDOW_RADIUS),
            neighborhood_vegetation: windows.get(FIELD_VEGETATION).cloned(),
            neighborhood_hydration: windows.get(FIELD_HYDRATION).cloned(),
        })
    }

    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|a| a.state.alive).count()
    }

    pub fn survival_rate(&self) -> f64 {
        if self.agents.is_empty() {
            return 0.0;
        }
        self.alive_count() as f64 / self.agents.len() as f64
    }

    fn collect_population_stats(&self) -> PopulationStats {
        let alive: Vec<&BandedAgent> =
            self.agents.iter().filter(|a| a.state.alive).collect();
        let summary = self.predators.summary();
        if alive.is_empty() {
            return PopulationStats {
                tick: self.current_tick,
                alive: 0,
                mean_energy: 0.0,
                std_energy: 0.0,
                min_energy: 0.0,
                max_energy: 0.0,
                mean_band1_urgency: 0.0,
                total_predation_events: self.predation_events.len(),
                predator_threat_mean: summary.threat_mean,
            };
        }

        let energies: Vec<f64> = alive.iter().map(|a| a.state.energy).collect();
        let n = energies.len() as f64;
        let mean_energy = energies.iter().sum::<f64>() / n;
        let variance = energies
            .iter()
            .map(|e| (e - mean_energy).powi(2))
            .sum::<f64>()
            / n;
        let urgencies: Vec<f64> = alive
            .iter()
            .filter_map(|a| a.bands().first().map(|b| b.state().urgency))
            .collect();
        let mean_band1_urgency = if urgencies.is_empty() {
            0.0
        } else {
            urgencies.iter().sum::<f64>() / urgencies.len() as f64
        };

        PopulationStats {
            tick: self.current_tick,
            alive: alive.len(),
            mean_energy,
            std_energy: variance.sqrt(),
            min_energy: energies.iter().copied().fold(f64::INFINITY, f64::min),
            max_energy: energies.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean_band1_urgency,
            total_predation_events: self.predation_events.len(),
            predator_threat_mean: summary.threat_mean,
        }
    }
}
