//! Population-level behavior of banded agents in a hydrated environment
//! with predators.

use ecotope::agent::simulation::AgentSimulation;
use ecotope::engine::Engine;
use ecotope::scenario::Scenario;

fn run_dir(dir: &std::path::Path, ticks: u32) -> std::path::PathBuf {
    let mut scenario = Scenario::default_scenario();
    scenario.world.width = 48;
    scenario.world.height = 48;
    let engine = Engine::new(scenario).unwrap();
    engine.run(ticks, dir, Some("survival")).unwrap()
}

#[test]
fn well_fed_agents_survive_a_short_horizon() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_dir(dir.path(), 20);

    // No predators: starvation is the only risk over 20 ticks.
    let mut sim = AgentSimulation::new(&run, 0, 42).unwrap();
    sim.spawn_agents(10, 100.0, 2000);
    sim.run(20).unwrap();

    assert_eq!(sim.alive_count(), 10, "all agents should outlive 20 ticks");
    assert!(sim.survival_rate() >= 1.0 - f64::EPSILON);
    assert_eq!(sim.population_stats().len(), 20);
    let last = sim.population_stats().last().unwrap();
    assert!(last.mean_energy > 0.0);
    assert!(last.min_energy > 0.0);
}

#[test]
fn simulation_is_deterministic_for_a_fixed_seed() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_dir(dir.path(), 12);

    let trajectory = |seed: u64| {
        let mut sim = AgentSimulation::new(&run, 3, seed).unwrap();
        sim.spawn_agents(8, 100.0, 2000);
        sim.run(12).unwrap();
        sim.agents()
            .iter()
            .map(|a| (a.state.x, a.state.y, a.state.energy.to_bits()))
            .collect::<Vec<_>>()
    };

    assert_eq!(trajectory(42), trajectory(42));
    assert_ne!(trajectory(42), trajectory(43));
}

#[test]
fn predation_events_are_bookkept() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_dir(dir.path(), 30);

    // A dense predator population on a small world guarantees contact.
    let mut sim = AgentSimulation::new(&run, 24, 7).unwrap();
    sim.spawn_agents(24, 60.0, 5000);
    sim.run(30).unwrap();

    let events = sim.predation_events();
    assert!(!events.is_empty(), "24 predators on 48x48 must catch someone");
    for event in events {
        let agent = &sim.agents()[event.agent_id as usize];
        assert!(agent.state.times_caught > 0);
        assert!(event.energy_after >= 0.0);
        if event.died {
            assert!(event.energy_after <= 0.0 + f64::EPSILON);
        }
    }

    let last = sim.population_stats().last().unwrap();
    assert_eq!(last.total_predation_events, events.len());
    assert!(last.alive <= 24);
}

#[test]
fn agents_accumulate_decisions_and_memories() {
    let dir = tempfile::tempdir().unwrap();
    let run = run_dir(dir.path(), 10);

    let mut sim = AgentSimulation::new(&run, 2, 11).unwrap();
    sim.spawn_agents(4, 100.0, 3000);
    sim.run(10).unwrap();

    for agent in sim.agents() {
        assert_eq!(agent.decisions().len(), 10);
        assert_eq!(agent.bands().len(), 1);
        assert_eq!(agent.bands()[0].memory().len(), 10);
        let dominance = agent.band_dominance();
        let total: f64 = dominance.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
