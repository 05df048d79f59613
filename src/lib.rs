// === Public Modules (The Canonical Paths) ===
pub mod agent;
pub mod engine;
pub mod error;
pub mod hydrator;
pub mod initgen;
pub mod kernels;
pub mod math;
pub mod predator;
pub mod registry;
pub mod report;
pub mod rng;
pub mod scenario;
pub mod view;

// === Facades (Re-exporting the common entry points) ===
pub use crate::engine::Engine;
pub use crate::error::{EcotopeError, EcotopeResult};
pub use crate::hydrator::Hydrator;
pub use crate::scenario::Scenario;
pub use crate::view::EnvironmentView;
