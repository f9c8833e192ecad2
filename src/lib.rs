pub mod client;
pub mod driver;
pub mod engine;
pub mod orders;
pub mod scenario;
pub mod systems;
pub mod world;

pub use engine::{Simulation, SimulationSettings, TickSummary};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::{Grid, PlayerId, Position, Tile};
