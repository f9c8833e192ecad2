mod growth;
mod orders;

pub use growth::{is_decade_tick, GrowthSystem, DECADE};
pub use orders::{resolve, OrderResolutionSystem, Resolution};
