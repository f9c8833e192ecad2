use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use rand::{seq::index, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::{
    engine::{Simulation, SimulationSettings},
    world::{Grid, Position},
};

fn default_width() -> usize {
    10
}

fn default_height() -> usize {
    10
}

fn default_max_players() -> usize {
    2
}

fn default_order_queue_depth() -> usize {
    16
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    #[serde(default = "default_order_queue_depth")]
    pub order_queue_depth: usize,
    #[serde(default)]
    pub strict_players: bool,
    #[serde(default)]
    pub require_capital: bool,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    /// Explicit city layout. Takes precedence over `random_cities`.
    #[serde(default)]
    pub cities: Option<Vec<Position>>,
    #[serde(default)]
    pub random_cities: Option<RandomCities>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomCities {
    pub count: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario = Scenario::from_yaml(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Two players on a 10x10 board with cities at (0,0) and (3,3).
    pub fn reference() -> Self {
        Self {
            name: "reference".to_string(),
            description: None,
            width: default_width(),
            height: default_height(),
            max_players: default_max_players(),
            order_queue_depth: default_order_queue_depth(),
            strict_players: false,
            require_capital: false,
            tick_interval_ms: default_tick_interval_ms(),
            ticks: None,
            cities: None,
            random_cities: None,
            logging: LoggingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("grid must be at least 1x1, got {}x{}", self.width, self.height);
        }
        if self.max_players == 0 {
            bail!("max_players must be greater than zero");
        }
        if self.order_queue_depth == 0 {
            bail!("order_queue_depth must be greater than zero");
        }
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than zero");
        }
        if let Some(random) = &self.random_cities {
            if random.count > self.width * self.height {
                bail!(
                    "cannot place {} random cities on a {}x{} grid",
                    random.count,
                    self.width,
                    self.height
                );
            }
        }
        let positions = self.city_positions();
        let mut seen = BTreeSet::new();
        for &city in &positions {
            if city.x >= self.width || city.y >= self.height {
                bail!(
                    "city {city} lies outside the {}x{} grid",
                    self.width,
                    self.height
                );
            }
            if !seen.insert((city.y, city.x)) {
                bail!("city {city} is listed more than once");
            }
        }
        let cities = positions.len();
        if cities < self.max_players {
            tracing::warn!(
                scenario = %self.name,
                cities,
                max_players = self.max_players,
                "fewer cities than players; late joiners will have no capital"
            );
        }
        Ok(())
    }

    pub fn city_positions(&self) -> Vec<Position> {
        if let Some(cities) = &self.cities {
            return cities.clone();
        }
        if let Some(random) = &self.random_cities {
            let mut rng = ChaCha8Rng::seed_from_u64(random.seed);
            let mut picked: Vec<usize> =
                index::sample(&mut rng, self.width * self.height, random.count).into_vec();
            picked.sort_unstable();
            return picked
                .into_iter()
                .map(|i| Position::new(i % self.width, i / self.width))
                .collect();
        }
        Grid::DEFAULT_CITIES.to_vec()
    }

    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            scenario_name: self.name.clone(),
            max_players: self.max_players,
            order_queue_depth: self.order_queue_depth,
            strict_players: self.strict_players,
            require_capital: self.require_capital,
        }
    }

    pub fn build_grid(&self) -> Result<Grid> {
        let grid = Grid::with_cities(self.width, self.height, &self.city_positions())?;
        Ok(grid)
    }

    pub fn build_simulation(&self) -> Result<Simulation> {
        Ok(Simulation::new(self.settings(), self.build_grid()?))
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> Option<u64> {
        override_ticks.or(self.ticks)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_in_defaults() {
        let scenario = Scenario::from_yaml("name: tiny\n").unwrap();
        assert_eq!((scenario.width, scenario.height), (10, 10));
        assert_eq!(scenario.max_players, 2);
        assert_eq!(scenario.tick_interval(), Duration::from_secs(1));
        assert_eq!(scenario.logging.level, "info");
        assert_eq!(scenario.city_positions(), Grid::DEFAULT_CITIES.to_vec());
    }

    #[test]
    fn explicit_cities_override_defaults() {
        let yaml = "name: custom\nwidth: 5\nheight: 5\ncities:\n  - { x: 4, y: 4 }\n  - { x: 1, y: 0 }\n";
        let scenario = Scenario::from_yaml(yaml).unwrap();
        let grid = scenario.build_grid().unwrap();
        assert!(grid.at(4, 4).is_city);
        assert!(grid.at(1, 0).is_city);
        assert!(!grid.at(0, 0).is_city);
    }

    #[test]
    fn random_cities_are_seeded() {
        let yaml = "name: random\nwidth: 8\nheight: 8\nrandom_cities: { count: 4, seed: 11 }\n";
        let a = Scenario::from_yaml(yaml).unwrap().city_positions();
        let b = Scenario::from_yaml(yaml).unwrap().city_positions();
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);
    }

    #[test]
    fn city_outside_grid_fails_validation() {
        let yaml = "name: broken\nwidth: 3\nheight: 3\ncities:\n  - { x: 3, y: 0 }\n";
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn zero_players_fails_validation() {
        assert!(Scenario::from_yaml("name: empty\nmax_players: 0\n").is_err());
    }

    #[test]
    fn zero_tick_interval_fails_validation() {
        let err = Scenario::from_yaml("name: frantic\ntick_interval_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("tick_interval_ms"));
    }

    #[test]
    fn duplicate_cities_fail_validation() {
        let yaml = "name: doubled\nwidth: 5\nheight: 5\ncities:\n  - { x: 2, y: 2 }\n  - { x: 2, y: 2 }\n";
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
