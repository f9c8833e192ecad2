use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, trace, warn};

use crate::{
    orders::{Order, OrderBook, OrderError},
    systems::{GrowthSystem, OrderResolutionSystem},
    world::{Grid, PlayerId, Position, Tile, TileSnapshot, WorldSnapshot},
};

#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub scenario_name: String,
    pub max_players: usize,
    pub order_queue_depth: usize,
    /// Reject orders from ids that never joined.
    pub strict_players: bool,
    /// Refuse a join when no free city is left to become its capital.
    pub require_capital: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            scenario_name: "reference".to_string(),
            max_players: 2,
            order_queue_depth: 16,
            strict_players: false,
            require_capital: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("roster is full ({max_players} players)")]
    RosterFull { max_players: usize },
    #[error("no unclaimed city is left to serve as a capital")]
    NoCapitalAvailable,
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub scenario_name: &'a str,
    /// Front orders popped for this tick, in player id order.
    pub orders: &'a [Order],
}

/// One phase of a tick. Phases run in registration order against the
/// same grid.
pub trait System: Send {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext<'_>, grid: &mut Grid, summary: &mut TickSummary);
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemRunReport {
    pub name: String,
    pub duration_ms: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub at: Position,
    pub player: PlayerId,
    pub previous_owner: PlayerId,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TickSummary {
    /// Counter value the tick ran with; the first tick is 0.
    pub tick: u64,
    pub orders_resolved: usize,
    pub stale_orders: usize,
    pub captures: Vec<Capture>,
    pub tiles_grown: usize,
    pub system_reports: Vec<SystemRunReport>,
}

impl TickSummary {
    fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }
}

/// Owns the board, the roster and the pending orders. Only `join`,
/// `queue_order` and `advance_tick` mutate it; callers that share one
/// across threads must serialize those calls (see [`crate::driver`]).
pub struct Simulation {
    settings: SimulationSettings,
    grid: Grid,
    players: Vec<PlayerId>,
    last_id: PlayerId,
    orders: OrderBook,
    tick: u64,
    systems: Vec<Box<dyn System>>,
}

impl Simulation {
    pub fn new(settings: SimulationSettings, grid: Grid) -> Self {
        let orders = OrderBook::new(settings.order_queue_depth);
        // Orders must see pre-growth troop counts.
        let systems: Vec<Box<dyn System>> = vec![
            Box::new(OrderResolutionSystem::new()),
            Box::new(GrowthSystem::new()),
        ];
        Self {
            settings,
            grid,
            players: Vec::new(),
            last_id: PlayerId::NEUTRAL,
            orders,
            tick: 0,
            systems,
        }
    }

    /// Joins a new player, returning [`PlayerId::NEUTRAL`] when refused.
    pub fn join(&mut self) -> PlayerId {
        self.try_join().unwrap_or(PlayerId::NEUTRAL)
    }

    pub fn try_join(&mut self) -> Result<PlayerId, JoinError> {
        if self.players.len() >= self.settings.max_players {
            return Err(JoinError::RosterFull {
                max_players: self.settings.max_players,
            });
        }
        if self.settings.require_capital && self.free_city().is_none() {
            return Err(JoinError::NoCapitalAvailable);
        }

        let id = self.last_id.next();
        self.last_id = id;
        self.players.push(id);

        match self.assign_capital(id) {
            Some(capital) => info!(player = %id, %capital, "player joined"),
            None => warn!(player = %id, "player joined without a capital"),
        }
        Ok(id)
    }

    /// Queues an order for the next tick. Nothing on the board changes
    /// until [`Simulation::advance_tick`].
    pub fn queue_order(
        &mut self,
        player: PlayerId,
        from: Position,
        to: Position,
    ) -> Result<(), OrderError> {
        if player.is_neutral() || (self.settings.strict_players && !self.is_player(player)) {
            return Err(OrderError::UnknownPlayer(player));
        }
        self.grid.check(from)?;
        self.grid.check(to)?;
        self.orders.push(Order::new(player, from, to))
    }

    pub fn advance_tick(&mut self) -> TickSummary {
        let orders = self.orders.drain_fronts();
        let ctx = SystemContext {
            tick: self.tick,
            scenario_name: &self.settings.scenario_name,
            orders: &orders,
        };
        let mut summary = TickSummary::new(self.tick);
        for system in &mut self.systems {
            let start = Instant::now();
            system.run(&ctx, &mut self.grid, &mut summary);
            summary.system_reports.push(SystemRunReport {
                name: system.name().to_string(),
                duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            });
        }
        self.tick += 1;
        trace!(
            tick = summary.tick,
            resolved = summary.orders_resolved,
            stale = summary.stale_orders,
            captures = summary.captures.len(),
            "tick complete"
        );
        summary
    }

    /// Copy of the tile at `(x, y)`. Panics outside the grid.
    pub fn tile_at(&self, x: usize, y: usize) -> Tile {
        *self.grid.at(x, y)
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn is_player(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn pending_orders(&self, player: PlayerId) -> usize {
        self.orders.pending_for(player)
    }

    /// Capital tile currently held by `player`, if any.
    pub fn capital_of(&self, player: PlayerId) -> Option<Position> {
        self.grid
            .iter()
            .find(|(_, tile)| tile.is_capital && tile.is_owned_by(player))
            .map(|(position, _)| position)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            scenario: self.settings.scenario_name.clone(),
            tick: self.tick,
            width: self.grid.width(),
            height: self.grid.height(),
            players: self.players.clone(),
            tiles: self
                .grid
                .iter()
                .map(|(position, tile)| TileSnapshot {
                    x: position.x,
                    y: position.y,
                    tile: *tile,
                })
                .collect(),
        }
    }

    fn free_city(&self) -> Option<Position> {
        self.grid
            .iter()
            .find(|(_, tile)| tile.is_city && tile.owner().is_none())
            .map(|(position, _)| position)
    }

    fn assign_capital(&mut self, player: PlayerId) -> Option<Position> {
        let position = self.free_city()?;
        let tile = self.grid.at_mut(position.x, position.y);
        tile.owner = player;
        tile.is_capital = true;
        Some(position)
    }
}
