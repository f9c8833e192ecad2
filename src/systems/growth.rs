use crate::{
    engine::{System, SystemContext, TickSummary},
    world::Grid,
};

/// Plain tiles grow on ticks whose counter is a multiple of this.
pub const DECADE: u64 = 10;

pub fn is_decade_tick(tick: u64) -> bool {
    tick % DECADE == 0
}

/// Adds one troop to every owned city or capital, and to every other
/// owned tile on decade ticks. Ownership is never touched.
pub struct GrowthSystem;

impl GrowthSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrowthSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for GrowthSystem {
    fn name(&self) -> &str {
        "growth"
    }

    fn run(&mut self, ctx: &SystemContext<'_>, grid: &mut Grid, summary: &mut TickSummary) {
        let decade = is_decade_tick(ctx.tick);
        for tile in grid.tiles_mut() {
            if tile.owner().is_none() {
                continue;
            }
            if tile.grows_every_tick() || decade {
                tile.troops = tile.troops.saturating_add(1);
                summary.tiles_grown += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::PlayerId;

    fn run_at(tick: u64, grid: &mut Grid) -> TickSummary {
        let ctx = SystemContext {
            tick,
            scenario_name: "test",
            orders: &[],
        };
        let mut summary = TickSummary::default();
        GrowthSystem::new().run(&ctx, grid, &mut summary);
        summary
    }

    #[test]
    fn decade_ticks_are_multiples_of_ten() {
        assert!(is_decade_tick(0));
        assert!(!is_decade_tick(9));
        assert!(is_decade_tick(20));
    }

    #[test]
    fn neutral_tiles_never_grow() {
        let mut grid = Grid::new(4, 4).unwrap();
        let summary = run_at(0, &mut grid);
        assert_eq!(summary.tiles_grown, 0);
        assert!(grid.tiles().all(|tile| tile.troops == 1));
    }

    #[test]
    fn owned_plain_tile_grows_only_on_decade() {
        let mut grid = Grid::new(4, 4).unwrap();
        grid.at_mut(1, 1).owner = PlayerId::new(1);
        grid.at_mut(0, 0).owner = PlayerId::new(1);

        run_at(3, &mut grid);
        assert_eq!(grid.at(1, 1).troops, 1);
        assert_eq!(grid.at(0, 0).troops, 2);

        run_at(10, &mut grid);
        assert_eq!(grid.at(1, 1).troops, 2);
        assert_eq!(grid.at(0, 0).troops, 3);
    }
}
