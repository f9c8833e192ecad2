use tracing::{debug, warn};

use crate::{
    engine::{Capture, System, SystemContext, TickSummary},
    orders::Order,
    world::{Grid, PlayerId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Source no longer belongs to the issuing player.
    Stale,
    Transferred { troops: u32 },
    Captured { previous_owner: PlayerId },
    Repelled { troops: u32 },
}

/// Moves the whole stack from `order.from` onto `order.to`. Friendly
/// destinations absorb it; anything else is attacked and falls only to
/// a strictly larger stack.
///
/// A friendly destination holds at most `u32::MAX`; whatever does not fit
/// stays on the source tile.
pub fn resolve(grid: &mut Grid, order: &Order) -> Resolution {
    let source = grid.at_mut(order.from.x, order.from.y);
    if !source.is_owned_by(order.player) {
        return Resolution::Stale;
    }
    let count = std::mem::take(&mut source.troops);

    let dest = grid.at_mut(order.to.x, order.to.y);
    if dest.is_owned_by(order.player) {
        let moved = count.min(u32::MAX - dest.troops);
        dest.troops += moved;
        if moved < count {
            warn!(
                player = %order.player,
                at = %order.to,
                kept = count - moved,
                "destination stack full, surplus left behind"
            );
            grid.at_mut(order.from.x, order.from.y).troops = count - moved;
        }
        Resolution::Transferred { troops: moved }
    } else if count > dest.troops {
        let previous_owner = dest.owner;
        dest.owner = order.player;
        dest.troops = count - dest.troops;
        Resolution::Captured { previous_owner }
    } else {
        dest.troops -= count;
        Resolution::Repelled { troops: count }
    }
}

pub struct OrderResolutionSystem;

impl OrderResolutionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrderResolutionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for OrderResolutionSystem {
    fn name(&self) -> &str {
        "orders"
    }

    fn run(&mut self, ctx: &SystemContext<'_>, grid: &mut Grid, summary: &mut TickSummary) {
        for order in ctx.orders {
            match resolve(grid, order) {
                Resolution::Stale => {
                    summary.stale_orders += 1;
                    debug!(
                        tick = ctx.tick,
                        player = %order.player,
                        from = %order.from,
                        "discarding stale order"
                    );
                }
                Resolution::Captured { previous_owner } => {
                    summary.orders_resolved += 1;
                    summary.captures.push(Capture {
                        at: order.to,
                        player: order.player,
                        previous_owner,
                    });
                    let tile = grid.at(order.to.x, order.to.y);
                    debug!(
                        scenario = ctx.scenario_name,
                        tick = ctx.tick,
                        player = %order.player,
                        at = %order.to,
                        previous = %previous_owner,
                        capital = tile.is_capital,
                        "tile captured"
                    );
                }
                Resolution::Transferred { .. } | Resolution::Repelled { .. } => {
                    summary.orders_resolved += 1;
                }
            }
        }
    }
}
