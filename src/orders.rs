use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::{GridError, PlayerId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub player: PlayerId,
    pub from: Position,
    pub to: Position,
}

impl Order {
    pub fn new(player: PlayerId, from: Position, to: Position) -> Self {
        Self { player, from, to }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("player {0} has not joined the game")]
    UnknownPlayer(PlayerId),
    #[error("order queue for player {player} is full ({depth} pending)")]
    QueueFull { player: PlayerId, depth: usize },
    #[error(transparent)]
    OutOfBounds(#[from] GridError),
}

/// Pending orders, one FIFO queue per player, iterated in ascending
/// player id so resolution is reproducible.
#[derive(Debug, Clone)]
pub struct OrderBook {
    max_depth: usize,
    queues: BTreeMap<PlayerId, VecDeque<Order>>,
}

impl OrderBook {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            queues: BTreeMap::new(),
        }
    }

    /// Appends to the issuing player's queue. A full queue rejects the
    /// newest order and leaves the backlog untouched.
    pub fn push(&mut self, order: Order) -> Result<(), OrderError> {
        let queue = self.queues.entry(order.player).or_default();
        if queue.len() >= self.max_depth {
            return Err(OrderError::QueueFull {
                player: order.player,
                depth: queue.len(),
            });
        }
        queue.push_back(order);
        Ok(())
    }

    /// Pops the front order of every non-empty queue.
    pub fn drain_fronts(&mut self) -> Vec<Order> {
        self.queues
            .values_mut()
            .filter_map(|queue| queue.pop_front())
            .collect()
    }

    pub fn pending_for(&self, player: PlayerId) -> usize {
        self.queues.get(&player).map_or(0, VecDeque::len)
    }

    pub fn total_pending(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(player: u32, x: usize) -> Order {
        Order::new(PlayerId::new(player), Position::new(x, 0), Position::new(x + 1, 0))
    }

    #[test]
    fn fronts_come_out_in_player_order_one_each() {
        let mut book = OrderBook::new(8);
        book.push(order(2, 0)).unwrap();
        book.push(order(1, 1)).unwrap();
        book.push(order(1, 2)).unwrap();

        let fronts = book.drain_fronts();
        assert_eq!(fronts, vec![order(1, 1), order(2, 0)]);
        assert_eq!(book.pending_for(PlayerId::new(1)), 1);
        assert_eq!(book.pending_for(PlayerId::new(2)), 0);
    }

    #[test]
    fn full_queue_rejects_newest() {
        let mut book = OrderBook::new(2);
        book.push(order(1, 0)).unwrap();
        book.push(order(1, 1)).unwrap();
        let err = book.push(order(1, 2)).unwrap_err();
        assert_eq!(
            err,
            OrderError::QueueFull {
                player: PlayerId::new(1),
                depth: 2,
            }
        );
        assert_eq!(book.drain_fronts(), vec![order(1, 0)]);
    }
}
