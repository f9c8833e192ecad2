//! Input translation and colour lookup for front ends. Nothing here
//! touches the simulation directly; callers forward the orders a
//! [`Cursor`] produces.

use serde::{Deserialize, Serialize};

use crate::world::{PlayerId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerColor {
    White,
    Red,
    Blue,
    Green,
}

impl PlayerColor {
    /// Neutral tiles and unknown ids render white.
    pub fn for_player(player: PlayerId) -> Self {
        match player.raw() {
            1 => PlayerColor::Red,
            2 => PlayerColor::Blue,
            3 => PlayerColor::Green,
            _ => PlayerColor::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    ToggleOrderMode,
}

impl Key {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'w' => Some(Key::Up),
            's' => Some(Key::Down),
            'a' => Some(Key::Left),
            'd' => Some(Key::Right),
            ' ' => Some(Key::ToggleOrderMode),
            _ => None,
        }
    }
}

/// Selection cursor clamped to the board. In order mode every move
/// also yields an order from the old position to the new one.
#[derive(Debug, Clone)]
pub struct Cursor {
    position: Position,
    width: usize,
    height: usize,
    order_mode: bool,
}

impl Cursor {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            position: Position::default(),
            width,
            height,
            order_mode: false,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_order_mode(&self) -> bool {
        self.order_mode
    }

    /// Applies a key press, returning `(from, to)` when it issues an order.
    pub fn press(&mut self, key: Key) -> Option<(Position, Position)> {
        let (dx, dy) = match key {
            Key::ToggleOrderMode => {
                self.order_mode = !self.order_mode;
                return None;
            }
            Key::Up => (0, -1),
            Key::Down => (0, 1),
            Key::Left => (-1, 0),
            Key::Right => (1, 0),
        };
        let from = self.position;
        self.step(dx, dy);
        self.order_mode.then_some((from, self.position))
    }

    fn step(&mut self, dx: isize, dy: isize) {
        if dx < 0 && self.position.x > 0 {
            self.position.x -= 1;
        }
        if dx > 0 && self.position.x + 1 < self.width {
            self.position.x += 1;
        }
        if dy < 0 && self.position.y > 0 {
            self.position.y -= 1;
        }
        if dy > 0 && self.position.y + 1 < self.height {
            self.position.y += 1;
        }
    }
}
