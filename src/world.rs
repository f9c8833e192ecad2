use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric player identity. `0` is reserved for "nobody": unowned tiles
/// and refused joins both carry it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u32);

impl PlayerId {
    pub const NEUTRAL: PlayerId = PlayerId(0);

    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_neutral(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u32> for PlayerId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub owner: PlayerId,
    pub troops: u32,
    pub is_capital: bool,
    pub is_city: bool,
}

impl Tile {
    pub fn owner(&self) -> Option<PlayerId> {
        if self.owner.is_neutral() {
            None
        } else {
            Some(self.owner)
        }
    }

    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == player
    }

    /// Cities and capitals grow on every tick, plain tiles only on decade ticks.
    pub fn grows_every_tick(&self) -> bool {
        self.is_city || self.is_capital
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            owner: PlayerId::NEUTRAL,
            troops: 1,
            is_capital: false,
            is_city: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("position {position} is outside the {width}x{height} grid")]
    OutOfBounds {
        position: Position,
        width: usize,
        height: usize,
    },
}

/// Fixed-size board of tiles stored row-major.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    /// City positions used when no layout is configured.
    pub const DEFAULT_CITIES: [Position; 2] = [Position { x: 0, y: 0 }, Position { x: 3, y: 3 }];

    /// Builds the reference board: every tile neutral with one troop and
    /// cities at [`Grid::DEFAULT_CITIES`].
    pub fn new(width: usize, height: usize) -> Result<Self, GridError> {
        Self::with_cities(width, height, &Self::DEFAULT_CITIES)
    }

    pub fn with_cities(width: usize, height: usize, cities: &[Position]) -> Result<Self, GridError> {
        let mut grid = Self {
            width,
            height,
            tiles: vec![Tile::default(); width * height],
        };
        for &city in cities {
            grid.try_at_mut(city.x, city.y)?.is_city = true;
        }
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Panics when `(x, y)` is outside the grid.
    pub fn at(&self, x: usize, y: usize) -> &Tile {
        let index = self.index_or_panic(x, y);
        &self.tiles[index]
    }

    /// Panics when `(x, y)` is outside the grid.
    pub fn at_mut(&mut self, x: usize, y: usize) -> &mut Tile {
        let index = self.index_or_panic(x, y);
        &mut self.tiles[index]
    }

    pub fn try_at(&self, x: usize, y: usize) -> Result<&Tile, GridError> {
        let index = self.index(x, y)?;
        Ok(&self.tiles[index])
    }

    pub fn try_at_mut(&mut self, x: usize, y: usize) -> Result<&mut Tile, GridError> {
        let index = self.index(x, y)?;
        Ok(&mut self.tiles[index])
    }

    pub fn check(&self, position: Position) -> Result<(), GridError> {
        self.index(position.x, position.y).map(|_| ())
    }

    /// Row-major traversal of every tile together with its position.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Tile)> + '_ {
        let width = self.width;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(index, tile)| (Position::new(index % width, index / width), tile))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.tiles.iter()
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> + '_ {
        self.tiles.iter_mut()
    }

    pub fn city_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_city).count()
    }

    fn index(&self, x: usize, y: usize) -> Result<usize, GridError> {
        if self.contains(x, y) {
            Ok(y * self.width + x)
        } else {
            Err(GridError::OutOfBounds {
                position: Position::new(x, y),
                width: self.width,
                height: self.height,
            })
        }
    }

    fn index_or_panic(&self, x: usize, y: usize) -> usize {
        match self.index(x, y) {
            Ok(index) => index,
            Err(err) => panic!("{err}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub x: usize,
    pub y: usize,
    #[serde(flatten)]
    pub tile: Tile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub width: usize,
    pub height: usize,
    pub players: Vec<PlayerId>,
    pub tiles: Vec<TileSnapshot>,
}

impl WorldSnapshot {
    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y * self.width + x).map(|entry| &entry.tile)
    }

    pub fn troops_of(&self, player: PlayerId) -> u64 {
        self.tiles
            .iter()
            .filter(|entry| entry.tile.owner == player)
            .map(|entry| entry.tile.troops as u64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_board_seeds_two_cities() {
        let grid = Grid::new(10, 10).unwrap();
        assert_eq!(grid.city_count(), 2);
        assert!(grid.at(0, 0).is_city);
        assert!(grid.at(3, 3).is_city);

        let plain = grid.at(5, 7);
        assert_eq!(plain.owner(), None);
        assert_eq!(plain.troops, 1);
        assert!(!plain.is_capital && !plain.is_city);
    }

    #[test]
    fn iteration_is_row_major() {
        let grid = Grid::with_cities(3, 2, &[]).unwrap();
        let order: Vec<Position> = grid.iter().map(|(pos, _)| pos).collect();
        assert_eq!(
            order,
            vec![
                Position::new(0, 0),
                Position::new(1, 0),
                Position::new(2, 0),
                Position::new(0, 1),
                Position::new(1, 1),
                Position::new(2, 1),
            ]
        );
    }

    #[test]
    fn checked_access_reports_out_of_bounds() {
        let grid = Grid::new(4, 4).unwrap();
        let err = grid.try_at(4, 0).unwrap_err();
        assert_eq!(
            err,
            GridError::OutOfBounds {
                position: Position::new(4, 0),
                width: 4,
                height: 4,
            }
        );
    }

    #[test]
    #[should_panic(expected = "outside the 4x4 grid")]
    fn unchecked_access_panics_out_of_bounds() {
        let grid = Grid::new(4, 4).unwrap();
        let _ = grid.at(0, 9);
    }

    #[test]
    fn city_outside_grid_is_rejected() {
        assert!(Grid::with_cities(2, 2, &[Position::new(3, 3)]).is_err());
    }
}
