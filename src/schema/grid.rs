//! Occupancy grid types and the map text format.

use std::fs;
use std::io;
use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

/// Kind of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Free,
    Obstacle,
    Survivor,
    Risk,
}

impl Cell {
    /// Map text code for this cell kind.
    pub fn code(self) -> u8 {
        match self {
            Cell::Free => 0,
            Cell::Obstacle => 1,
            Cell::Survivor => 2,
            Cell::Risk => 3,
        }
    }

    /// Parse a map text code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Cell::Free),
            1 => Some(Cell::Obstacle),
            2 => Some(Cell::Survivor),
            3 => Some(Cell::Risk),
            _ => None,
        }
    }
}

/// Integer grid coordinate. May lie outside the grid while replaying moves.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Manhattan distance to another point.
    #[inline]
    pub fn manhattan(self, other: Point) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// Immutable 3D occupancy grid.
///
/// Cells are stored densely with x varying fastest, then y, then z.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size_x: usize,
    size_y: usize,
    size_z: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a grid from its dimensions and cells in z, y, x order.
    pub fn new(
        size_x: usize,
        size_y: usize,
        size_z: usize,
        cells: Vec<Cell>,
    ) -> Result<Self, GridError> {
        if size_x == 0 || size_y == 0 || size_z == 0 {
            return Err(GridError::Empty);
        }
        let expected = size_x * size_y * size_z;
        if cells.len() != expected {
            return Err(GridError::CellCount {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            size_x,
            size_y,
            size_z,
            cells,
        })
    }

    /// Grid where every cell has the same kind.
    pub fn filled(
        size_x: usize,
        size_y: usize,
        size_z: usize,
        cell: Cell,
    ) -> Result<Self, GridError> {
        Self::new(size_x, size_y, size_z, vec![cell; size_x * size_y * size_z])
    }

    /// Parse the map text format.
    ///
    /// Layers are separated by blank lines, layer `k` being `z = k`. Each
    /// non-blank line is one row (`y`) of whitespace-separated cell codes.
    pub fn parse(text: &str) -> Result<Self, GridError> {
        let mut layers: Vec<Vec<Vec<Cell>>> = Vec::new();
        let mut current: Vec<Vec<Cell>> = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                if !current.is_empty() {
                    layers.push(std::mem::take(&mut current));
                }
                continue;
            }

            let row = line
                .split_whitespace()
                .map(|token| {
                    token
                        .parse::<u8>()
                        .ok()
                        .and_then(Cell::from_code)
                        .ok_or_else(|| GridError::UnknownCell {
                            line: line_no + 1,
                            token: token.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            current.push(row);
        }
        if !current.is_empty() {
            layers.push(current);
        }

        let size_z = layers.len();
        let size_y = layers.first().map_or(0, Vec::len);
        let size_x = layers
            .first()
            .and_then(|layer| layer.first())
            .map_or(0, Vec::len);
        if size_x == 0 || size_y == 0 || size_z == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(size_x * size_y * size_z);
        for (z, layer) in layers.into_iter().enumerate() {
            if layer.len() != size_y {
                return Err(GridError::Ragged { z, y: layer.len() });
            }
            for (y, row) in layer.into_iter().enumerate() {
                if row.len() != size_x {
                    return Err(GridError::Ragged { z, y });
                }
                cells.extend(row);
            }
        }

        Self::new(size_x, size_y, size_z, cells)
    }

    /// Read and parse a map file.
    pub fn load<P: AsRef<FsPath>>(path: P) -> Result<Self, GridError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Dimensions `(size_x, size_y, size_z)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.size_x, self.size_y, self.size_z)
    }

    /// Total number of cells.
    #[inline]
    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0
            && p.y >= 0
            && p.z >= 0
            && (p.x as usize) < self.size_x
            && (p.y as usize) < self.size_y
            && (p.z as usize) < self.size_z
    }

    /// Flat index of an in-bounds point.
    #[inline]
    pub fn index(&self, p: Point) -> Option<usize> {
        if !self.in_bounds(p) {
            return None;
        }
        Some((p.z as usize * self.size_y + p.y as usize) * self.size_x + p.x as usize)
    }

    /// Point at a flat index.
    #[inline]
    pub fn point_at(&self, idx: usize) -> Point {
        let x = idx % self.size_x;
        let y = (idx / self.size_x) % self.size_y;
        let z = idx / (self.size_x * self.size_y);
        Point::new(x as i32, y as i32, z as i32)
    }

    #[inline]
    pub fn cell(&self, p: Point) -> Option<Cell> {
        self.index(p).map(|idx| self.cells[idx])
    }

    /// Cell at a flat index obtained from [`Grid::index`].
    #[inline]
    pub fn cell_at(&self, idx: usize) -> Cell {
        self.cells[idx]
    }

    /// In bounds and not an obstacle.
    #[inline]
    pub fn is_passable(&self, p: Point) -> bool {
        matches!(self.cell(p), Some(c) if c != Cell::Obstacle)
    }

    /// All cells in z, y, x scan order.
    pub fn cells(&self) -> impl Iterator<Item = (Point, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(idx, &cell)| (self.point_at(idx), cell))
    }

    pub fn survivor_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Survivor).count()
    }

    /// Non-obstacle cells on the topmost layer, where robots are dropped in.
    pub fn top_layer_openings(&self) -> Vec<Point> {
        let z = self.size_z as i32 - 1;
        (0..self.size_y as i32)
            .flat_map(|y| (0..self.size_x as i32).map(move |x| Point::new(x, y, z)))
            .filter(|&p| self.is_passable(p))
            .collect()
    }
}

/// Map loading and construction errors.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("failed to read map: {0}")]
    Io(#[from] io::Error),
    #[error("map has no cells")]
    Empty,
    #[error("unknown cell code '{token}' on line {line}")]
    UnknownCell { line: usize, token: String },
    #[error("layer {z} row {y} does not match the first layer's shape")]
    Ragged { z: usize, y: usize },
    #[error("expected {expected} cells, got {actual}")]
    CellCount { expected: usize, actual: usize },
}
