//! Shared exploration record written by evaluator workers.

use std::sync::atomic::{AtomicI8, Ordering};

use crate::schema::{Cell, Grid, Point};

const UNKNOWN: i8 = -1;

/// Last-observed cell kind per coordinate, same shape as the grid.
///
/// Workers write without coordinating with each other. Each store is a
/// single relaxed atomic, so concurrent writes to one cell resolve as
/// last-writer-wins. The data is advisory and never feeds scoring.
#[derive(Debug)]
pub struct ExploredMap {
    cells: Vec<AtomicI8>,
}

impl ExploredMap {
    /// All cells unknown, sized for `grid`.
    pub fn new(grid: &Grid) -> Self {
        Self {
            cells: (0..grid.volume()).map(|_| AtomicI8::new(UNKNOWN)).collect(),
        }
    }

    /// Record an observation of the cell at flat index `idx`.
    #[inline]
    pub fn record(&self, idx: usize, cell: Cell) {
        if let Some(slot) = self.cells.get(idx) {
            slot.store(cell.code() as i8, Ordering::Relaxed);
        }
    }

    /// Observed kind of the cell at `p`, if any worker has seen it.
    pub fn observed(&self, grid: &Grid, p: Point) -> Option<Cell> {
        let idx = grid.index(p)?;
        let code = self.cells.get(idx)?.load(Ordering::Relaxed);
        u8::try_from(code).ok().and_then(Cell::from_code)
    }

    /// Number of cells observed at least once.
    pub fn known_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.load(Ordering::Relaxed) != UNKNOWN)
            .count()
    }

    /// Forget every observation.
    pub fn clear(&self) {
        for c in &self.cells {
            c.store(UNKNOWN, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_unknown() {
        let grid = Grid::filled(2, 2, 2, Cell::Free).unwrap();
        let map = ExploredMap::new(&grid);
        assert_eq!(map.known_count(), 0);
        assert_eq!(map.observed(&grid, Point::new(1, 1, 1)), None);
    }

    #[test]
    fn test_record_and_clear() {
        let grid = Grid::filled(3, 1, 1, Cell::Free).unwrap();
        let map = ExploredMap::new(&grid);
        let p = Point::new(2, 0, 0);
        map.record(grid.index(p).unwrap(), Cell::Risk);
        assert_eq!(map.observed(&grid, p), Some(Cell::Risk));
        assert_eq!(map.known_count(), 1);
        assert_eq!(map.observed(&grid, Point::new(9, 0, 0)), None);

        map.clear();
        assert_eq!(map.known_count(), 0);
    }

    #[test]
    fn test_concurrent_writers() {
        let grid = Grid::filled(16, 16, 1, Cell::Free).unwrap();
        let map = Arc::new(ExploredMap::new(&grid));
        let volume = grid.volume();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let map = Arc::clone(&map);
                std::thread::spawn(move || {
                    for idx in 0..volume {
                        map.record(idx, Cell::Survivor);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.known_count(), volume);
    }
}
