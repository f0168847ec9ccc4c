//! Spatial fragment grids.
//!
//! The world is cut into an N×N grid of square cells. Grids are rebuilt
//! from scratch whenever a query needs one; nothing here survives a tick.
//!
//! Every consumer scans cells in the same canonical order, x outer and y
//! inner, and keeps a candidate only when it is strictly better than the
//! current best. Ties therefore go to the cell with the smaller x, then
//! the smaller y.

use serde::{Deserialize, Serialize};

use crate::config::ValueWeights;
use crate::math::{Fixed, Vec2Fixed};
use crate::unit::{PlayerId, Unit, UnitId};
use crate::value::unit_value;

/// Cell coordinates in a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

impl CellIndex {
    /// Create a cell index.
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Shape of a square grid laid over the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Side length of one cell in world units.
    pub cell_side: u32,
    /// Number of cells along each axis.
    pub cells_per_side: usize,
}

impl GridGeometry {
    /// Create a grid geometry.
    #[must_use]
    pub const fn new(cell_side: u32, cells_per_side: usize) -> Self {
        Self {
            cell_side,
            cells_per_side,
        }
    }

    /// Total number of cells.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.cells_per_side * self.cells_per_side
    }

    /// Cell containing `position`, clamped into the grid.
    #[must_use]
    pub fn cell_of(&self, position: Vec2Fixed) -> CellIndex {
        CellIndex::new(self.axis_cell(position.x), self.axis_cell(position.y))
    }

    fn axis_cell(&self, coordinate: Fixed) -> usize {
        let last = self.cells_per_side.saturating_sub(1);
        let whole = coordinate.to_num::<i64>().max(0);
        let cell = whole / i64::from(self.cell_side.max(1));
        usize::try_from(cell).map_or(last, |c| c.min(last))
    }

    /// Top-left corner of a cell.
    #[must_use]
    pub fn top_left(&self, cell: CellIndex) -> Vec2Fixed {
        let side = Fixed::from_num(self.cell_side);
        Vec2Fixed::new(side * Fixed::from_num(cell.x), side * Fixed::from_num(cell.y))
    }

    /// Cell side as a square diagonal, for rectangle selections.
    #[must_use]
    pub fn cell_size(&self) -> Vec2Fixed {
        Vec2Fixed::splat(Fixed::from_num(self.cell_side))
    }

    /// The grid corner opposite the origin.
    #[must_use]
    pub const fn far_corner(&self) -> CellIndex {
        let last = self.cells_per_side.saturating_sub(1);
        CellIndex::new(last, last)
    }

    /// All cells in canonical scan order.
    pub fn cells(&self) -> impl Iterator<Item = CellIndex> {
        let n = self.cells_per_side;
        (0..n).flat_map(move |x| (0..n).map(move |y| CellIndex::new(x, y)))
    }

    const fn slot(&self, cell: CellIndex) -> usize {
        cell.x * self.cells_per_side + cell.y
    }
}

/// Aggregated statistics of one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FragmentCell {
    /// Sum of enemy positions.
    pub enemy_position_sum: Vec2Fixed,
    /// Number of enemy units.
    pub enemy_count: u32,
    /// Signed value balance: enemies positive, own units negative.
    pub balance: i32,
    /// An own unit standing in the cell, usable as a strike launcher.
    pub launcher: Option<UnitId>,
}

impl FragmentCell {
    /// Mean enemy position, if the cell holds any enemy.
    #[must_use]
    pub fn enemy_mean(&self) -> Option<Vec2Fixed> {
        (self.enemy_count > 0)
            .then(|| self.enemy_position_sum / Fixed::from_num(self.enemy_count))
    }
}

/// Value and enemy aggregation over a grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentGrid {
    geometry: GridGeometry,
    cells: Vec<FragmentCell>,
}

impl FragmentGrid {
    /// Aggregate `units` as seen by `viewer`.
    pub fn build<'a>(
        units: impl IntoIterator<Item = &'a Unit>,
        viewer: PlayerId,
        weights: &ValueWeights,
        geometry: GridGeometry,
    ) -> Self {
        let mut cells = vec![FragmentCell::default(); geometry.cell_count()];

        for unit in units {
            let slot = geometry.slot(geometry.cell_of(unit.position));
            let cell = &mut cells[slot];
            cell.balance += unit_value(unit, viewer, weights);
            if unit.is_owned_by(viewer) {
                cell.launcher = Some(unit.id);
            } else {
                cell.enemy_position_sum += unit.position;
                cell.enemy_count += 1;
            }
        }

        Self { geometry, cells }
    }

    /// Grid shape.
    #[must_use]
    pub const fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Statistics of one cell.
    #[must_use]
    pub fn cell(&self, index: CellIndex) -> &FragmentCell {
        &self.cells[self.geometry.slot(index)]
    }

    /// Cell with the strictly greatest positive balance.
    ///
    /// Falls back to the far corner, where the opponent starts, when no
    /// cell has a positive balance.
    #[must_use]
    pub fn best_cell(&self) -> CellIndex {
        let mut best = self.geometry.far_corner();
        let mut best_balance = 0;
        for index in self.geometry.cells() {
            let balance = self.cell(index).balance;
            if balance > best_balance {
                best_balance = balance;
                best = index;
            }
        }
        best
    }

    /// Point to aim at inside a cell: the enemy mean, else the top-left corner.
    #[must_use]
    pub fn target_point(&self, index: CellIndex) -> Vec2Fixed {
        self.cell(index)
            .enemy_mean()
            .unwrap_or_else(|| self.geometry.top_left(index))
    }

    /// Target point of the best cell.
    #[must_use]
    pub fn best_target(&self) -> Vec2Fixed {
        self.target_point(self.best_cell())
    }
}

/// Plain unit counts per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellCounts {
    geometry: GridGeometry,
    counts: Vec<u32>,
}

impl CellCounts {
    /// Empty counts over a grid.
    #[must_use]
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            counts: vec![0; geometry.cell_count()],
        }
    }

    /// Count every position.
    pub fn from_positions(
        geometry: GridGeometry,
        positions: impl IntoIterator<Item = Vec2Fixed>,
    ) -> Self {
        let mut counts = Self::new(geometry);
        for position in positions {
            counts.add(position);
        }
        counts
    }

    /// Count one position.
    pub fn add(&mut self, position: Vec2Fixed) {
        let slot = self.geometry.slot(self.geometry.cell_of(position));
        self.counts[slot] += 1;
    }

    /// Count in a cell.
    #[must_use]
    pub fn get(&self, index: CellIndex) -> u32 {
        self.counts[self.geometry.slot(index)]
    }

    /// Count in the cell containing `position`.
    #[must_use]
    pub fn at(&self, position: Vec2Fixed) -> u32 {
        self.get(self.geometry.cell_of(position))
    }

    /// Most populated cell, if any cell is non-empty.
    #[must_use]
    pub fn densest(&self) -> Option<(CellIndex, u32)> {
        let mut best = None;
        let mut best_count = 0;
        for index in self.geometry.cells() {
            let count = self.get(index);
            if count > best_count {
                best_count = count;
                best = Some(index);
            }
        }
        best.map(|index| (index, best_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitType;

    fn unit(id: UnitId, owner: PlayerId, x: i32, y: i32, durability: u32) -> Unit {
        Unit {
            id,
            owner,
            unit_type: UnitType::Tank,
            position: Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y)),
            durability,
            max_durability: 100,
            vision_range: Fixed::from_num(60),
        }
    }

    #[test]
    fn test_cell_of_clamps() {
        let grid = GridGeometry::new(10, 4);
        assert_eq!(grid.cell_of(Vec2Fixed::from_f64(15.0, 39.9)), CellIndex::new(1, 3));
        assert_eq!(grid.cell_of(Vec2Fixed::from_f64(-5.0, 400.0)), CellIndex::new(0, 3));
        assert_eq!(grid.top_left(CellIndex::new(2, 1)), Vec2Fixed::from_f64(20.0, 10.0));
    }

    #[test]
    fn test_scan_order_is_x_major() {
        let grid = GridGeometry::new(10, 2);
        let order: Vec<CellIndex> = grid.cells().collect();
        assert_eq!(
            order,
            vec![
                CellIndex::new(0, 0),
                CellIndex::new(0, 1),
                CellIndex::new(1, 0),
                CellIndex::new(1, 1),
            ]
        );
    }

    #[test]
    fn test_empty_grid_falls_back_to_far_corner() {
        let geometry = GridGeometry::new(10, 4);
        let grid = FragmentGrid::build([], 1, &ValueWeights::default(), geometry);
        assert_eq!(grid.best_cell(), CellIndex::new(3, 3));
        assert_eq!(grid.best_target(), Vec2Fixed::from_f64(30.0, 30.0));
    }

    #[test]
    fn test_own_units_push_balance_negative() {
        let geometry = GridGeometry::new(10, 4);
        let units = [unit(1, 1, 5, 5, 100), unit(2, 2, 6, 6, 100), unit(3, 2, 25, 5, 100)];
        let grid = FragmentGrid::build(&units, 1, &ValueWeights::default(), geometry);

        assert_eq!(grid.cell(CellIndex::new(0, 0)).balance, 0);
        assert_eq!(grid.cell(CellIndex::new(0, 0)).launcher, Some(1));
        assert_eq!(grid.cell(CellIndex::new(2, 0)).balance, 3);
        assert_eq!(grid.best_cell(), CellIndex::new(2, 0));
        assert_eq!(grid.best_target(), Vec2Fixed::from_f64(25.0, 5.0));
    }

    #[test]
    fn test_ties_keep_first_scanned_cell() {
        let geometry = GridGeometry::new(10, 4);
        // Same balance in (1, 0) and (0, 2); x-major visits (0, 2) first
        let units = [unit(1, 2, 15, 5, 100), unit(2, 2, 5, 25, 100)];
        let grid = FragmentGrid::build(&units, 1, &ValueWeights::default(), geometry);
        assert_eq!(grid.best_cell(), CellIndex::new(0, 2));
    }

    #[test]
    fn test_densest_cell() {
        let geometry = GridGeometry::new(10, 4);
        let counts = CellCounts::from_positions(
            geometry,
            [
                Vec2Fixed::from_f64(1.0, 1.0),
                Vec2Fixed::from_f64(31.0, 31.0),
                Vec2Fixed::from_f64(32.0, 35.0),
            ],
        );
        assert_eq!(counts.densest(), Some((CellIndex::new(3, 3), 2)));
        assert_eq!(counts.at(Vec2Fixed::from_f64(2.0, 2.0)), 1);
        assert_eq!(CellCounts::new(geometry).densest(), None);
    }
}
