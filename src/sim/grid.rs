//! Image matrix: cell/world mapping and the learner's guess mask

use std::collections::BTreeSet;

use glam::Vec2;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Ground-truth occupancy, indexed `[(row, col)]` with row = y, col = x
pub type OccupancyGrid = Array2<bool>;

/// A grid cell as `(row, col)`
pub type Cell = (usize, usize);

/// Affine mapping between grid cells and world coordinates.
///
/// The grid is a square of `grid_size * pixel_size` centered on `center`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMapper {
    pub grid_size: usize,
    pub center: Vec2,
    pub pixel_size: f32,
}

impl GridMapper {
    pub fn new(grid_size: usize, center: Vec2, pixel_size: f32) -> Self {
        Self {
            grid_size,
            center,
            pixel_size,
        }
    }

    /// Side length of the grid in world units
    #[inline]
    pub fn total_size(&self) -> f32 {
        self.grid_size as f32 * self.pixel_size
    }

    #[inline]
    pub fn top_left(&self) -> Vec2 {
        self.center - Vec2::splat(self.total_size() / 2.0)
    }

    /// World position of the center of cell `(row, col)`
    pub fn pixel_to_world(&self, row: usize, col: usize) -> Vec2 {
        let half = self.pixel_size / 2.0;
        self.top_left()
            + Vec2::new(
                col as f32 * self.pixel_size + half,
                row as f32 * self.pixel_size + half,
            )
    }

    /// Cell containing a world point, or `None` outside the grid square
    pub fn world_to_pixel(&self, point: Vec2) -> Option<Cell> {
        if self.grid_size == 0 || self.pixel_size <= 0.0 {
            return None;
        }
        let rel = point - self.top_left();
        let total = self.total_size();
        if rel.x < 0.0 || rel.x >= total || rel.y < 0.0 || rel.y >= total {
            return None;
        }

        let last = self.grid_size - 1;
        let col = ((rel.x / self.pixel_size) as usize).min(last);
        let row = ((rel.y / self.pixel_size) as usize).min(last);
        Some((row, col))
    }

    pub fn contains_world(&self, point: Vec2) -> bool {
        self.world_to_pixel(point).is_some()
    }

    /// Bounding square as (top-left, side length)
    pub fn bounds(&self) -> (Vec2, f32) {
        (self.top_left(), self.total_size())
    }
}

/// Cells the learner has marked. Iterates in row-major order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessMask {
    cells: BTreeSet<Cell>,
}

impl GuessMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, row: usize, col: usize) {
        self.cells.insert((row, col));
    }

    pub fn remove(&mut self, row: usize, col: usize) {
        self.cells.remove(&(row, col));
    }

    /// Returns true if the cell was added, false if it was removed
    pub fn toggle(&mut self, row: usize, col: usize) -> bool {
        if self.cells.remove(&(row, col)) {
            false
        } else {
            self.cells.insert((row, col));
            true
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.cells.contains(&(row, col))
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells.iter().copied()
    }

    /// Rasterize into a `grid_size` mask, dropping out-of-range cells
    pub fn to_mask(&self, grid_size: usize) -> OccupancyGrid {
        let mut mask = Array2::from_elem((grid_size, grid_size), false);
        for (row, col) in self.iter() {
            if let Some(cell) = mask.get_mut((row, col)) {
                *cell = true;
            }
        }
        mask
    }

    /// Replace the contents with the True cells of `mask`
    pub fn set_from_mask(&mut self, mask: &OccupancyGrid) {
        self.cells = cells_of(mask).into_iter().collect();
    }
}

impl FromIterator<Cell> for GuessMask {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Row-major list of True cells
pub fn cells_of(mask: &OccupancyGrid) -> Vec<Cell> {
    mask.indexed_iter()
        .filter(|(_, v)| **v)
        .map(|(idx, _)| idx)
        .collect()
}
