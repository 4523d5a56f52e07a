//! Topology of cells and inputs: both are laid out on a square 2D grid.
//!
//! A linear index `i` on a grid of side `s` sits at `(x, y) = (i % s, i / s)`.
//! Distances are euclidean in that coordinate space. The grid also provides an iterator over
//! the cells within a radius of a center cell, which local inhibition uses to find neighbors.

use super::error::{HtmError, Result};

/// A square 2D layout of `side * side` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    side: usize,
}

impl Grid {
    /// Creates the grid for `count` elements. `what` names the elements in errors.
    ///
    /// Fails when `count` is zero or not a perfect square, since the 2D mapping would silently
    /// drop or misplace elements.
    pub fn new(what: &'static str, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(HtmError::InvalidParameter {
                name: what,
                message: "count must be positive".to_string(),
            });
        }
        let side = integer_sqrt(count);
        if side * side != count {
            return Err(HtmError::NonSquare { what, count });
        }

        Ok(Self { side })
    }

    /// Length of one side of the grid.
    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Number of elements on the grid.
    #[inline]
    pub fn len(&self) -> usize {
        self.side * self.side
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.side == 0
    }

    /// Converts a linear index into `(x, y)` coordinates.
    #[inline]
    pub fn coordinates(&self, index: usize) -> (usize, usize) {
        (index % self.side, index / self.side)
    }

    /// Converts `(x, y)` coordinates back into a linear index.
    #[inline]
    pub fn index_from_coordinates(&self, x: usize, y: usize) -> usize {
        y * self.side + x
    }

    /// Coordinates of `index` as a point for distance computations.
    #[inline]
    pub fn point(&self, index: usize) -> (f32, f32) {
        let (x, y) = self.coordinates(index);
        (x as f32, y as f32)
    }

    /// Euclidean distance between two indices of this grid.
    #[inline]
    pub fn distance_between(&self, a: usize, b: usize) -> f32 {
        distance(self.point(a), self.point(b))
    }

    /// Returns an iterator over all indices whose distance to `center` is at most `radius`,
    /// excluding `center` itself. The neighborhood is clipped at the grid boundaries.
    pub fn neighborhood(&self, center: usize, radius: f32) -> Neighborhood<'_> {
        let (cx, cy) = self.coordinates(center);
        let reach = if radius.is_finite() && radius >= 0.0 {
            radius.floor() as usize
        } else {
            0
        };

        let x_bounds = (cx.saturating_sub(reach), (cx + reach + 1).min(self.side));
        let y_bounds = (cy.saturating_sub(reach), (cy + reach + 1).min(self.side));
        let current = (radius >= 0.0 && center < self.len()).then_some((x_bounds.0, y_bounds.0));

        Neighborhood {
            grid: self,
            center,
            radius,
            x_bounds,
            current,
            y_end: y_bounds.1,
        }
    }
}

/// Iterator over the indices within a radius of a center index, see [`Grid::neighborhood`].
pub struct Neighborhood<'a> {
    grid: &'a Grid,
    center: usize,
    radius: f32,
    x_bounds: (usize, usize),
    y_end: usize,
    current: Option<(usize, usize)>,
}

impl Iterator for Neighborhood<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (x, y) = self.current?;

            self.current = if x + 1 < self.x_bounds.1 {
                Some((x + 1, y))
            } else if y + 1 < self.y_end {
                Some((self.x_bounds.0, y + 1))
            } else {
                None
            };

            let index = self.grid.index_from_coordinates(x, y);
            if index != self.center && self.grid.distance_between(index, self.center) <= self.radius
            {
                return Some(index);
            }
        }
    }
}

/// The cell grid of a region together with the grid of the input it consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub cells: Grid,
    pub inputs: Grid,
}

impl Layout {
    /// Validates both counts and builds their grids.
    pub fn new(n_cells: usize, n_inputs: usize) -> Result<Self> {
        Ok(Self {
            cells: Grid::new("cell", n_cells)?,
            inputs: Grid::new("input", n_inputs)?,
        })
    }

    /// Reference distance used to scale proximal synapse probabilities.
    /// Twice the diagonal of the cell grid.
    #[inline]
    pub fn diagonal(&self) -> f32 {
        2.0 * std::f32::consts::SQRT_2 * self.cells.side() as f32
    }

    /// Distance between a cell (in cell-grid coordinates) and an input (in input-grid coordinates).
    #[inline]
    pub fn cell_to_input_distance(&self, cell: usize, input: usize) -> f32 {
        distance(self.cells.point(cell), self.inputs.point(input))
    }
}

/// Euclidean distance between two points.
#[inline]
pub fn distance(p1: (f32, f32), p2: (f32, f32)) -> f32 {
    ((p2.0 - p1.0).powi(2) + (p2.1 - p1.1).powi(2)).sqrt()
}

/// Mean of `values`, 0 for an empty slice.
#[inline]
pub fn average(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

fn integer_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}
