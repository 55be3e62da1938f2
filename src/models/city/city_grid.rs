//! In-memory city grid holding per-group demand.
use log::debug;
use thiserror::Error;

use super::city_model::{DemandModel, Segment};
use super::od_matrix::{OdMask, OdMatrix};

type Result<T> = std::result::Result<T, CityError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CityError {
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: usize, cols: usize },
    #[error("group {group} OD matrix covers {got} cells but the grid has {expected}")]
    MatrixSizeMismatch {
        group: usize,
        expected: usize,
        got: usize,
    },
    #[error("group {group} OD matrix has a negative or non-finite entry")]
    InvalidDemand { group: usize },
    #[error("{got} group labels given for a grid of {expected} cells")]
    GroupMapSizeMismatch { expected: usize, got: usize },
}

/// A `rows x cols` grid of cells with one OD demand matrix per population group.
#[derive(Clone, Debug)]
pub struct City {
    rows: usize,
    cols: usize,
    group_od_mx: Vec<OdMatrix>,
}

impl City {
    /// Creates a city from ready-made group matrices.
    ///
    /// # Errors
    ///
    /// Returns a [`CityError`] if the grid is empty or a matrix does not
    /// match the grid or holds negative or non-finite demand.
    pub fn new(rows: usize, cols: usize, group_od_mx: Vec<OdMatrix>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(CityError::EmptyGrid { rows, cols });
        }
        let grid_size = rows * cols;
        for (group, od) in group_od_mx.iter().enumerate() {
            if od.size() != grid_size {
                return Err(CityError::MatrixSizeMismatch {
                    group,
                    expected: grid_size,
                    got: od.size(),
                });
            }
            if od.values().iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(CityError::InvalidDemand { group });
            }
        }
        debug!(
            "Built {}x{} city with {} groups",
            rows,
            cols,
            group_od_mx.len()
        );
        Ok(Self {
            rows,
            cols,
            group_od_mx,
        })
    }

    /// Splits one city-wide OD matrix into per-group matrices.
    ///
    /// `cell_groups[i]` is the group living in cell `i`. Demand is attributed
    /// to the group of its origin cell, so group `g` keeps the rows of `od`
    /// whose origin is labelled `g`. Groups are numbered `0..=max label`.
    ///
    /// # Errors
    ///
    /// Same as [`City::new`], plus [`CityError::GroupMapSizeMismatch`] if
    /// there is not exactly one label per cell.
    pub fn from_group_map(
        rows: usize,
        cols: usize,
        od: &OdMatrix,
        cell_groups: &[usize],
    ) -> Result<Self> {
        let grid_size = rows * cols;
        if cell_groups.len() != grid_size {
            return Err(CityError::GroupMapSizeMismatch {
                expected: grid_size,
                got: cell_groups.len(),
            });
        }
        if od.size() != grid_size {
            return Err(CityError::MatrixSizeMismatch {
                group: 0,
                expected: grid_size,
                got: od.size(),
            });
        }
        let nr_groups = cell_groups.iter().max().map_or(0, |g| g + 1);
        let mut group_od_mx = vec![OdMatrix::zeros(grid_size); nr_groups];
        for (origin, &group) in cell_groups.iter().enumerate() {
            for (destination, &demand) in od.row(origin).iter().enumerate() {
                group_od_mx[group].set(origin, destination, demand);
            }
        }
        Self::new(rows, cols, group_od_mx)
    }
}

impl DemandModel for City {
    fn grid_row_count(&self) -> usize {
        self.rows
    }

    fn grid_col_count(&self) -> usize {
        self.cols
    }

    /// Every ordered pair of distinct cells on the segment is connected.
    fn satisfied_od_mask(&self, segment: Segment) -> OdMask {
        let grid_size = self.grid_size();
        let mut mask = OdMask::empty(grid_size);
        for &origin in &segment {
            for &destination in &segment {
                if origin != destination && origin < grid_size && destination < grid_size {
                    mask.select(origin, destination);
                }
            }
        }
        mask
    }

    fn group_od_matrices(&self) -> &[OdMatrix] {
        &self.group_od_mx
    }
}
