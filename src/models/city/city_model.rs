//! Contract between the line environment and whatever stores the grid and its demand.
use serde::{Deserialize, Serialize};

use super::od_matrix::{OdMask, OdMatrix};

/// Directed pair of linear cell indices `[from, to]`.
pub type Segment = [usize; 2];

/// Grid coordinate as `(row, col)`.
///
/// Signed so that a move off the edge of the grid is representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: i64,
    pub col: i64,
}

impl Location {
    #[must_use]
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// Location reached by moving `delta` rows and columns.
    #[must_use]
    pub fn offset(self, delta: (i8, i8)) -> Self {
        Self {
            row: self.row + i64::from(delta.0),
            col: self.col + i64::from(delta.1),
        }
    }
}

impl From<(i64, i64)> for Location {
    fn from((row, col): (i64, i64)) -> Self {
        Self::new(row, col)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Grid dimensions, the cell index bijection and the group demand data.
///
/// Implementors are read-only from the environment's point of view, so a
/// single model can back any number of environments through a shared reference.
pub trait DemandModel {
    fn grid_row_count(&self) -> usize;

    fn grid_col_count(&self) -> usize;

    /// Which OD pairs become connected once `segment` is part of the line.
    fn satisfied_od_mask(&self, segment: Segment) -> OdMask;

    /// One demand matrix per population group, in group order.
    fn group_od_matrices(&self) -> &[OdMatrix];

    fn grid_size(&self) -> usize {
        self.grid_row_count() * self.grid_col_count()
    }

    fn nr_groups(&self) -> usize {
        self.group_od_matrices().len()
    }

    /// Row-major linear index of `location`, or `None` if it is off the grid.
    fn location_to_index(&self, location: Location) -> Option<usize> {
        let row = usize::try_from(location.row).ok()?;
        let col = usize::try_from(location.col).ok()?;
        if row < self.grid_row_count() && col < self.grid_col_count() {
            Some(row * self.grid_col_count() + col)
        } else {
            None
        }
    }

    /// Vectorised [`DemandModel::location_to_index`].
    fn coordinate_to_index(&self, locations: &[Location]) -> Vec<Option<usize>> {
        locations
            .iter()
            .map(|l| self.location_to_index(*l))
            .collect()
    }

    /// Inverse of [`DemandModel::location_to_index`].
    fn index_to_location(&self, index: usize) -> Option<Location> {
        if index >= self.grid_size() {
            return None;
        }
        let cols = self.grid_col_count();
        let row = i64::try_from(index / cols).ok()?;
        let col = i64::try_from(index % cols).ok()?;
        Some(Location::new(row, col))
    }
}

impl<M: DemandModel + ?Sized> DemandModel for &M {
    fn grid_row_count(&self) -> usize {
        (**self).grid_row_count()
    }

    fn grid_col_count(&self) -> usize {
        (**self).grid_col_count()
    }

    fn satisfied_od_mask(&self, segment: Segment) -> OdMask {
        (**self).satisfied_od_mask(segment)
    }

    fn group_od_matrices(&self) -> &[OdMatrix] {
        (**self).group_od_matrices()
    }
}

impl<M: DemandModel + ?Sized> DemandModel for std::sync::Arc<M> {
    fn grid_row_count(&self) -> usize {
        (**self).grid_row_count()
    }

    fn grid_col_count(&self) -> usize {
        (**self).grid_col_count()
    }

    fn satisfied_od_mask(&self, segment: Segment) -> OdMask {
        (**self).satisfied_od_mask(segment)
    }

    fn group_od_matrices(&self) -> &[OdMatrix] {
        (**self).group_od_matrices()
    }
}
