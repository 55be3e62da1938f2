//! Origin-destination demand matrices and the masks used to select from them.
use serde::{Deserialize, Serialize};

/// Square matrix of travel demand between grid cells.
///
/// Entry `(origin, destination)` is the demand from the origin cell to the
/// destination cell, both given as linear cell indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OdMatrix {
    size: usize,
    values: Vec<f32>,
}

impl OdMatrix {
    /// All-zero matrix over `size` cells.
    #[must_use]
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    /// Builds a matrix from its rows. Returns `None` if the rows are not square.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|r| r.len() != size) {
            return None;
        }
        Some(Self {
            size,
            values: rows.into_iter().flatten().collect(),
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn get(&self, origin: usize, destination: usize) -> f32 {
        self.values[origin * self.size + destination]
    }

    pub fn set(&mut self, origin: usize, destination: usize, value: f32) {
        self.values[origin * self.size + destination] = value;
    }

    /// Demand leaving `origin`.
    #[must_use]
    pub fn row(&self, origin: usize) -> &[f32] {
        &self.values[origin * self.size..(origin + 1) * self.size]
    }

    /// Sum of every entry.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.values.iter().sum()
    }

    /// Sum of the entries selected by `mask`, or `None` if the mask covers a
    /// different OD space.
    #[must_use]
    pub fn masked_sum(&self, mask: &OdMask) -> Option<f32> {
        if mask.size != self.size {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(&mask.bits)
                .filter_map(|(v, &selected)| selected.then_some(*v))
                .sum(),
        )
    }

    pub(crate) fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Boolean selection over the OD-pair space of a grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdMask {
    size: usize,
    bits: Vec<bool>,
}

impl OdMask {
    /// Mask over `size` cells with nothing selected.
    #[must_use]
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            bits: vec![false; size * size],
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn select(&mut self, origin: usize, destination: usize) {
        self.bits[origin * self.size + destination] = true;
    }

    #[must_use]
    pub fn is_selected(&self, origin: usize, destination: usize) -> bool {
        self.bits[origin * self.size + destination]
    }

    /// Number of selected OD pairs.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}
