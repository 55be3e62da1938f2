//! Moves available while extending the line and the mask of which are legal.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::line_env::LineEnvError;
use crate::models::city::city_model::{DemandModel, Location};

/// Direction the growing end of the line moves in to place the next station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineAction {
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl LineAction {
    /// All actions, in action-index order.
    pub const VARIANTS: [LineAction; 8] = [
        Self::Up,
        Self::UpRight,
        Self::Right,
        Self::DownRight,
        Self::Down,
        Self::DownLeft,
        Self::Left,
        Self::UpLeft,
    ];

    /// `(row, col)` displacement of the move.
    #[must_use]
    pub fn value(&self) -> (i8, i8) {
        match self {
            LineAction::Up => (-1, 0),
            LineAction::UpRight => (-1, 1),
            LineAction::Right => (0, 1),
            LineAction::DownRight => (1, 1),
            LineAction::Down => (1, 0),
            LineAction::DownLeft => (1, -1),
            LineAction::Left => (0, -1),
            LineAction::UpLeft => (-1, -1),
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl TryFrom<usize> for LineAction {
    type Error = LineEnvError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::VARIANTS
            .get(index)
            .copied()
            .ok_or(LineEnvError::InvalidAction(index))
    }
}

/// Legality of each [`LineAction`], indexed like [`LineAction::VARIANTS`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMask([bool; 8]);

impl ActionMask {
    /// A move is legal if it stays on the grid and lands on a cell not yet covered.
    #[must_use]
    pub fn compute<M: DemandModel>(
        model: &M,
        location: Location,
        covered_cells: &HashSet<usize>,
    ) -> Self {
        let mut mask = [false; 8];
        for (legal, action) in mask.iter_mut().zip(LineAction::VARIANTS) {
            let candidate = location.offset(action.value());
            *legal = model
                .location_to_index(candidate)
                .is_some_and(|index| !covered_cells.contains(&index));
        }
        Self(mask)
    }

    #[must_use]
    pub fn is_legal(&self, action: LineAction) -> bool {
        self.0[action.index()]
    }

    /// No move is legal: the line is boxed in by the grid edge and itself.
    #[must_use]
    pub fn is_stranded(&self) -> bool {
        self.0.iter().all(|legal| !legal)
    }

    #[must_use]
    pub fn legal_actions(&self) -> Vec<LineAction> {
        LineAction::VARIANTS
            .into_iter()
            .filter(|a| self.is_legal(*a))
            .collect()
    }

    /// The mask as 0/1 flags.
    #[must_use]
    pub fn as_ints(&self) -> [u8; 8] {
        self.0.map(u8::from)
    }

    #[must_use]
    pub fn as_bools(&self) -> [bool; 8] {
        self.0
    }
}
