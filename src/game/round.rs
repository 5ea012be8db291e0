//! Round Generation
//!
//! Builds one grid for a level. Only lightness separates the target from
//! the rest of the grid; hue and saturation are shared by every cell.

use serde::{Serialize, Deserialize};

use crate::core::color::Hsl;
use crate::core::rng::RandomSource;
use crate::game::difficulty::{DifficultyProfile, Shape};

/// Saturation range for base colours (percent).
pub const MIN_SATURATION: f64 = 45.0;
/// Upper saturation bound (percent).
pub const MAX_SATURATION: f64 = 85.0;
/// Lightness range for base colours (percent).
///
/// `MIN_LIGHTNESS` exceeds the largest colour delta, so `base - delta`
/// always stays a valid lightness.
pub const MIN_LIGHTNESS: f64 = 45.0;
/// Upper lightness bound (percent).
pub const MAX_LIGHTNESS: f64 = 70.0;

/// Cell identifier: 0-based index into the round.
pub type CellId = usize;

/// One tile of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    /// Index within the round
    pub id: CellId,
    /// Whether this is the differently-shaded tile
    pub is_target: bool,
    /// Tile shape (same for the whole round)
    pub shape: Shape,
    /// Tile colour
    pub color: Hsl,
}

/// One grid of cells generated for a single level attempt.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Level this round was generated for
    pub level: u32,
    /// Grid edge length
    pub size: usize,
    /// Cells in row-major order, `size * size` of them
    pub cells: Vec<GridCell>,
    /// Index of the target cell
    pub target_id: CellId,
    /// Colour shared by all non-target cells
    pub base_color: Hsl,
    /// Colour of the target cell
    pub target_color: Hsl,
}

impl Round {
    /// Look up a cell by id.
    pub fn cell(&self, id: CellId) -> Option<&GridCell> {
        self.cells.get(id)
    }

    /// Id of the target cell, found by scanning the cells.
    ///
    /// `None` only for an empty (default) round.
    pub fn find_target(&self) -> Option<CellId> {
        self.cells.iter().find(|c| c.is_target).map(|c| c.id)
    }

    /// Whether the round holds no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Lightness gap between base and target.
    pub fn delta(&self) -> f64 {
        self.base_color.lightness - self.target_color.lightness
    }
}

/// Generate a round for `level`.
///
/// Draws one hue, saturation and base lightness, darkens the target by the
/// level's colour delta, and places the target uniformly at random.
pub fn generate<R: RandomSource + ?Sized>(level: u32, rng: &mut R) -> Round {
    let profile = DifficultyProfile::for_level(level);

    let hue = rng.next_f64_range(0.0, 360.0);
    let saturation = rng.next_f64_range(MIN_SATURATION, MAX_SATURATION);
    let lightness = rng.next_f64_range(MIN_LIGHTNESS, MAX_LIGHTNESS);

    let base_color = Hsl::new(hue, saturation, lightness);
    let target_color = base_color.darkened(profile.color_delta);
    debug_assert!(target_color.is_valid(), "target colour out of range: {target_color:?}");

    let count = profile.cell_count();
    let target_id = rng.next_index(count);

    let cells = (0..count)
        .map(|id| {
            let is_target = id == target_id;
            GridCell {
                id,
                is_target,
                shape: profile.shape,
                color: if is_target { target_color } else { base_color },
            }
        })
        .collect();

    Round {
        level: profile.level,
        size: profile.grid_size,
        cells,
        target_id,
        base_color,
        target_color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::difficulty::{color_delta, grid_size, shape, COLOR_DELTA_TABLE, FIRST_SEGMENT_HEADROOM};
    use proptest::prelude::*;

    fn assert_round_invariants(round: &Round, level: u32) {
        let size = grid_size(level);
        assert_eq!(round.size, size);
        assert_eq!(round.len(), size * size);

        let targets: Vec<_> = round.cells.iter().filter(|c| c.is_target).collect();
        assert_eq!(targets.len(), 1);
        let target = targets[0];
        assert_eq!(target.id, round.target_id);

        for (index, cell) in round.cells.iter().enumerate() {
            assert_eq!(cell.id, index);
            assert_eq!(cell.shape, shape(level));
            assert!(cell.color.same_chroma(&target.color));
            if !cell.is_target {
                assert_eq!(cell.color, round.base_color);
                let gap = cell.color.lightness - target.color.lightness;
                assert!((gap - color_delta(level)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_level_one_round() {
        let mut rng = DeterministicRng::new(1);
        let round = generate(1, &mut rng);

        assert_eq!(round.level, 1);
        assert_eq!(round.len(), 4);
        assert_round_invariants(&round, 1);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut rng1 = DeterministicRng::new(99);
        let mut rng2 = DeterministicRng::new(99);

        for level in 1..50 {
            assert_eq!(generate(level, &mut rng1), generate(level, &mut rng2));
        }
    }

    #[test]
    fn test_find_target() {
        let mut rng = DeterministicRng::new(3);
        let round = generate(10, &mut rng);

        assert_eq!(round.find_target(), Some(round.target_id));
        assert_eq!(Round::default().find_target(), None);
    }

    #[test]
    fn test_target_positions_spread() {
        let mut rng = DeterministicRng::new(2024);
        let mut seen = [false; 4];

        for _ in 0..200 {
            seen[generate(1, &mut rng).target_id] = true;
        }

        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_darkest_target_stays_valid() {
        let max_delta = COLOR_DELTA_TABLE[0].1 + FIRST_SEGMENT_HEADROOM;
        assert!(MIN_LIGHTNESS - max_delta >= 0.0);
    }

    proptest! {
        #[test]
        fn prop_round_invariants(level in 1u32..200, seed in any::<u64>()) {
            let mut rng = DeterministicRng::new(seed);
            let round = generate(level, &mut rng);
            assert_round_invariants(&round, level);
            prop_assert!(round.base_color.is_valid());
            prop_assert!(round.target_color.is_valid());
            prop_assert!(round.delta() > 0.0);
        }
    }
}
