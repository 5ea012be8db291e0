//! Difficulty Curve
//!
//! Pure mapping from level to grid size, timer, shape and colour delta.
//! Every breakpoint lives in a table below; the functions only walk tables.

use std::fmt;
use serde::{Serialize, Deserialize};

// =============================================================================
// SHAPE
// =============================================================================

/// Shape drawn for every cell of a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Shape {
    /// Round tiles
    #[default]
    Circle = 0,
    /// Square tiles
    Square = 1,
    /// Triangular tiles
    Triangle = 2,
}

impl Shape {
    /// Shapes in cycling order.
    pub const CYCLE: [Shape; 3] = [Shape::Circle, Shape::Square, Shape::Triangle];

    /// Next shape in the cycle.
    pub fn next(self) -> Shape {
        Self::CYCLE[(self as usize + 1) % Self::CYCLE.len()]
    }
}

// =============================================================================
// TABLES
// =============================================================================

/// Grid edge length by level: `(max level inclusive, size)`.
pub const GRID_SIZE_TABLE: [(u32, usize); 6] = [
    (1, 2),
    (7, 3),
    (26, 4),
    (45, 5),
    (70, 6),
    (95, 7),
];

/// Grid size past the last table entry.
pub const MAX_GRID_SIZE: usize = 8;

/// Smallest grid size the table produces.
pub const MIN_GRID_SIZE: usize = 2;

/// Countdown length by level: `(max level inclusive, seconds)`.
pub const TIMER_TABLE: [(u32, u32); 5] = [
    (1, 8),
    (7, 10),
    (26, 12),
    (45, 14),
    (70, 15),
];

/// Countdown length past the last table entry.
pub const MAX_TIMER_SECONDS: u32 = 15;

/// Named shape cycles: `(max level inclusive, shape)`.
pub const SHAPE_CYCLES: [(u32, Shape); 6] = [
    (3, Shape::Circle),
    (7, Shape::Square),
    (12, Shape::Triangle),
    (18, Shape::Circle),
    (24, Shape::Square),
    (30, Shape::Triangle),
];

/// Levels spent on each shape once the named cycles run out.
pub const SHAPE_PERIOD: u32 = 5;

/// Colour delta breakpoints: `(max level inclusive, delta at that level)`.
///
/// Deltas are lightness percentage points.
pub const COLOR_DELTA_TABLE: [(u32, f64); 6] = [
    (3, 20.0),
    (7, 15.0),
    (26, 10.0),
    (45, 7.0),
    (70, 5.0),
    (95, 3.5),
];

/// Added to the first breakpoint's delta to get the level-0 starting point.
pub const FIRST_SEGMENT_HEADROOM: f64 = 5.0;

/// Per-level decay applied past the last colour breakpoint.
pub const DELTA_DECAY: f64 = 0.97;

/// Asymptotic floor for the colour delta.
pub const MIN_COLOR_DELTA: f64 = 1.0;

/// Smallest gap kept above [`MIN_COLOR_DELTA`] once the decay underflows.
pub const FLOOR_MARGIN: f64 = 1e-6;

/// Labels indexed by `grid_size - MIN_GRID_SIZE`.
const LABELS: [DifficultyLabel; 7] = [
    DifficultyLabel::Easy,
    DifficultyLabel::Medium,
    DifficultyLabel::Hard,
    DifficultyLabel::Expert,
    DifficultyLabel::Master,
    DifficultyLabel::Grandmaster,
    DifficultyLabel::Legend,
];

// =============================================================================
// CURVE
// =============================================================================

/// First entry whose max level covers `level`.
fn step_lookup<T: Copy>(table: &[(u32, T)], level: u32) -> Option<T> {
    table
        .iter()
        .find(|(max_level, _)| level <= *max_level)
        .map(|(_, value)| *value)
}

/// Grid edge length for a level (the round has `size²` cells).
pub fn grid_size(level: u32) -> usize {
    step_lookup(&GRID_SIZE_TABLE, level.max(1)).unwrap_or(MAX_GRID_SIZE)
}

/// Countdown length in seconds for a level.
pub fn timer_seconds(level: u32) -> u32 {
    step_lookup(&TIMER_TABLE, level.max(1)).unwrap_or(MAX_TIMER_SECONDS)
}

/// Shape for a level.
///
/// Follows the named cycles up to their ceiling, then keeps rotating
/// through [`Shape::CYCLE`] every [`SHAPE_PERIOD`] levels.
pub fn shape(level: u32) -> Shape {
    let level = level.max(1);
    if let Some(shape) = step_lookup(&SHAPE_CYCLES, level) {
        return shape;
    }

    let ceiling = SHAPE_CYCLES[SHAPE_CYCLES.len() - 1].0;
    let steps = (level - ceiling - 1) / SHAPE_PERIOD;
    Shape::CYCLE[steps as usize % Shape::CYCLE.len()]
}

/// Lightness difference between base and target cells for a level.
///
/// Inside the table the delta falls linearly across each segment, from the
/// previous breakpoint's delta to the current one. The first segment starts
/// from `first delta + FIRST_SEGMENT_HEADROOM` instead. Past the table the
/// distance to [`MIN_COLOR_DELTA`] shrinks by [`DELTA_DECAY`] per level and
/// always stays at least [`FLOOR_MARGIN`] above the floor.
pub fn color_delta(level: u32) -> f64 {
    let level = level.max(1);
    let mut prev_max = 0u32;

    for (i, &(max_level, delta)) in COLOR_DELTA_TABLE.iter().enumerate() {
        if level <= max_level {
            let start = if i == 0 {
                delta + FIRST_SEGMENT_HEADROOM
            } else {
                COLOR_DELTA_TABLE[i - 1].1
            };
            let span = (max_level - prev_max) as f64;
            let progress = (level - prev_max) as f64 / span;
            return start - (start - delta) * progress;
        }
        prev_max = max_level;
    }

    let (last_level, last_delta) = COLOR_DELTA_TABLE[COLOR_DELTA_TABLE.len() - 1];
    let beyond = (level - last_level).min(i32::MAX as u32) as i32;
    let decayed = MIN_COLOR_DELTA + (last_delta - MIN_COLOR_DELTA) * DELTA_DECAY.powi(beyond);
    decayed.max(MIN_COLOR_DELTA + FLOOR_MARGIN)
}

/// Difficulty label shown next to the level.
pub fn difficulty_label(level: u32) -> DifficultyLabel {
    let index = grid_size(level).saturating_sub(MIN_GRID_SIZE);
    LABELS[index.min(LABELS.len() - 1)]
}

// =============================================================================
// PROFILE
// =============================================================================

/// Human-readable difficulty tier, one per grid size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DifficultyLabel {
    /// 2x2
    Easy,
    /// 3x3
    Medium,
    /// 4x4
    Hard,
    /// 5x5
    Expert,
    /// 6x6
    Master,
    /// 7x7
    Grandmaster,
    /// 8x8
    Legend,
}

impl fmt::Display for DifficultyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DifficultyLabel::Easy => "Easy",
            DifficultyLabel::Medium => "Medium",
            DifficultyLabel::Hard => "Hard",
            DifficultyLabel::Expert => "Expert",
            DifficultyLabel::Master => "Master",
            DifficultyLabel::Grandmaster => "Grandmaster",
            DifficultyLabel::Legend => "Legend",
        };
        f.write_str(name)
    }
}

/// Everything the curve says about one level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    /// Level the profile was computed for
    pub level: u32,
    /// Grid edge length
    pub grid_size: usize,
    /// Countdown length
    pub timer_seconds: u32,
    /// Cell shape
    pub shape: Shape,
    /// Target lightness delta
    pub color_delta: f64,
    /// Display tier
    pub label: DifficultyLabel,
}

impl DifficultyProfile {
    /// Evaluate the whole curve for `level`.
    pub fn for_level(level: u32) -> Self {
        Self {
            level,
            grid_size: grid_size(level),
            timer_seconds: timer_seconds(level),
            shape: shape(level),
            color_delta: color_delta(level),
            label: difficulty_label(level),
        }
    }

    /// Number of cells in a round at this level.
    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grid_size_breakpoints() {
        assert_eq!(grid_size(1), 2);
        assert_eq!(grid_size(2), 3);
        assert_eq!(grid_size(3), 3);
        assert_eq!(grid_size(7), 3);
        assert_eq!(grid_size(8), 4);
        assert_eq!(grid_size(26), 4);
        assert_eq!(grid_size(27), 5);
        assert_eq!(grid_size(45), 5);
        assert_eq!(grid_size(46), 6);
        assert_eq!(grid_size(70), 6);
        assert_eq!(grid_size(71), 7);
        assert_eq!(grid_size(95), 7);
        assert_eq!(grid_size(96), 8);
        assert_eq!(grid_size(10_000), 8);
    }

    #[test]
    fn test_level_zero_treated_as_one() {
        assert_eq!(DifficultyProfile::for_level(0).grid_size, grid_size(1));
        assert_eq!(color_delta(0), color_delta(1));
    }

    #[test]
    fn test_timer_seconds() {
        assert_eq!(timer_seconds(1), 8);
        assert_eq!(timer_seconds(2), 10);
        assert_eq!(timer_seconds(7), 10);
        assert_eq!(timer_seconds(20), 12);
        assert_eq!(timer_seconds(70), 15);
        assert_eq!(timer_seconds(500), MAX_TIMER_SECONDS);
    }

    #[test]
    fn test_shape_named_cycles() {
        assert_eq!(shape(1), Shape::Circle);
        assert_eq!(shape(4), Shape::Square);
        assert_eq!(shape(8), Shape::Triangle);
        assert_eq!(shape(13), Shape::Circle);
        assert_eq!(shape(30), Shape::Triangle);
    }

    #[test]
    fn test_shape_cycles_past_ceiling() {
        // 31..=35 circle, 36..=40 square, 41..=45 triangle, then wraps
        assert_eq!(shape(31), Shape::Circle);
        assert_eq!(shape(35), Shape::Circle);
        assert_eq!(shape(36), Shape::Square);
        assert_eq!(shape(41), Shape::Triangle);
        assert_eq!(shape(46), Shape::Circle);
    }

    #[test]
    fn test_color_delta_segments() {
        // First segment starts from the synthesized headroom value
        let level1 = 25.0 - 5.0 / 3.0;
        assert!((color_delta(1) - level1).abs() < 1e-9);
        assert!((color_delta(3) - 20.0).abs() < 1e-9);

        // Later segments start from the previous breakpoint
        assert!((color_delta(4) - 18.75).abs() < 1e-9);
        assert!((color_delta(7) - 15.0).abs() < 1e-9);
        assert!((color_delta(95) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_color_delta_decays_past_table() {
        let at_edge = color_delta(95);
        let next = color_delta(96);
        assert!(next < at_edge);
        assert!((next - (1.0 + 2.5 * 0.97)).abs() < 1e-9);
    }

    #[test]
    fn test_color_delta_above_floor() {
        for level in (1..=5000).chain([10_000, 1_000_000, u32::MAX]) {
            let delta = color_delta(level);
            assert!(delta > MIN_COLOR_DELTA, "level {level} hit floor: {delta}");
        }
        assert_eq!(color_delta(u32::MAX), MIN_COLOR_DELTA + FLOOR_MARGIN);
    }

    #[test]
    fn test_labels_follow_grid() {
        assert_eq!(difficulty_label(1), DifficultyLabel::Easy);
        assert_eq!(difficulty_label(5), DifficultyLabel::Medium);
        assert_eq!(difficulty_label(200), DifficultyLabel::Legend);
        assert_eq!(DifficultyLabel::Grandmaster.to_string(), "Grandmaster");
    }

    #[test]
    fn test_profile_is_deterministic() {
        for level in 1..=150 {
            assert_eq!(DifficultyProfile::for_level(level), DifficultyProfile::for_level(level));
        }
    }

    proptest! {
        #[test]
        fn prop_grid_size_monotonic_and_bounded(level in 1u32..100_000) {
            let here = grid_size(level);
            let next = grid_size(level + 1);
            prop_assert!((MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&here));
            prop_assert!(next >= here);
        }

        #[test]
        fn prop_color_delta_positive_and_non_increasing(level in 1u32..u32::MAX) {
            let here = color_delta(level);
            prop_assert!(here > 0.0);
            prop_assert!(here > MIN_COLOR_DELTA);
            prop_assert!(color_delta(level + 1) <= here);
        }

        #[test]
        fn prop_timer_within_bounds(level in 1u32..100_000) {
            let seconds = timer_seconds(level);
            prop_assert!(seconds >= TIMER_TABLE[0].1);
            prop_assert!(seconds <= MAX_TIMER_SECONDS);
        }
    }
}
