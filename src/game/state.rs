//! Game State Definitions
//!
//! `GameState` is owned by the session and mutated only under its gate.
//! The functions here are the state transforms applied under that gate;
//! they never block, spawn, or emit anything themselves.

use serde::{Serialize, Deserialize};

use crate::game::round::{CellId, Round};

/// Lives at the start of a session unless configured otherwise.
pub const DEFAULT_MAX_LIVES: u32 = 3;

// =============================================================================
// OUTCOME
// =============================================================================

/// Why a round stopped, or where the session is waiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Player tapped a non-target cell
    Wrong,
    /// Countdown ran out
    Timeout,
    /// Session finished
    GameOver,
    /// Extra time declined, waiting for continue
    OfferContinue,
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Authoritative session state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Current round
    pub grid: Round,
    /// Accumulated score
    pub score: u32,
    /// Current level (1-based)
    pub level: u32,
    /// Remaining lives
    pub lives: u32,
    /// Seconds left on the countdown
    pub time_remaining: u32,
    /// Whether taps are accepted
    pub is_game_active: bool,
    /// Pending result shown to the player, if any
    pub game_result: Option<Outcome>,
    /// Extra time is once per session
    pub has_used_extra_time: bool,
    /// What ended the last session
    pub last_ending_reason: Option<Outcome>,
    /// Target revealed at game over
    pub reveal_target_id: Option<CellId>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            grid: Round::default(),
            score: 0,
            level: 1,
            lives: DEFAULT_MAX_LIVES,
            time_remaining: 0,
            is_game_active: false,
            game_result: None,
            has_used_extra_time: false,
            last_ending_reason: None,
            reveal_target_id: None,
        }
    }
}

impl GameState {
    /// Whether the session reached game over.
    #[inline]
    pub fn is_over(&self) -> bool {
        self.game_result == Some(Outcome::GameOver)
    }

    /// Fresh session state on level 1.
    pub fn begin_session(&mut self, round: Round, max_lives: u32, seconds: u32) {
        *self = Self {
            grid: round,
            lives: max_lives,
            time_remaining: seconds,
            is_game_active: true,
            ..Self::default()
        };
    }

    /// Install a new round for the current level and reactivate.
    pub fn begin_round(&mut self, round: Round, seconds: u32) {
        self.grid = round;
        self.time_remaining = seconds;
        self.is_game_active = true;
        self.game_result = None;
        self.reveal_target_id = None;
    }
}

// =============================================================================
// TRANSFORMS
// =============================================================================

/// Result of resolving a tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapResolution {
    /// Rejected by the debounce window
    Debounced,
    /// Session not accepting taps
    Inactive,
    /// Id not in the current grid
    NotFound,
    /// Target found
    Correct {
        /// Tapped cell
        cell: CellId,
        /// Points awarded
        points: u32,
        /// Score after the tap
        score: u32,
        /// Level after the tap
        level: u32,
    },
    /// Wrong cell
    Incorrect {
        /// Tapped cell
        cell: CellId,
    },
}

/// Resolve a tap against the current grid.
///
/// On a match the round is deactivated in the same step, so whichever of
/// tap or timeout reaches the gate second sees `is_game_active == false`.
pub fn resolve_tap(state: &mut GameState, cell: CellId, points_per_level: u32) -> TapResolution {
    if !state.is_game_active {
        return TapResolution::Inactive;
    }

    let Some(tapped) = state.grid.cell(cell) else {
        return TapResolution::NotFound;
    };
    let is_target = tapped.is_target;

    state.is_game_active = false;

    if is_target {
        let points = points_per_level.saturating_mul(state.level);
        state.score = state.score.saturating_add(points);
        state.level += 1;
        TapResolution::Correct {
            cell,
            points,
            score: state.score,
            level: state.level,
        }
    } else {
        TapResolution::Incorrect { cell }
    }
}

/// Result of losing a life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifeLoss {
    /// Session continues with this many lives
    Continues {
        /// Lives left
        lives: u32,
    },
    /// Session must end; state untouched, caller finalizes
    Ends,
}

/// Take a life for `reason`.
///
/// Ends the session when lives would drop below zero, or reach exactly zero
/// on a wrong tap. A timeout that leaves zero lives keeps the session alive
/// so extra time can still be offered.
pub fn apply_life_loss(state: &mut GameState, reason: Outcome) -> LifeLoss {
    let lives = match state.lives.checked_sub(1) {
        None => return LifeLoss::Ends,
        Some(0) if reason == Outcome::Wrong => return LifeLoss::Ends,
        Some(lives) => lives,
    };

    state.lives = lives;
    state.game_result = Some(reason);
    state.is_game_active = false;
    if reason == Outcome::Timeout {
        state.time_remaining = 0;
    }

    LifeLoss::Continues { lives }
}

/// Grant extra time after a timeout. Returns false if not allowed.
///
/// The check and the set happen in one call, so two back-to-back requests
/// under the gate only grant once.
pub fn grant_extra_time(state: &mut GameState, seconds: u32) -> bool {
    if state.game_result != Some(Outcome::Timeout) || state.has_used_extra_time {
        return false;
    }

    state.lives += 1;
    state.has_used_extra_time = true;
    state.is_game_active = true;
    state.game_result = None;
    state.time_remaining = seconds;
    true
}

/// Resume play on the current grid after a lost life. Returns false if not allowed.
pub fn resume_after_loss(state: &mut GameState, seconds: u32) -> bool {
    let waiting = matches!(
        state.game_result,
        Some(Outcome::Wrong | Outcome::Timeout | Outcome::OfferContinue)
    );
    if state.is_game_active || state.lives == 0 || !waiting {
        return false;
    }

    state.game_result = None;
    state.is_game_active = true;
    state.time_remaining = seconds;
    true
}

/// Result of declining extra time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decline {
    /// No lives left; caller ends the session
    Ends,
    /// Now offering a plain continue
    OfferContinue,
    /// Nothing to decline
    Ignored,
}

/// Decline the extra-time offer.
pub fn decline_extra_time(state: &mut GameState) -> Decline {
    if state.is_game_active || state.is_over() || state.game_result.is_none() {
        return Decline::Ignored;
    }

    if state.lives == 0 {
        Decline::Ends
    } else {
        state.game_result = Some(Outcome::OfferContinue);
        Decline::OfferContinue
    }
}

/// Write the terminal state and return the target to reveal.
///
/// `None` means the grid had no target; the caller skips the reveal.
pub fn finalize_game_over(state: &mut GameState, reason: Outcome) -> Option<CellId> {
    let target = state.grid.find_target();

    state.lives = 0;
    state.time_remaining = 0;
    state.is_game_active = false;
    state.game_result = Some(Outcome::GameOver);
    state.last_ending_reason = Some(reason);
    state.reveal_target_id = target;

    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::round::generate;

    fn active_state() -> GameState {
        let mut rng = DeterministicRng::new(7);
        let mut state = GameState::default();
        state.begin_session(generate(1, &mut rng), DEFAULT_MAX_LIVES, 8);
        state
    }

    fn wrong_cell(state: &GameState) -> CellId {
        (state.grid.target_id + 1) % state.grid.len()
    }

    #[test]
    fn test_begin_session() {
        let state = active_state();
        assert!(state.is_game_active);
        assert_eq!(state.level, 1);
        assert_eq!(state.score, 0);
        assert_eq!(state.lives, 3);
        assert_eq!(state.time_remaining, 8);
        assert_eq!(state.grid.len(), 4);
    }

    #[test]
    fn test_correct_tap_scores_by_level() {
        let mut state = active_state();
        let target = state.grid.target_id;

        let resolution = resolve_tap(&mut state, target, 10);
        assert_eq!(
            resolution,
            TapResolution::Correct { cell: target, points: 10, score: 10, level: 2 }
        );
        assert!(!state.is_game_active);

        // Second tap on the same round is ignored
        assert_eq!(resolve_tap(&mut state, target, 10), TapResolution::Inactive);
        assert_eq!(state.score, 10);
    }

    #[test]
    fn test_score_uses_level_before_increment() {
        let mut state = active_state();
        state.level = 4;
        let target = state.grid.target_id;

        resolve_tap(&mut state, target, 10);
        assert_eq!(state.score, 40);
        assert_eq!(state.level, 5);
    }

    #[test]
    fn test_incorrect_and_unknown_taps() {
        let mut state = active_state();

        assert_eq!(resolve_tap(&mut state, 999, 10), TapResolution::NotFound);
        assert!(state.is_game_active);

        let wrong = wrong_cell(&state);
        assert_eq!(resolve_tap(&mut state, wrong, 10), TapResolution::Incorrect { cell: wrong });
        assert!(!state.is_game_active);
        assert_eq!(state.lives, 3);
    }

    #[test]
    fn test_three_wrongs_end_the_session() {
        let mut state = active_state();

        assert_eq!(apply_life_loss(&mut state, Outcome::Wrong), LifeLoss::Continues { lives: 2 });
        assert_eq!(state.game_result, Some(Outcome::Wrong));
        assert!(resume_after_loss(&mut state, 8));

        assert_eq!(apply_life_loss(&mut state, Outcome::Wrong), LifeLoss::Continues { lives: 1 });
        assert!(resume_after_loss(&mut state, 8));

        assert_eq!(apply_life_loss(&mut state, Outcome::Wrong), LifeLoss::Ends);
    }

    #[test]
    fn test_timeout_at_last_life_keeps_session() {
        let mut state = active_state();
        state.lives = 1;
        state.time_remaining = 2;

        assert_eq!(apply_life_loss(&mut state, Outcome::Timeout), LifeLoss::Continues { lives: 0 });
        assert_eq!(state.time_remaining, 0);
        assert_eq!(state.game_result, Some(Outcome::Timeout));

        // No lives, so continue is refused but extra time is not
        assert!(!resume_after_loss(&mut state, 8));
        assert!(grant_extra_time(&mut state, 5));
        assert_eq!(state.lives, 1);
    }

    #[test]
    fn test_life_loss_from_zero_ends() {
        let mut state = active_state();
        state.lives = 0;
        assert_eq!(apply_life_loss(&mut state, Outcome::Timeout), LifeLoss::Ends);
    }

    #[test]
    fn test_extra_time_only_once() {
        let mut state = active_state();
        apply_life_loss(&mut state, Outcome::Timeout);
        let lives = state.lives;

        assert!(grant_extra_time(&mut state, 5));
        assert!(!grant_extra_time(&mut state, 5));

        assert_eq!(state.lives, lives + 1);
        assert!(state.has_used_extra_time);
        assert!(state.is_game_active);
        assert_eq!(state.game_result, None);
        assert_eq!(state.time_remaining, 5);

        // A later timeout does not get a second grant
        apply_life_loss(&mut state, Outcome::Timeout);
        assert!(!grant_extra_time(&mut state, 5));
    }

    #[test]
    fn test_extra_time_requires_timeout() {
        let mut state = active_state();
        apply_life_loss(&mut state, Outcome::Wrong);
        assert!(!grant_extra_time(&mut state, 5));
    }

    #[test]
    fn test_decline_extra_time() {
        let mut state = active_state();
        assert_eq!(decline_extra_time(&mut state), Decline::Ignored);

        apply_life_loss(&mut state, Outcome::Timeout);
        assert_eq!(decline_extra_time(&mut state), Decline::OfferContinue);
        assert_eq!(state.game_result, Some(Outcome::OfferContinue));
        assert!(resume_after_loss(&mut state, 8));

        state.lives = 1;
        apply_life_loss(&mut state, Outcome::Timeout);
        assert_eq!(decline_extra_time(&mut state), Decline::Ends);
    }

    #[test]
    fn test_finalize_game_over() {
        let mut state = active_state();
        state.score = 120;
        let target = state.grid.target_id;

        assert_eq!(finalize_game_over(&mut state, Outcome::Wrong), Some(target));
        assert!(state.is_over());
        assert_eq!(state.lives, 0);
        assert_eq!(state.time_remaining, 0);
        assert!(!state.is_game_active);
        assert_eq!(state.last_ending_reason, Some(Outcome::Wrong));
        assert_eq!(state.reveal_target_id, Some(target));
        assert_eq!(state.score, 120);

        // Nothing restarts a finished session
        assert!(!resume_after_loss(&mut state, 8));
        assert!(!grant_extra_time(&mut state, 5));
        assert_eq!(resolve_tap(&mut state, target, 10), TapResolution::Inactive);
    }

    #[test]
    fn test_finalize_without_target() {
        let mut state = GameState::default();
        assert_eq!(finalize_game_over(&mut state, Outcome::GameOver), None);
        assert_eq!(state.reveal_target_id, None);
        assert!(state.is_over());
    }
}
