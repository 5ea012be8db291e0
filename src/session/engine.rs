//! Game Session
//!
//! Owns the authoritative [`GameState`] behind a single async mutex (the
//! gate). Player commands and countdown signals both go through the gate:
//! each acquires it, applies one transform from `game::state`, publishes
//! the new state, and releases it before any persistence call or timed
//! wait. Command events are emitted after release. Countdown alerts and
//! game-over events are emitted with the gate held, which never blocks
//! because a broadcast send does not wait.
//!
//! ```text
//!   UI commands ──► GameSession ──┐
//!                                 ├──► gate(SessionCore) ──► watch<GameState>
//!   CountdownTimer ─► pump task ──┘            │
//!                                              └──► EventChannel ──► UI / audio
//! ```
//!
//! Delayed steps (round advance, wrong-tap life loss, game-over reveal)
//! run in spawned tasks that re-enter the gate when their delay ends and
//! check a token or epoch first, so a reset or restart in the meantime
//! turns them into no-ops.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::core::rng::{derive_session_seed, DeterministicRng, RandomSource};
use crate::game::difficulty::timer_seconds;
use crate::game::events::{EventChannel, GameUiEvent};
use crate::game::round::{generate, CellId};
use crate::game::state::{
    apply_life_loss, decline_extra_time, finalize_game_over, grant_extra_time,
    resolve_tap, resume_after_loss, Decline, GameState, LifeLoss, Outcome, TapResolution,
};
use crate::game::timer::{CountdownTimer, TimerEvent, TimerSignal, TimerState};
use crate::session::config::{ConfigError, SessionConfig};
use crate::session::debounce::TapDebouncer;
use crate::session::store::{ProgressStore, StoreError};

/// Unique session identifier.
pub type SessionId = Uuid;

/// Whether a command changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Command applied.
    Applied,
    /// Guard rejected the command; state unchanged.
    Ignored,
}

/// Delayed step waiting to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowUp {
    /// Build the next round after a correct tap.
    Advance,
    /// Take a life after a wrong tap.
    LifeLoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    kind: FollowUp,
    token: u64,
}

/// Game-over work left after the terminal state is written.
#[derive(Debug, Clone, Copy)]
struct EndSequence {
    epoch: u64,
    target: Option<CellId>,
    score: u32,
    level: u32,
}

/// Everything guarded by the gate.
struct SessionCore {
    state: GameState,
    timer: CountdownTimer,
    rng: Box<dyn RandomSource>,
    pending: Option<Pending>,
    next_token: u64,
    /// Bumped by start, reset and game over.
    epoch: u64,
}

impl SessionCore {
    fn schedule(&mut self, kind: FollowUp) -> u64 {
        self.next_token += 1;
        self.pending = Some(Pending { kind, token: self.next_token });
        self.next_token
    }

    /// Consume the pending step if it is still `kind`/`token`.
    fn take_pending(&mut self, kind: FollowUp, token: u64) -> bool {
        if self.pending == Some(Pending { kind, token }) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Invalidate every outstanding follow-up and stop the countdown.
    fn interrupt(&mut self) {
        self.timer.cancel();
        self.pending = None;
        self.epoch += 1;
    }
}

struct Shared {
    id: SessionId,
    seed: Option<u64>,
    config: SessionConfig,
    gate: Mutex<SessionCore>,
    debouncer: TapDebouncer,
    state_tx: watch::Sender<GameState>,
    events: EventChannel,
    store: Arc<dyn ProgressStore>,
}

/// Handle to a single-player game session.
///
/// Cheap to clone; all clones drive the same session. Must be created
/// inside a tokio runtime.
#[derive(Clone)]
pub struct GameSession {
    shared: Arc<Shared>,
}

impl GameSession {
    /// Create a session seeded from a fresh id and the wall clock.
    pub fn new(config: SessionConfig, store: Arc<dyn ProgressStore>) -> Result<Self, ConfigError> {
        let id = Uuid::new_v4();
        let entropy = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
        let seed = derive_session_seed(&id, entropy);
        Self::build(id, config, Box::new(DeterministicRng::new(seed)), Some(seed), store)
    }

    /// Create a session whose rounds are fully determined by `seed`.
    pub fn with_seed(
        config: SessionConfig,
        seed: u64,
        store: Arc<dyn ProgressStore>,
    ) -> Result<Self, ConfigError> {
        Self::build(Uuid::new_v4(), config, Box::new(DeterministicRng::new(seed)), Some(seed), store)
    }

    /// Create a session drawing from an injected random source.
    pub fn with_rng<R>(
        config: SessionConfig,
        rng: R,
        store: Arc<dyn ProgressStore>,
    ) -> Result<Self, ConfigError>
    where
        R: RandomSource + 'static,
    {
        Self::build(Uuid::new_v4(), config, Box::new(rng), None, store)
    }

    /// Fails if `config` does not pass [`SessionConfig::validate`].
    fn build(
        id: SessionId,
        config: SessionConfig,
        rng: Box<dyn RandomSource>,
        seed: Option<u64>,
        store: Arc<dyn ProgressStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let (timer, timer_rx) = CountdownTimer::new(config.tick_period());
        let (state_tx, _) = watch::channel(GameState::default());

        let shared = Arc::new(Shared {
            id,
            seed,
            debouncer: TapDebouncer::new(Duration::from_millis(config.debounce_ms)),
            events: EventChannel::new(config.event_capacity),
            config,
            gate: Mutex::new(SessionCore {
                state: GameState::default(),
                timer,
                rng,
                pending: None,
                next_token: 0,
                epoch: 0,
            }),
            state_tx,
            store,
        });

        tokio::spawn(pump_timer(Arc::downgrade(&shared), timer_rx));
        debug!(session = %id, ?seed, "session created");

        Ok(Self { shared })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Session identifier.
    pub fn session_id(&self) -> SessionId {
        self.shared.id
    }

    /// Seed of the built-in generator, `None` for injected sources.
    pub fn seed(&self) -> Option<u64> {
        self.shared.seed
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Latest published state.
    pub fn snapshot(&self) -> GameState {
        self.shared.state_tx.borrow().clone()
    }

    /// State stream; the receiver starts at the latest value.
    pub fn subscribe_state(&self) -> watch::Receiver<GameState> {
        self.shared.state_tx.subscribe()
    }

    /// UI event stream. Only events emitted after subscribing are seen.
    pub fn subscribe_events(&self) -> broadcast::Receiver<GameUiEvent> {
        self.shared.events.subscribe()
    }

    /// Lifecycle of the current countdown.
    pub async fn timer_state(&self) -> TimerState {
        self.shared.gate.lock().await.timer.state()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Start a new session on level 1.
    #[instrument(skip(self), fields(session = %self.shared.id))]
    pub async fn start_game(&self) -> CommandOutcome {
        let config = &self.shared.config;
        {
            let mut core = self.shared.gate.lock().await;
            core.interrupt();

            let round = generate(1, &mut core.rng);
            let seconds = timer_seconds(1);
            core.state.begin_session(round, config.max_lives, seconds);
            core.timer.start(seconds);
            self.shared.publish(&core);
        }

        self.shared.debouncer.reset();
        info!(lives = config.max_lives, "game started");
        self.shared.best_effort("games played", self.shared.store.increment_games_played());
        CommandOutcome::Applied
    }

    /// Tap the cell with `cell` id.
    #[instrument(skip(self), fields(session = %self.shared.id))]
    pub async fn tap(&self, cell: CellId) -> TapResolution {
        if !self.shared.debouncer.try_accept() {
            debug!("tap debounced");
            return TapResolution::Debounced;
        }

        let (resolution, token) = {
            let mut core = self.shared.gate.lock().await;
            let resolution = resolve_tap(&mut core.state, cell, self.shared.config.points_per_level);

            let token = match resolution {
                TapResolution::Correct { .. } => {
                    core.timer.cancel();
                    Some(core.schedule(FollowUp::Advance))
                }
                TapResolution::Incorrect { .. } => {
                    core.timer.cancel();
                    Some(core.schedule(FollowUp::LifeLoss))
                }
                TapResolution::NotFound => {
                    // Unknown id: keep playing on a fresh countdown
                    let seconds = timer_seconds(core.state.level);
                    core.state.time_remaining = seconds;
                    core.timer.start(seconds);
                    None
                }
                TapResolution::Inactive | TapResolution::Debounced => None,
            };

            if resolution != TapResolution::Inactive {
                self.shared.publish(&core);
            }
            (resolution, token)
        };

        match (resolution, token) {
            (TapResolution::Correct { cell, points, score, level }, Some(token)) => {
                info!(cell, points, score, level, "correct tap");
                self.shared.events.emit(GameUiEvent::CorrectTap(cell));
                self.shared.best_effort("correct answers", self.shared.store.increment_correct_answers());
                self.shared
                    .spawn_follow_up(FollowUp::Advance, token, self.shared.config.round_advance_delay());
            }
            (TapResolution::Incorrect { cell }, Some(token)) => {
                debug!(cell, "incorrect tap");
                self.shared.events.emit(GameUiEvent::IncorrectTap(cell));
                self.shared
                    .spawn_follow_up(FollowUp::LifeLoss, token, self.shared.config.incorrect_delay());
            }
            (TapResolution::NotFound, _) => warn!(cell, "tap on unknown cell, countdown restarted"),
            _ => debug!(?resolution, "tap ignored"),
        }

        resolution
    }

    /// Build the next round right away instead of waiting out the grid-hide
    /// delay. Only valid between a correct tap and its round advance.
    #[instrument(skip(self), fields(session = %self.shared.id))]
    pub async fn next_level(&self) -> CommandOutcome {
        let mut core = self.shared.gate.lock().await;
        let Some(Pending { kind: FollowUp::Advance, token }) = core.pending else {
            debug!("next level ignored, no round to advance");
            return CommandOutcome::Ignored;
        };

        core.take_pending(FollowUp::Advance, token);
        self.shared.advance_round(&mut core);
        CommandOutcome::Applied
    }

    /// Spend the one-time extra time after a timeout.
    #[instrument(skip(self), fields(session = %self.shared.id))]
    pub async fn use_extra_time(&self) -> CommandOutcome {
        let seconds = self.shared.config.extra_time_seconds;
        let mut core = self.shared.gate.lock().await;

        if !grant_extra_time(&mut core.state, seconds) {
            debug!("extra time ignored");
            return CommandOutcome::Ignored;
        }

        core.timer.start(seconds);
        self.shared.publish(&core);
        info!(lives = core.state.lives, seconds, "extra time granted");
        CommandOutcome::Applied
    }

    /// Turn down extra time; ends the session if no lives are left.
    #[instrument(skip(self), fields(session = %self.shared.id))]
    pub async fn decline_extra_time(&self) -> CommandOutcome {
        let sequence = {
            let mut core = self.shared.gate.lock().await;
            let reason = core.state.game_result.unwrap_or(Outcome::GameOver);

            match decline_extra_time(&mut core.state) {
                Decline::Ignored => {
                    debug!("decline ignored");
                    return CommandOutcome::Ignored;
                }
                Decline::OfferContinue => {
                    self.shared.publish(&core);
                    None
                }
                Decline::Ends => Some(self.shared.finish(&mut core, reason)),
            }
        };

        if let Some(sequence) = sequence {
            self.shared.spawn_end_sequence(sequence);
        }
        CommandOutcome::Applied
    }

    /// Resume on the current grid after losing a life.
    #[instrument(skip(self), fields(session = %self.shared.id))]
    pub async fn continue_after_life_loss(&self) -> CommandOutcome {
        let mut core = self.shared.gate.lock().await;
        let seconds = timer_seconds(core.state.level);

        if !resume_after_loss(&mut core.state, seconds) {
            debug!("continue ignored");
            return CommandOutcome::Ignored;
        }

        core.timer.start(seconds);
        self.shared.publish(&core);
        debug!(lives = core.state.lives, seconds, "continued after life loss");
        CommandOutcome::Applied
    }

    /// End the session now: reveal the target, then announce game over.
    #[instrument(skip(self), fields(session = %self.shared.id))]
    pub async fn end_game(&self) -> CommandOutcome {
        let sequence = {
            let mut core = self.shared.gate.lock().await;
            if core.state.is_over() {
                debug!("end ignored, already over");
                return CommandOutcome::Ignored;
            }
            let reason = core.state.game_result.unwrap_or(Outcome::GameOver);
            self.shared.finish(&mut core, reason)
        };

        self.shared.spawn_end_sequence(sequence);
        CommandOutcome::Applied
    }

    /// Drop everything and return to the empty state.
    #[instrument(skip(self), fields(session = %self.shared.id))]
    pub async fn reset_game(&self) -> CommandOutcome {
        {
            let mut core = self.shared.gate.lock().await;
            core.interrupt();
            core.state = GameState::default();
            self.shared.publish(&core);
        }

        self.shared.debouncer.reset();
        debug!("session reset");
        CommandOutcome::Applied
    }
}

impl Shared {
    /// Publish the state. Called with the gate held so subscribers see
    /// states in mutation order.
    fn publish(&self, core: &SessionCore) {
        self.state_tx.send_replace(core.state.clone());
    }

    /// Generate and activate a round for the current level.
    fn advance_round(&self, core: &mut SessionCore) {
        let level = core.state.level;
        let round = generate(level, &mut core.rng);
        let seconds = timer_seconds(level);

        core.state.begin_round(round, seconds);
        core.timer.start(seconds);
        self.publish(core);
        debug!(level, size = core.state.grid.size, seconds, "round started");
    }

    /// Take a life; returns the end sequence if that ended the session.
    fn lose_life(&self, core: &mut SessionCore, reason: Outcome) -> Option<EndSequence> {
        match apply_life_loss(&mut core.state, reason) {
            LifeLoss::Continues { lives } => {
                self.publish(core);
                info!(?reason, lives, "life lost");
                None
            }
            LifeLoss::Ends => Some(self.finish(core, reason)),
        }
    }

    /// Write the terminal state. The reveal and announcement follow in
    /// [`Shared::run_end_sequence`].
    fn finish(&self, core: &mut SessionCore, reason: Outcome) -> EndSequence {
        core.interrupt();
        let target = finalize_game_over(&mut core.state, reason);
        self.publish(core);

        info!(?reason, score = core.state.score, level = core.state.level, "game over");
        EndSequence {
            epoch: core.epoch,
            target,
            score: core.state.score,
            level: core.state.level,
        }
    }

    fn spawn_follow_up(self: &Arc<Self>, kind: FollowUp, token: u64, delay: Duration) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            sleep(delay).await;
            shared.run_follow_up(kind, token).await;
        });
    }

    async fn run_follow_up(self: &Arc<Self>, kind: FollowUp, token: u64) {
        let sequence = {
            let mut core = self.gate.lock().await;
            if !core.take_pending(kind, token) {
                trace!(?kind, token, "follow-up superseded");
                return;
            }

            match kind {
                FollowUp::Advance => {
                    self.advance_round(&mut core);
                    None
                }
                FollowUp::LifeLoss => self.lose_life(&mut core, Outcome::Wrong),
            }
        };

        if let Some(sequence) = sequence {
            self.spawn_end_sequence(sequence);
        }
    }

    fn spawn_end_sequence(self: &Arc<Self>, sequence: EndSequence) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.run_end_sequence(sequence).await;
        });
    }

    /// Reveal, hold, announce. Each emission is dropped once a start or
    /// reset has moved the session past `sequence.epoch`.
    async fn run_end_sequence(&self, sequence: EndSequence) {
        // The finished game's result stands even if a new one has begun
        self.record_final_progress(sequence.score, sequence.level);

        let hold = match sequence.target {
            Some(target) => {
                if !self.emit_in_epoch(sequence.epoch, GameUiEvent::RevealAnswer(target)).await {
                    trace!("reveal superseded");
                    return;
                }
                self.config.reveal_pause() + self.config.reveal_hold()
            }
            None => {
                warn!("no target cell to reveal");
                self.config.no_reveal_delay()
            }
        };
        sleep(hold).await;

        if !self.emit_in_epoch(sequence.epoch, GameUiEvent::GameOver).await {
            trace!("game over announcement superseded");
        }
    }

    /// Emit `event` under the gate if the session is still in `epoch`.
    async fn emit_in_epoch(&self, epoch: u64, event: GameUiEvent) -> bool {
        let core = self.gate.lock().await;
        if core.epoch != epoch {
            return false;
        }
        self.events.emit(event);
        true
    }

    /// Raise the stored bests if this session beat them.
    fn record_final_progress(&self, score: u32, level: u32) {
        if let Some(best) = self.best_effort("high score", self.store.high_score()) {
            if score > best {
                self.best_effort("high score", self.store.set_high_score(score));
            }
        }
        if let Some(best) = self.best_effort("highest level", self.store.highest_level()) {
            if level > best {
                self.best_effort("highest level", self.store.set_highest_level(level));
            }
        }
    }

    /// Swallow a collaborator failure into a log line and an advisory event.
    fn best_effort<T>(&self, what: &str, result: Result<T, StoreError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(%error, "progress store: {what} failed");
                self.events.emit(GameUiEvent::Advisory(format!("Could not save {what}: {error}")));
                None
            }
        }
    }

    /// Apply one countdown signal. Its UI events go out before the gate is
    /// released, so nothing from a run can trail a tap that cancelled it.
    async fn on_timer_signal(self: &Arc<Self>, signal: TimerSignal) {
        let mut sequence = None;

        {
            let mut core = self.gate.lock().await;
            if !core.timer.is_current(signal.run) {
                trace!(run = signal.run, event = ?signal.event, "stale timer signal");
                return;
            }

            match signal.event {
                TimerEvent::Tick(seconds_left) => {
                    if core.state.is_game_active {
                        core.state.time_remaining = seconds_left;
                        self.publish(&core);
                    }
                }
                TimerEvent::Timeout => {
                    core.timer.expire(signal.run);
                    if core.state.is_game_active {
                        sequence = self.lose_life(&mut core, Outcome::Timeout);
                        self.events.emit(GameUiEvent::Timeout);
                    }
                }
                threshold => {
                    if let Some(alert) = GameUiEvent::from_timer(threshold) {
                        if core.state.is_game_active {
                            self.events.emit(alert);
                        }
                    }
                }
            }
        }

        if let Some(sequence) = sequence {
            self.spawn_end_sequence(sequence);
        }
    }
}

/// Forward countdown signals into the gate until the session is dropped.
async fn pump_timer(shared: Weak<Shared>, mut rx: mpsc::UnboundedReceiver<TimerSignal>) {
    while let Some(signal) = rx.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.on_timer_signal(signal).await;
    }
    trace!("timer pump stopped");
}
