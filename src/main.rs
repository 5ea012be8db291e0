//! Shade Spotter demo
//!
//! Drives one session with a scripted player: finds the odd tile for a few
//! levels, then taps wrong until the game is over.
//!
//! Usage: `shade-spotter [CONFIG_JSON] [PROGRESS_JSON]`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use shade_spotter::{
    VERSION,
    game::{difficulty::DifficultyProfile, events::GameUiEvent, state::Outcome},
    session::{GameSession, JsonFileStore, MemoryStore, ProgressStore, SessionConfig},
};

/// Levels the scripted player clears before it starts missing.
const LEVELS_TO_CLEAR: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Shade Spotter v{}", VERSION);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            SessionConfig::from_json_str(&json).with_context(|| format!("parsing config {path}"))?
        }
        None => SessionConfig::default(),
    };
    let store: Arc<dyn ProgressStore> = match args.next() {
        Some(path) => Arc::new(
            JsonFileStore::open(&path).with_context(|| format!("opening progress {path}"))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    demo_session(config, Arc::clone(&store)).await?;

    info!("=== Progress ===");
    match (store.high_score(), store.highest_level()) {
        (Ok(score), Ok(level)) => info!("High score: {}, highest level: {}", score, level),
        (Err(e), _) | (_, Err(e)) => warn!("Progress unavailable: {}", e),
    }

    Ok(())
}

/// Play one scripted session to game over.
async fn demo_session(config: SessionConfig, store: Arc<dyn ProgressStore>) -> anyhow::Result<()> {
    info!("=== Starting Demo Session ===");

    let advance_wait = config.round_advance_delay() + Duration::from_millis(config.debounce_ms);
    let loss_wait = config.incorrect_delay() + Duration::from_millis(config.debounce_ms);
    let session = GameSession::new(config, store).context("invalid session config")?;

    info!("Session ID: {}", session.session_id());
    if let Some(seed) = session.seed() {
        info!("RNG Seed: {}", hex::encode(seed.to_be_bytes()));
    }

    let logger = tokio::spawn(log_events(session.subscribe_events()));
    session.start_game().await;

    // Find the target on the first few levels
    for _ in 0..LEVELS_TO_CLEAR {
        let state = session.snapshot();
        let profile = DifficultyProfile::for_level(state.level);
        info!(
            "Level {} ({}): {}x{} {:?}, target {} vs {}",
            state.level,
            profile.label,
            state.grid.size,
            state.grid.size,
            profile.shape,
            state.grid.target_color.to_hex(),
            state.grid.base_color.to_hex(),
        );

        session.tap(state.grid.target_id).await;
        sleep(advance_wait).await;
    }

    // Then miss until the lives run out
    loop {
        let state = session.snapshot();
        if state.is_over() {
            break;
        }

        if state.is_game_active {
            let wrong = (state.grid.target_id + 1) % state.grid.len().max(1);
            session.tap(wrong).await;
        } else if matches!(state.game_result, Some(Outcome::Wrong | Outcome::Timeout)) {
            session.continue_after_life_loss().await;
        }
        sleep(loss_wait).await;
    }

    timeout(Duration::from_secs(10), logger)
        .await
        .context("game over was never announced")?
        .context("event logger failed")?;

    let state = session.snapshot();
    info!("=== Session Results ===");
    info!(
        "Score: {}, level reached: {}, ended by {:?}",
        state.score, state.level, state.last_ending_reason
    );
    Ok(())
}

/// Log UI events until game over.
async fn log_events(mut events: broadcast::Receiver<GameUiEvent>) {
    loop {
        match events.recv().await {
            Ok(GameUiEvent::GameOver) => {
                info!("Event: GameOver");
                break;
            }
            Ok(event) => info!("Event: {:?}", event),
            Err(RecvError::Lagged(missed)) => warn!("Event log lagged, {} events missed", missed),
            Err(RecvError::Closed) => break,
        }
    }
}
