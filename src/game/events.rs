//! Game UI Events
//!
//! Notifications derived from session transitions for the presentation,
//! audio and haptics layers. Some events carry a mandatory follow-up that is
//! always sent right after them by the same call.

use serde::{Serialize, Deserialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::game::round::CellId;
use crate::game::timer::TimerEvent;

/// Event for UI collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameUiEvent {
    /// Target tapped
    CorrectTap(CellId),
    /// Wrong cell tapped
    IncorrectTap(CellId),
    /// Level advanced (follows `CorrectTap`)
    LevelUp,
    /// Shake the grid (follows `IncorrectTap`)
    ShakeGrid,
    /// Countdown ran out
    Timeout,
    /// Five seconds left
    TimeWarning,
    /// Three seconds left
    TimeCritical,
    /// One second left
    TimeUrgent,
    /// Session over
    GameOver,
    /// Highlight the target at game over
    RevealAnswer(CellId),
    /// Non-blocking notice, e.g. a failed progress save
    Advisory(String),
}

impl GameUiEvent {
    /// Event that must directly follow this one, if any.
    pub fn follow_up(&self) -> Option<GameUiEvent> {
        match self {
            GameUiEvent::CorrectTap(_) => Some(GameUiEvent::LevelUp),
            GameUiEvent::IncorrectTap(_) => Some(GameUiEvent::ShakeGrid),
            _ => None,
        }
    }

    /// UI alert for a timer threshold event.
    pub fn from_timer(event: TimerEvent) -> Option<GameUiEvent> {
        match event {
            TimerEvent::Warning => Some(GameUiEvent::TimeWarning),
            TimerEvent::Critical => Some(GameUiEvent::TimeCritical),
            TimerEvent::Urgent => Some(GameUiEvent::TimeUrgent),
            TimerEvent::Tick(_) | TimerEvent::Timeout => None,
        }
    }
}

/// Broadcast channel for [`GameUiEvent`]s.
///
/// Fire-and-forget: emitting with no subscriber is not an error, and late
/// subscribers do not see earlier events.
#[derive(Clone, Debug)]
pub struct EventChannel {
    tx: broadcast::Sender<GameUiEvent>,
}

impl EventChannel {
    /// Create a channel buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameUiEvent> {
        self.tx.subscribe()
    }

    /// Emit `event` and then its follow-up. Returns the number of events sent.
    pub fn emit(&self, event: GameUiEvent) -> usize {
        let follow_up = event.follow_up();
        let mut sent = 0;

        for event in std::iter::once(event).chain(follow_up) {
            trace!(?event, "ui event");
            // No receivers is fine; the UI may not be listening yet
            let _ = self.tx.send(event);
            sent += 1;
        }

        sent
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follow_ups() {
        assert_eq!(GameUiEvent::CorrectTap(2).follow_up(), Some(GameUiEvent::LevelUp));
        assert_eq!(GameUiEvent::IncorrectTap(0).follow_up(), Some(GameUiEvent::ShakeGrid));
        assert_eq!(GameUiEvent::Timeout.follow_up(), None);
        assert_eq!(GameUiEvent::RevealAnswer(1).follow_up(), None);
        assert_eq!(GameUiEvent::GameOver.follow_up(), None);
    }

    #[test]
    fn test_timer_mapping() {
        assert_eq!(GameUiEvent::from_timer(TimerEvent::Warning), Some(GameUiEvent::TimeWarning));
        assert_eq!(GameUiEvent::from_timer(TimerEvent::Critical), Some(GameUiEvent::TimeCritical));
        assert_eq!(GameUiEvent::from_timer(TimerEvent::Urgent), Some(GameUiEvent::TimeUrgent));
        assert_eq!(GameUiEvent::from_timer(TimerEvent::Tick(4)), None);
        assert_eq!(GameUiEvent::from_timer(TimerEvent::Timeout), None);
    }

    #[tokio::test]
    async fn test_emit_preserves_order() {
        let channel = EventChannel::new(16);
        let mut rx = channel.subscribe();

        assert_eq!(channel.emit(GameUiEvent::CorrectTap(3)), 2);
        assert_eq!(channel.emit(GameUiEvent::IncorrectTap(1)), 2);
        assert_eq!(channel.emit(GameUiEvent::TimeWarning), 1);

        assert_eq!(rx.recv().await.unwrap(), GameUiEvent::CorrectTap(3));
        assert_eq!(rx.recv().await.unwrap(), GameUiEvent::LevelUp);
        assert_eq!(rx.recv().await.unwrap(), GameUiEvent::IncorrectTap(1));
        assert_eq!(rx.recv().await.unwrap(), GameUiEvent::ShakeGrid);
        assert_eq!(rx.recv().await.unwrap(), GameUiEvent::TimeWarning);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let channel = EventChannel::new(4);
        assert_eq!(channel.subscriber_count(), 0);
        assert_eq!(channel.emit(GameUiEvent::GameOver), 1);
    }
}
