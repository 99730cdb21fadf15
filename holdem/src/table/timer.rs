//! Per-turn clock.

use std::time::Duration;
use tokio::time::Instant;

use crate::game::TurnKey;

/// Deadline for whoever is to act.
///
/// The clock is keyed on [`TurnKey`]: syncing with a different key re-arms
/// it, syncing with no key disarms it. An accepted action always changes the
/// key, which is how a pending timeout gets cancelled.
#[derive(Debug)]
pub struct TurnClock {
    timeout: Option<Duration>,
    armed: Option<(TurnKey, Instant)>,
}

impl TurnClock {
    /// `None` disables the clock.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            armed: None,
        }
    }

    pub fn sync(&mut self, key: Option<TurnKey>) {
        match (self.timeout, key) {
            (Some(timeout), Some(key)) => {
                if self.armed.map(|(armed, _)| armed) != Some(key) {
                    self.armed = Some((key, Instant::now() + timeout));
                }
            }
            _ => self.armed = None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|(_, deadline)| deadline)
    }

    /// Disarms the clock and returns the turn that ran out.
    pub fn expire(&mut self) -> Option<TurnKey> {
        self.armed.take().map(|(key, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(action_seq: u64) -> TurnKey {
        TurnKey {
            hand_number: 1,
            action_seq,
            seat: 0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_keeps_deadline() {
        let mut clock = TurnClock::new(Some(Duration::from_secs(10)));
        clock.sync(Some(key(1)));
        let deadline = clock.deadline().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        clock.sync(Some(key(1)));
        assert_eq!(clock.deadline(), Some(deadline));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_key_rearms() {
        let mut clock = TurnClock::new(Some(Duration::from_secs(10)));
        clock.sync(Some(key(1)));
        let first = clock.deadline().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        clock.sync(Some(key(2)));
        assert_eq!(clock.deadline(), Some(first + Duration::from_secs(3)));
        assert_eq!(clock.expire(), Some(key(2)));
        assert!(clock.deadline().is_none());
    }

    #[test]
    fn test_disabled_clock_never_arms() {
        let mut clock = TurnClock::new(None);
        clock.sync(Some(key(1)));
        assert!(clock.deadline().is_none());
        assert!(clock.expire().is_none());
    }

    #[test]
    fn test_no_turn_disarms() {
        let mut clock = TurnClock::new(Some(Duration::from_secs(10)));
        clock.sync(Some(key(1)));
        clock.sync(None);
        assert!(clock.deadline().is_none());
    }
}
