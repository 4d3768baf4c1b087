//! Connection lifecycle tracking.
//!
//! One connection moves through `Idle → Connected → (Paused →) Active → Terminated`.
//! Forward transitions are checked; termination is allowed from any live phase because
//! disconnects, idle timeouts, and process interrupts can all land at any time.

use crate::error::{Error, Result};

/// Where a connection currently is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No client yet.
    Idle,
    /// Client connected, media not yet flowing.
    Connected,
    /// Media input deliberately held while the connection stabilizes.
    Paused,
    /// Media flowing, conversation live.
    Active,
    /// Over, by disconnect, idle timeout, or interrupt.
    Terminated,
}

impl ConnectionPhase {
    fn allows(self, next: ConnectionPhase) -> bool {
        use ConnectionPhase::*;
        match (self, next) {
            (Idle, Connected) => true,
            (Connected, Paused) | (Connected, Active) => true,
            (Paused, Active) => true,
            (_, Terminated) => self != Terminated,
            _ => false,
        }
    }
}

/// Checked state machine for one connection.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    phase: ConnectionPhase,
}

impl ConnectionLifecycle {
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Idle,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Move to `next`, rejecting transitions the lifecycle doesn't define.
    pub fn advance(&mut self, next: ConnectionPhase) -> Result<ConnectionPhase> {
        if !self.phase.allows(next) {
            return Err(Error::msg(format!(
                "invalid lifecycle transition: {:?} -> {next:?}",
                self.phase
            )));
        }
        self.phase = next;
        Ok(next)
    }

    /// Idempotent terminal transition.
    pub fn terminate(&mut self) {
        self.phase = ConnectionPhase::Terminated;
    }
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_paused_path_is_legal() {
        let mut lc = ConnectionLifecycle::new();
        lc.advance(ConnectionPhase::Connected).unwrap();
        lc.advance(ConnectionPhase::Paused).unwrap();
        lc.advance(ConnectionPhase::Active).unwrap();
        lc.advance(ConnectionPhase::Terminated).unwrap();
        assert_eq!(lc.phase(), ConnectionPhase::Terminated);
    }

    #[test]
    fn the_direct_path_skips_paused() {
        let mut lc = ConnectionLifecycle::new();
        lc.advance(ConnectionPhase::Connected).unwrap();
        lc.advance(ConnectionPhase::Active).unwrap();
        assert_eq!(lc.phase(), ConnectionPhase::Active);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let mut lc = ConnectionLifecycle::new();
        assert!(lc.advance(ConnectionPhase::Active).is_err());
        assert!(lc.advance(ConnectionPhase::Paused).is_err());
        assert_eq!(lc.phase(), ConnectionPhase::Idle);

        lc.advance(ConnectionPhase::Connected).unwrap();
        assert!(lc.advance(ConnectionPhase::Connected).is_err());
    }

    #[test]
    fn termination_is_allowed_from_any_live_phase_and_idempotent() {
        for setup in [
            vec![],
            vec![ConnectionPhase::Connected],
            vec![ConnectionPhase::Connected, ConnectionPhase::Paused],
        ] {
            let mut lc = ConnectionLifecycle::new();
            for phase in setup {
                lc.advance(phase).unwrap();
            }
            lc.terminate();
            lc.terminate();
            assert_eq!(lc.phase(), ConnectionPhase::Terminated);
            assert!(lc.advance(ConnectionPhase::Terminated).is_err());
        }
    }
}
