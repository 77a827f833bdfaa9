//! Watch lifecycle states.

use std::fmt;

/// State of a provider's watch.
///
/// ```text
/// Idle → Connecting → Streaming → Reconnecting | Stopped | Faulted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchState {
    /// Not loaded yet.
    Idle,
    /// Watch requested, no event delivered yet.
    Connecting,
    /// At least one event delivered.
    Streaming,
    /// The stream failed or ended. The provider does not reconnect by itself;
    /// the process has to be restarted to resume watching.
    Reconnecting,
    /// Shut down by its owner.
    Stopped,
    /// The watch could not be established or delivered a malformed event.
    Faulted,
}

impl WatchState {
    /// Whether the watch worker has exited.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WatchState::Reconnecting | WatchState::Stopped | WatchState::Faulted
        )
    }

    /// Whether the watch ended for a reason other than its owner stopping it.
    pub fn is_failure(self) -> bool {
        matches!(self, WatchState::Reconnecting | WatchState::Faulted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WatchState::Idle => "idle",
            WatchState::Connecting => "connecting",
            WatchState::Streaming => "streaming",
            WatchState::Reconnecting => "reconnecting",
            WatchState::Stopped => "stopped",
            WatchState::Faulted => "faulted",
        }
    }
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!WatchState::Idle.is_terminal());
        assert!(!WatchState::Connecting.is_terminal());
        assert!(!WatchState::Streaming.is_terminal());
        assert!(WatchState::Reconnecting.is_terminal());
        assert!(WatchState::Stopped.is_terminal());
        assert!(WatchState::Faulted.is_terminal());
    }

    #[test]
    fn test_stopped_is_not_a_failure() {
        assert!(!WatchState::Stopped.is_failure());
        assert!(WatchState::Reconnecting.is_failure());
        assert!(WatchState::Faulted.is_failure());
    }
}
