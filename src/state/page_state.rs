/// Entry and session state definitions for tracking crawl progress
///
/// Every frontier entry walks `Queued -> Fetching -> {Parsed | SoftFailed}`.
use crate::CrawlError;
use serde::Serialize;
use std::fmt;

/// Represents the current state of a frontier entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Entry is in the frontier waiting to be fetched
    Queued,

    /// Entry has been popped and marked visited
    Fetching,

    /// Page was fetched and parsed into a record
    Parsed,

    /// Page could not be fetched or parsed; recorded in the crawl log
    SoftFailed,
}

impl EntryState {
    /// Returns true if no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Parsed | Self::SoftFailed)
    }

    /// Validates a move to `to` and returns the new state
    ///
    /// # Returns
    ///
    /// * `Ok(EntryState)` - The new state
    /// * `Err(CrawlError::InvalidTransition)` - The move is not allowed
    pub fn transition(self, to: EntryState) -> Result<EntryState, CrawlError> {
        match (self, to) {
            (Self::Queued, Self::Fetching)
            | (Self::Fetching, Self::Parsed)
            | (Self::Fetching, Self::SoftFailed) => Ok(to),
            _ => Err(CrawlError::InvalidTransition { from: self, to }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Parsed => "parsed",
            Self::SoftFailed => "soft_failed",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a session stopped before crawling anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// robots.txt disallows the start URL for our token
    RobotsDisallowed,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RobotsDisallowed => write!(f, "robots_disallowed"),
        }
    }
}

/// Terminal state of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The frontier drained or the page budget was spent
    Completed,

    /// The session stopped before the first fetch
    Aborted(AbortReason),
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Aborted(reason) => write!(f, "aborted({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let state = EntryState::Queued;
        let state = state.transition(EntryState::Fetching).unwrap();
        assert_eq!(state, EntryState::Fetching);
        assert_eq!(state.transition(EntryState::Parsed).unwrap(), EntryState::Parsed);
        assert_eq!(
            state.transition(EntryState::SoftFailed).unwrap(),
            EntryState::SoftFailed
        );
    }

    #[test]
    fn test_invalid_transitions() {
        let invalid = [
            (EntryState::Queued, EntryState::Parsed),
            (EntryState::Queued, EntryState::SoftFailed),
            (EntryState::Parsed, EntryState::Fetching),
            (EntryState::SoftFailed, EntryState::Parsed),
            (EntryState::Fetching, EntryState::Queued),
            (EntryState::Fetching, EntryState::Fetching),
        ];

        for (from, to) in invalid {
            let err = from.transition(to).unwrap_err();
            let rejected = matches!(
                err,
                CrawlError::InvalidTransition { from: f, to: t } if f == from && t == to
            );
            assert!(
                rejected,
                "{} -> {} should be rejected",
                from,
                to
            );
        }
    }

    #[test]
    fn test_is_terminal() {
        assert!(!EntryState::Queued.is_terminal());
        assert!(!EntryState::Fetching.is_terminal());
        assert!(EntryState::Parsed.is_terminal());
        assert!(EntryState::SoftFailed.is_terminal());
    }

    #[test]
    fn test_session_status_display_and_json() {
        let aborted = SessionStatus::Aborted(AbortReason::RobotsDisallowed);
        assert_eq!(aborted.to_string(), "aborted(robots_disallowed)");
        assert_eq!(SessionStatus::Completed.to_string(), "completed");

        assert_eq!(
            serde_json::to_string(&aborted).unwrap(),
            r#"{"aborted":"robots_disallowed"}"#
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Completed).unwrap(),
            r#""completed""#
        );
    }
}
