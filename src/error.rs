//! Error taxonomy for the harvest pipeline.

use thiserror::Error;

/// Which select control an option was missing from.
///
/// The distinction matters to the run loop: not every property type lists
/// every volume, so a missing volume option is a routine answer, while a
/// missing property type means the portal no longer matches what we were
/// configured to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectControl {
    PropertyType,
    Volume,
}

impl std::fmt::Display for SelectControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectControl::PropertyType => write!(f, "property type"),
            SelectControl::Volume => write!(f, "volume"),
        }
    }
}

/// Failures raised while scraping, normalizing, or persisting records.
///
/// Each variant maps onto a handling policy in the run loop: `Network` and
/// `Storage` are logged and alerted, `ElementNotFound` and `OptionNotFound`
/// abort only the current combination, `Parse` and `Validation` drop a
/// single row or record, and `CircuitOpen` skips combinations while the
/// breaker cools down. None of them ends the run.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Transport-level failure, surfaced after any automatic retries.
    #[error("network failure: {0}")]
    Network(String),

    /// The page did not contain an element the protocol depends on.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// A select control exists but lacks the requested option.
    #[error("option {option:?} not listed in the {control} selector")]
    OptionNotFound { control: SelectControl, option: String },

    /// A results row could not be lifted into a record.
    #[error("row {row}: {reason}")]
    Parse { row: usize, reason: String },

    /// A record failed normalization and was dropped.
    #[error("invalid record: {0}")]
    Validation(String),

    /// The circuit breaker refused the call without attempting it.
    #[error("circuit open for another {remaining_secs}s")]
    CircuitOpen { remaining_secs: u64 },

    /// The storage layer rejected a batch; the transaction was rolled back.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The run was cancelled before this operation completed.
    #[error("cancelled")]
    Cancelled,
}

impl HarvestError {
    /// True for failure classes that should also raise an operator alert.
    pub fn should_alert(&self) -> bool {
        matches!(self, HarvestError::Network(_) | HarvestError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_policy() {
        assert!(HarvestError::Network("connection reset".into()).should_alert());
        assert!(HarvestError::Storage("commit failed".into()).should_alert());

        assert!(!HarvestError::ElementNotFound("__VIEWSTATE".into()).should_alert());
        assert!(!HarvestError::OptionNotFound {
            control: SelectControl::Volume,
            option: "90".into(),
        }
        .should_alert());
        assert!(!HarvestError::Parse { row: 2, reason: "short row".into() }.should_alert());
        assert!(!HarvestError::Validation("negative extent".into()).should_alert());
        assert!(!HarvestError::CircuitOpen { remaining_secs: 42 }.should_alert());
        assert!(!HarvestError::Cancelled.should_alert());
    }

    #[test]
    fn test_display_messages() {
        let err = HarvestError::OptionNotFound {
            control: SelectControl::PropertyType,
            option: "Farm Property".into(),
        };
        assert_eq!(err.to_string(), "option \"Farm Property\" not listed in the property type selector");

        let err = HarvestError::Parse { row: 2, reason: "expected 4 cells, found 3".into() };
        assert_eq!(err.to_string(), "row 2: expected 4 cells, found 3");

        let err = HarvestError::CircuitOpen { remaining_secs: 60 };
        assert!(err.to_string().contains("60s"));
    }
}
