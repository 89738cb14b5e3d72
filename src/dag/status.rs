// src/dag/status.rs

//! Task lifecycle state machine.
//!
//! ```text
//!            +--------> Done ----+
//!            |                   | (reopen)
//! Pending <--+--> Active <-------+---> Pending
//!    ^           |    ^
//!    |           v    |
//!    +------- Snoozed +
//! ```
//!
//! Completion and interruption are only reachable from `Active`: you have to
//! be working on a task to finish or interrupt it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TaskgraphError};

/// Lifecycle state of a single task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started. May or may not be blocked by dependencies.
    #[default]
    Pending,
    /// Currently being worked on.
    Active,
    /// Terminal; satisfies dependents.
    Done,
    /// Interrupted, waiting on an external event.
    Snoozed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Active,
        TaskStatus::Done,
        TaskStatus::Snoozed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Active => "Active",
            TaskStatus::Done => "Done",
            TaskStatus::Snoozed => "Snoozed",
        }
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, to),
            (Pending, Active)
                | (Active, Pending)
                | (Active, Snoozed)
                | (Active, Done)
                | (Snoozed, Pending)
                | (Snoozed, Active)
                | (Done, Pending)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "active" => Ok(TaskStatus::Active),
            "done" => Ok(TaskStatus::Done),
            "snoozed" => Ok(TaskStatus::Snoozed),
            other => Err(format!(
                "invalid task status: {other} (expected \"Pending\", \"Active\", \"Done\" or \"Snoozed\")"
            )),
        }
    }
}

/// Validate a transition for `task`, returning the new status on success.
///
/// Never silently drops a request: the result is either the committed target
/// state or `IllegalTransition` naming both ends.
pub fn transition(task: &str, from: TaskStatus, to: TaskStatus) -> Result<TaskStatus> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(TaskgraphError::IllegalTransition {
            task: task.to_string(),
            from,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::*;

    #[test]
    fn legal_transitions_are_exactly_the_documented_ones() {
        let legal = [
            (Pending, Active),
            (Active, Pending),
            (Active, Snoozed),
            (Active, Done),
            (Snoozed, Pending),
            (Snoozed, Active),
            (Done, Pending),
        ];

        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be legal={expected}"
                );
            }
        }
    }

    #[test]
    fn completion_requires_active() {
        let err = transition("t", Pending, Done).unwrap_err();
        match err {
            TaskgraphError::IllegalTransition { from, to, .. } => {
                assert_eq!(from, Pending);
                assert_eq!(to, Done);
            }
            other => panic!("expected IllegalTransition, got {other:?}"),
        }

        assert!(transition("t", Done, Snoozed).is_err());
        assert_eq!(transition("t", Active, Done).unwrap(), Done);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("snoozed".parse::<TaskStatus>().unwrap(), Snoozed);
        assert_eq!(" Done ".parse::<TaskStatus>().unwrap(), Done);
        assert!("finished".parse::<TaskStatus>().is_err());
    }
}
