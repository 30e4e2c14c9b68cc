//! Enrollment session state machine.
//!
//! Tracks the lifecycle of one enrollment attempt and enforces that
//! transitions only move forward.
//!
//! # States
//!
//! - `Created`: admitted by the owner, nothing dispatched yet
//! - `Started`: indicator shown if applicable, driver not yet armed
//! - `Enrolling`: enroll request dispatched (possibly still in flight), progress may arrive
//! - `Completed`: driver reported `remaining == 0`
//! - `Cancelled`: stopped by the client, the owner's timer, or peer death
//! - `Failed`: driver rejected the request or a dispatch failed
//!
//! # Valid Transitions
//!
//! - Created → Started → Enrolling → Completed
//! - Created/Started/Enrolling → Cancelled | Failed
//!
//! Terminal states have no outgoing transitions.
//!
//! # Examples
//!
//! ```
//! use fpenroll_session::{SessionState, StateMachine};
//!
//! let mut machine = StateMachine::new(8);
//! machine.transition_to(SessionState::Started).unwrap();
//! machine.transition_to(SessionState::Enrolling).unwrap();
//! machine.transition_to(SessionState::Completed).unwrap();
//!
//! assert!(machine.is_terminal());
//! assert!(machine.transition_to(SessionState::Cancelled).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fpenroll_core::{Error, Result};

/// All states an enrollment session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Admitted, not started.
    Created,

    /// Indicator claimed; the enroll request has not been dispatched.
    Started,

    /// Driver armed; progress callbacks are accepted.
    Enrolling,

    /// Enrollment finished and the template was recorded.
    Completed,

    /// Stopped before completion.
    Cancelled,

    /// Driver rejection or dispatch failure.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Created => "Created",
            SessionState::Started => "Started",
            SessionState::Enrolling => "Enrolling",
            SessionState::Completed => "Completed",
            SessionState::Cancelled => "Cancelled",
            SessionState::Failed => "Failed",
        };
        write!(f, "{}", state_str)
    }
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use fpenroll_session::SessionState;
    ///
    /// assert!(SessionState::Created.can_transition_to(&SessionState::Started));
    /// assert!(!SessionState::Created.can_transition_to(&SessionState::Completed));
    /// assert!(!SessionState::Completed.can_transition_to(&SessionState::Cancelled));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            // From Created
            (SessionState::Created, SessionState::Started)
            // From Started
            | (SessionState::Started, SessionState::Enrolling)
            // From Enrolling
            | (SessionState::Enrolling, SessionState::Completed)
            // Any non-terminal state may be cancelled or fail
            | (
                SessionState::Created | SessionState::Started | SessionState::Enrolling,
                SessionState::Cancelled | SessionState::Failed
            )
        )
    }

    /// Returns `true` for `Completed`, `Cancelled` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }
}

/// A single recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: SessionState,

    /// The state transitioned to.
    pub to: SessionState,

    /// Wall-clock time of the transition.
    pub at: DateTime<Utc>,
}

impl StateTransition {
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            at: Utc::now(),
        }
    }
}

/// Forward-only state machine with a bounded transition history.
///
/// # Thread Safety
///
/// Not synchronized. The session keeps it behind its own lock together
/// with the rest of its mutable state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    current_state: SessionState,
    history: VecDeque<StateTransition>,
    capacity: usize,
}

impl StateMachine {
    /// Create a machine in `Created` that keeps at most `capacity` transitions.
    pub fn new(capacity: usize) -> Self {
        Self {
            current_state: SessionState::Created,
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn current_state(&self) -> SessionState {
        self.current_state
    }

    pub fn is_terminal(&self) -> bool {
        self.current_state.is_terminal()
    }

    /// Recorded transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Get the last N state transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        self.history
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    /// Transition to a new state, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the transition is not
    /// allowed from the current state. The machine is left unchanged.
    pub fn transition_to(&mut self, new_state: SessionState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        self.current_state = new_state;
        self.add_to_history(transition.clone());

        Ok(transition)
    }

    fn add_to_history(&mut self, transition: StateTransition) {
        if self.capacity == 0 {
            return;
        }
        self.history.push_back(transition);
        if self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }
}
