//! Progress tracking for a single invocation.
//!
//! ```text
//! Idle -> ResolvingSymbol -> BuildingRequest -> Invoking -> Formatting -> Done
//!   \__________\_________________\_______________\______________\______-> Failed
//! ```

/// A step of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeState {
    Idle,
    ResolvingSymbol,
    BuildingRequest,
    Invoking,
    Formatting,
    Done,
    Failed,
}

impl InvokeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The next step on the success path, `None` for terminal states.
    pub fn successor(self) -> Option<Self> {
        let next = match self {
            Self::Idle => Self::ResolvingSymbol,
            Self::ResolvingSymbol => Self::BuildingRequest,
            Self::BuildingRequest => Self::Invoking,
            Self::Invoking => Self::Formatting,
            Self::Formatting => Self::Done,
            Self::Done | Self::Failed => return None,
        };
        Some(next)
    }

    pub fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Failed || self.successor() == Some(next)
    }
}

/// The states one invocation went through, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    history: Vec<InvokeState>,
}

impl Default for Invocation {
    fn default() -> Self {
        Self {
            history: vec![InvokeState::Idle],
        }
    }
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InvokeState {
        self.history
            .last()
            .copied()
            .unwrap_or(InvokeState::Idle)
    }

    pub fn history(&self) -> &[InvokeState] {
        &self.history
    }

    /// Whether the invocation was ever in `state`.
    pub fn reached(&self, state: InvokeState) -> bool {
        self.history.contains(&state)
    }

    /// Moves to `next`. Transitions off the state diagram are ignored.
    pub(crate) fn advance(&mut self, next: InvokeState) {
        let current = self.state();
        if current.can_advance_to(next) {
            tracing::trace!(from = ?current, to = ?next, "invocation state");
            self.history.push(next);
        } else {
            tracing::warn!(from = ?current, to = ?next, "ignoring invalid invocation transition");
        }
    }

    pub(crate) fn fail(&mut self) {
        self.advance(InvokeState::Failed);
    }
}
