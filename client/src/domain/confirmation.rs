//! Explicit confirmation for destructive actions.

/// Answer to a "are you sure?" prompt.
///
/// Deleting a track and signing out take this as a parameter so a caller
/// cannot reach the backend without having asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The user confirmed.
    Confirmed,
    /// The user backed out; the action must not run.
    Declined,
}

impl Confirmation {
    /// Map a yes/no answer.
    pub const fn from_answer(confirmed: bool) -> Self {
        if confirmed { Self::Confirmed } else { Self::Declined }
    }

    /// Whether the action may proceed.
    pub const fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}
