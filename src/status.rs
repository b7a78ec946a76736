//! Outcome classification for a property run.

/// The closed set of run outcomes. `Interesting` is a success for the
/// search but a failure for the property; `Invalid`, `Overrun`, and
/// `Exhausted` are terminal within a run, and only `Interesting` triggers
/// the shrink phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing has run yet.
    Unknown,
    /// The search completed without finding a falsification.
    Valid,
    /// A falsifying case was found.
    Interesting,
    /// The property itself raised an unexpected error.
    Invalid,
    /// The entropy budget was exceeded during generation.
    Overrun,
    /// Too many cases were rejected to reach the success target.
    Exhausted,
}

impl Status {
    /// Whether the run can keep generating and evaluating cases.
    pub fn searchable(&self) -> bool {
        matches!(self, Status::Unknown | Status::Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_undecided_states_are_searchable() {
        assert!(Status::Unknown.searchable());
        assert!(Status::Valid.searchable());
        assert!(!Status::Interesting.searchable());
        assert!(!Status::Invalid.searchable());
        assert!(!Status::Overrun.searchable());
        assert!(!Status::Exhausted.searchable());
    }
}
