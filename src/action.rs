//! The four ways a filter can tell the pipeline to proceed.

use std::fmt;

/// How the pipeline proceeds after a filter's request phase.
///
/// | Action | Mutations go to | Chain runs? | Response phase? |
/// |---|---|---|---|
/// | `NotSet` | nowhere (discarded) | yes, with the untouched originals | no |
/// | `Pass` | request | yes | no |
/// | `ProcessResponse` | request | yes | yes, applied to the response |
/// | `Return` | response | no | no |
///
/// The set is closed. Every dispatch site matches it exhaustively, so adding
/// a variant fails to compile until each site decides what it means.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Action {
    /// The filter declined to act.
    #[default]
    NotSet,
    /// Apply mutations to the request and continue down the chain.
    Pass,
    /// Like `Pass`, then run the filter again once the chain has produced a
    /// response.
    ProcessResponse,
    /// Stop here. Mutations build the response; the chain never runs.
    Return,
}

impl Action {
    /// Returns the upper-snake-case name used in logs (e.g. `"PROCESS_RESPONSE"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotSet          => "NOT_SET",
            Self::Pass            => "PASS",
            Self::ProcessResponse => "PROCESS_RESPONSE",
            Self::Return          => "RETURN",
        }
    }

    /// Whether the chain continuation runs for this action.
    pub fn continues(self) -> bool {
        match self {
            Self::NotSet | Self::Pass | Self::ProcessResponse => true,
            Self::Return => false,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_set() {
        assert_eq!(Action::default(), Action::NotSet);
    }

    #[test]
    fn only_return_stops_the_chain() {
        assert!(Action::NotSet.continues());
        assert!(Action::Pass.continues());
        assert!(Action::ProcessResponse.continues());
        assert!(!Action::Return.continues());
    }

    #[test]
    fn displays_wire_names() {
        assert_eq!(Action::ProcessResponse.to_string(), "PROCESS_RESPONSE");
        assert_eq!(Action::Return.to_string(), "RETURN");
    }
}
