use serde::{Deserialize, Serialize};

/// Lifecycle of one worker version. A new version runs its own machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Script evaluated, install not started
    Parsed,
    Installing,
    /// Installed and waiting to activate
    Installed,
    Activating,
    Activated,
    /// Install failed; this version will never activate
    Redundant,
}

impl WorkerState {
    pub fn can_install(&self) -> bool {
        matches!(self, WorkerState::Parsed)
    }

    /// Activation may be re-run once active; it is a no-op unless stale
    /// generations have appeared.
    pub fn can_activate(&self) -> bool {
        matches!(
            self,
            WorkerState::Installed | WorkerState::Activating | WorkerState::Activated
        )
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}
