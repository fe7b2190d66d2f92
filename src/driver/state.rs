//! Host-facing machine states.

use std::fmt;

/// Lifecycle state reported to the host.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MachineState {
    /// The instance is being created, booted, or restarted.
    Starting,
    /// The instance is up.
    Running,
    /// The instance is powered off.
    Stopped,
    /// The provider reported a status the driver does not recognise.
    Error,
}

impl MachineState {
    /// Returns the label printed by the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopped => "Stopped",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
