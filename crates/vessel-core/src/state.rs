//! Lifecycle states.

use std::fmt;

/// Lifecycle state of a plugin instance, and of the service as a whole.
///
/// The numeric ordering is an observable contract, not an implementation
/// detail: queries such as [`is_disabled`](Self::is_disabled) and
/// [`is_enabled`](Self::is_enabled) are comparisons against [`Setup`], and
/// dependency gating compares a dependency's state against the state required
/// by the current stage.
///
/// The per-plugin machine is:
///
/// ```text
/// None ──► Setup ──► Start ──► Enabled
///   │        │         │          │
///   │        └────► Disabled ◄────┘
///   │                  ▲
///   └──────────────────┘
/// Enabled ──► Shutdown ──► Disabled
/// ```
///
/// [`Setup`]: Self::Setup
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PluginState {
    /// Constructed, no lifecycle hook has run yet.
    None = 0,
    /// The stop hook is running.
    Shutdown = 1,
    /// Out of service: either shut down, or abandoned after a fault.
    Disabled = 2,
    /// The setup hook ran (or is running) for this stage.
    Setup = 3,
    /// The start hook is running.
    Start = 4,
    /// Fully operational.
    Enabled = 5,
}

impl PluginState {
    /// `true` while the plugin has not completed its setup stage.
    pub fn is_disabled(self) -> bool {
        self < Self::Setup
    }

    /// `true` once the plugin has reached its setup stage.
    pub fn is_enabled(self) -> bool {
        self >= Self::Setup
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Shutdown => "Shutdown",
            Self::Disabled => "Disabled",
            Self::Setup => "Setup",
            Self::Start => "Start",
            Self::Enabled => "Enabled",
        };
        f.write_str(name)
    }
}
