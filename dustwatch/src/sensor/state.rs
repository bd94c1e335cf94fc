//! Duty-cycle state.

/// The controller's position in the wake/sample/sleep cycle.
///
/// Exactly one state is active at a time. The state is owned by the
/// controller thread and never shared; transitions are visible through
/// log messages only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Waking the sensor: fan on, waiting for it to respond.
    Waking,
    /// Reading period: polling the sensor every sample interval.
    Sampling,
    /// Idle period: fan off to conserve its lifespan.
    Sleeping,
}

impl CycleState {
    /// Human-readable label for logs and status displays.
    pub fn display_status(&self) -> &'static str {
        match self {
            CycleState::Waking => "Waking",
            CycleState::Sampling => "Sampling",
            CycleState::Sleeping => "Sleeping (fan off)",
        }
    }
}
