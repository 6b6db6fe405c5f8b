//! Run-length event counters
//!
//! Both temporal trackers reduce a stream of per-sample booleans to a count of
//! distinct episodes. The eye tracker counts an episode when a run first
//! reaches a length threshold; the audio classifier counts it when the run
//! ends.

use serde::{Deserialize, Serialize};

/// Counts runs of a condition that last at least `threshold` consecutive samples.
///
/// The run counter resets whenever the condition is false. The event count
/// increments exactly once per run, on the sample where the run length first
/// equals the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HysteresisCounter {
    threshold: u32,
    consecutive_frames: u32,
    events: u32,
}

impl HysteresisCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_frames: 0,
            events: 0,
        }
    }

    /// Feed one sample. Returns `true` if this sample fired an event.
    pub fn observe(&mut self, condition: bool) -> bool {
        if !condition {
            self.consecutive_frames = 0;
            return false;
        }

        // Saturate so an arbitrarily long run never wraps back onto the threshold
        self.consecutive_frames = self.consecutive_frames.saturating_add(1);
        if self.consecutive_frames == self.threshold {
            self.events += 1;
            true
        } else {
            false
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn consecutive_frames(&self) -> u32 {
        self.consecutive_frames
    }

    pub fn events(&self) -> u32 {
        self.events
    }
}

/// Collapses runs of active samples into one event counted at the falling edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallingEdgeCounter {
    active: bool,
    events: u32,
}

impl FallingEdgeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample. Returns `true` if this sample closed an active run.
    pub fn observe(&mut self, active: bool) -> bool {
        if active {
            self.active = true;
            return false;
        }

        if self.active {
            self.active = false;
            self.events += 1;
            true
        } else {
            false
        }
    }

    /// Whether a run is currently open
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn events(&self) -> u32 {
        self.events
    }
}
