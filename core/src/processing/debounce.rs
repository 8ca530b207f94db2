use crate::prelude::PipelineConfig;
use chrono::{DateTime, Local};

/// Mutable debounce state, owned by the frame loop for the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct DebounceState {
    pub consecutive_motion_frames: u32,
    pub last_event_at: DateTime<Local>,
}

impl DebounceState {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            consecutive_motion_frames: 0,
            last_event_at: started_at,
        }
    }
}

/// Outcome of feeding one frame's motion flag to the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceDecision {
    /// No motion this frame; the run of motion frames was reset.
    Quiet,
    /// Motion inside the cooldown window; nothing counted.
    Cooldown,
    /// Motion counted, holding the current run length.
    Accumulating(u32),
    /// The run reached the threshold and an event fires on this frame.
    Fire,
}

impl DebounceDecision {
    pub fn fired(self) -> bool {
        self == DebounceDecision::Fire
    }
}

/// Turns per-frame motion flags into discrete events using a cooldown window
/// and a minimum run of consecutive motion frames.
#[derive(Debug, Clone)]
pub struct EventDebouncer {
    min_upload_seconds: f64,
    min_motion_frames: u32,
}

impl EventDebouncer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_upload_seconds: config.min_upload_seconds,
            min_motion_frames: config.min_motion_frames,
        }
    }

    pub fn observe(
        &self,
        state: &mut DebounceState,
        detected: bool,
        at: DateTime<Local>,
    ) -> DebounceDecision {
        if !detected {
            state.consecutive_motion_frames = 0;
            return DebounceDecision::Quiet;
        }

        // Whole seconds since the last event.
        if ((at - state.last_event_at).num_seconds() as f64) < self.min_upload_seconds {
            return DebounceDecision::Cooldown;
        }

        state.consecutive_motion_frames += 1;
        if state.consecutive_motion_frames >= self.min_motion_frames {
            state.consecutive_motion_frames = 0;
            state.last_event_at = at;
            DebounceDecision::Fire
        } else {
            DebounceDecision::Accumulating(state.consecutive_motion_frames)
        }
    }
}
