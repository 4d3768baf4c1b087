//! Voice Activity Detection (VAD) parameters.
//!
//! The analyzer itself lives inside the transport layer; this crate only chooses its
//! tuning. Both bot variants use the same silence threshold.

/// Silence duration (seconds) after which the transport-side VAD considers an
/// utterance finished.
///
/// Chosen to roughly match the remote model's own phrase endpointing so the two layers'
/// turn-taking heuristics stay aligned.
pub const DEFAULT_STOP_SECS: f32 = 0.5;

/// Parameters handed to the transport's voice-activity analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadParams {
    /// Seconds of trailing silence that end an utterance.
    pub stop_secs: f32,
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            stop_secs: DEFAULT_STOP_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_half_a_second() {
        assert_eq!(VadParams::default().stop_secs, 0.5);
    }
}
