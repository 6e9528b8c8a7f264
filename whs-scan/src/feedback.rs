//! Audio/haptic feedback
//!
//! Feedback primitives are opaque side effects: the workflow decides
//! *when* to cue success or error; the device layer decides how. The cue
//! descriptors below document what the handset plays.

use tracing::debug;

/// Oscillator waveform of a beep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
}

/// One audio beep plus vibration pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackCue {
    pub tone_hz: u32,
    pub waveform: Waveform,
    pub duration_ms: u64,
    /// Alternating vibrate/pause durations
    pub vibration_ms: &'static [u64],
}

pub const SUCCESS_CUE: FeedbackCue = FeedbackCue {
    tone_hz: 800,
    waveform: Waveform::Sine,
    duration_ms: 200,
    vibration_ms: &[200],
};

pub const ERROR_CUE: FeedbackCue = FeedbackCue {
    tone_hz: 400,
    waveform: Waveform::Sawtooth,
    duration_ms: 300,
    vibration_ms: &[100, 50, 100],
};

/// Polarity of feedback for a classified scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Positive,
    Negative,
}

impl FeedbackKind {
    pub fn cue(self) -> FeedbackCue {
        match self {
            FeedbackKind::Positive => SUCCESS_CUE,
            FeedbackKind::Negative => ERROR_CUE,
        }
    }
}

/// Device feedback sink
pub trait Feedback: Send + Sync {
    /// Positive cue (accepted scan)
    fn success(&self);

    /// Negative cue (wrong label, unreadable label)
    fn error(&self);

    fn play(&self, kind: FeedbackKind) {
        match kind {
            FeedbackKind::Positive => self.success(),
            FeedbackKind::Negative => self.error(),
        }
    }
}

/// Feedback sink for headless consoles: records cues in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl Feedback for LogFeedback {
    fn success(&self) {
        let cue = SUCCESS_CUE;
        debug!(
            tone_hz = cue.tone_hz,
            duration_ms = cue.duration_ms,
            vibration = ?cue.vibration_ms,
            "Feedback: success"
        );
    }

    fn error(&self) {
        let cue = ERROR_CUE;
        debug!(
            tone_hz = cue.tone_hz,
            duration_ms = cue.duration_ms,
            vibration = ?cue.vibration_ms,
            "Feedback: error"
        );
    }
}
