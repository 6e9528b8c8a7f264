//! Decode debouncer
//!
//! Sits between the camera decode loop and the workflow. The camera
//! delivers the same label many times per second; the debouncer turns that
//! stream into at most one classified scan per physical label:
//!
//! 1. Frames arriving while inactive, or from a previous camera session,
//!    are dropped.
//! 2. A single processing latch admits one decode at a time. It is held
//!    for the error latch (1 s) after a wrong-type/unrecognized
//!    classification and for the success latch (4 s) after an accepted one.
//! 3. Text identical to the last admitted text within the recency window
//!    (5 s) is dropped silently.
//! 4. Admitted text is classified by prefix against the expected kind.

use crate::feedback::FeedbackKind;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use whs_common::config::TimingConfig;
use whs_common::scan::{ScanKind, ScanResult, BOX_PREFIX, LOCATION_PREFIX};

/// Which label kind the workflow accepts next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Only(ScanKind),
    Either,
}

impl Expectation {
    /// Prefix text used in the generic decode-error message
    pub fn prefix_hint(self) -> String {
        match self {
            Expectation::Only(kind) => kind.prefix().to_string(),
            Expectation::Either => format!("{} or {}", LOCATION_PREFIX, BOX_PREFIX),
        }
    }
}

/// Why a frame produced no classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// Camera inactive or frame from an earlier camera session
    Inactive,
    /// Processing latch held by a previous decode
    Busy,
    /// Same text seen within the recency window
    Recent,
}

/// Result of offering one decoded frame to the debouncer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// Valid scan of the expected kind, prefix stripped
    Accepted(ScanResult),
    /// Valid label of the other known kind
    WrongType {
        expected: ScanKind,
        received: ScanKind,
        id: String,
    },
    /// Neither known prefix
    Unrecognized { expected: Expectation },
    /// Dropped without feedback
    Suppressed(Suppression),
}

impl DecodeOutcome {
    /// Feedback cue owed to the operator for this outcome
    pub fn feedback(&self) -> Option<FeedbackKind> {
        match self {
            DecodeOutcome::Accepted(_) => Some(FeedbackKind::Positive),
            DecodeOutcome::WrongType { .. } | DecodeOutcome::Unrecognized { .. } => {
                Some(FeedbackKind::Negative)
            }
            DecodeOutcome::Suppressed(_) => None,
        }
    }
}

/// Grace periods used by the debouncer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTiming {
    pub recency_window: Duration,
    pub error_latch: Duration,
    pub success_latch: Duration,
}

impl Default for DebounceTiming {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

impl From<&TimingConfig> for DebounceTiming {
    fn from(config: &TimingConfig) -> Self {
        Self {
            recency_window: config.recency_window(),
            error_latch: config.error_latch(),
            success_latch: config.success_latch(),
        }
    }
}

/// Debounces one camera's decode stream
///
/// Owned by the controller; only one camera is ever active so a single
/// instance suffices.
#[derive(Debug)]
pub struct DecodeDebouncer {
    timing: DebounceTiming,
    active: bool,
    /// Incremented on every activation; frames carry the value they were
    /// captured under
    generation: u64,
    /// Last admitted text and when it was admitted
    last_admitted: Option<(String, Instant)>,
    /// Processing latch release deadline
    latch_until: Option<Instant>,
}

impl DecodeDebouncer {
    pub fn new(timing: DebounceTiming) -> Self {
        Self {
            timing,
            active: false,
            generation: 0,
            last_admitted: None,
            latch_until: None,
        }
    }

    pub fn timing(&self) -> DebounceTiming {
        self.timing
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current camera session generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start accepting frames; returns the new camera session generation
    pub fn activate(&mut self) -> u64 {
        self.generation += 1;
        self.active = true;
        self.latch_until = None;
        debug!(generation = self.generation, "Decoder activated");
        self.generation
    }

    /// Stop accepting frames
    ///
    /// The processing latch is force-released so a restarted camera is not
    /// blocked by a latch from the previous session. The recency window
    /// survives: the same label still in view is still noise.
    pub fn deactivate(&mut self) {
        if self.active {
            debug!(generation = self.generation, "Decoder deactivated");
        }
        self.active = false;
        self.latch_until = None;
    }

    /// Deactivate and forget all recency state (mode change, teardown)
    pub fn reset(&mut self) {
        self.deactivate();
        self.last_admitted = None;
    }

    /// True while a previous decode still holds the processing latch
    pub fn is_busy(&self, now: Instant) -> bool {
        self.latch_until.map_or(false, |until| now < until)
    }

    /// Offer a frame captured under the current generation
    pub fn offer(&mut self, raw: &str, expected: Expectation, now: Instant) -> DecodeOutcome {
        let generation = self.generation;
        self.offer_frame(generation, raw, expected, now)
    }

    /// Offer a frame tagged with the generation it was captured under
    pub fn offer_frame(
        &mut self,
        generation: u64,
        raw: &str,
        expected: Expectation,
        now: Instant,
    ) -> DecodeOutcome {
        if !self.active || generation != self.generation {
            return DecodeOutcome::Suppressed(Suppression::Inactive);
        }

        if self.is_busy(now) {
            return DecodeOutcome::Suppressed(Suppression::Busy);
        }

        if let Some((last, at)) = &self.last_admitted {
            if last == raw && now.saturating_duration_since(*at) < self.timing.recency_window {
                debug!(value = %raw, "Dropping repeat decode within recency window");
                return DecodeOutcome::Suppressed(Suppression::Recent);
            }
        }

        self.last_admitted = Some((raw.to_string(), now));

        let outcome = classify(raw, expected);
        let hold = match outcome {
            DecodeOutcome::Accepted(_) => self.timing.success_latch,
            _ => self.timing.error_latch,
        };
        self.latch_until = Some(now + hold);
        outcome
    }
}

impl Default for DecodeDebouncer {
    fn default() -> Self {
        Self::new(DebounceTiming::default())
    }
}

/// Classify decoded text against the expected kind
pub fn classify(raw: &str, expected: Expectation) -> DecodeOutcome {
    match (ScanKind::classify(raw), expected) {
        (None, expected) => DecodeOutcome::Unrecognized { expected },
        (Some((kind, id)), Expectation::Either) => {
            DecodeOutcome::Accepted(ScanResult::new(kind, id))
        }
        (Some((kind, id)), Expectation::Only(want)) if kind == want => {
            DecodeOutcome::Accepted(ScanResult::new(kind, id))
        }
        (Some((kind, id)), Expectation::Only(want)) => DecodeOutcome::WrongType {
            expected: want,
            received: kind,
            id: id.to_string(),
        },
    }
}
