//! Seek-constrained playback
//!
//! Keeps a player inside a set of permitted ranges. The controller is fed
//! the current position on every time update and answers what the player
//! should do next; it never touches the player itself.

use crate::ranges::{closest, Closest, Range};
use serde::{Deserialize, Serialize};

/// What the player should do at a position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackDecision {
    /// Inside a permitted range
    Continue,
    /// Outside every range; jump to the start of the next one
    SeekTo(f64),
    /// Past the last permitted range
    PastEnd,
}

/// How to resolve [`PlaybackDecision::PastEnd`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndPolicy {
    #[default]
    Stop,
    /// Seek back to the earliest permitted start
    Loop,
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackController {
    ranges: Vec<Range>,
}

impl PlaybackController {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn set_ranges(&mut self, ranges: Vec<Range>) {
        self.ranges = ranges;
    }

    /// Decide what to do at `position`
    ///
    /// With no ranges configured nothing is permitted, so every position is
    /// past the end.
    pub fn on_position(&self, position: f64) -> PlaybackDecision {
        match closest(position, &self.ranges) {
            Closest::In(_) => PlaybackDecision::Continue,
            Closest::Out { next: Some(next) } => PlaybackDecision::SeekTo(next.start()),
            Closest::Out { next: None } => PlaybackDecision::PastEnd,
        }
    }

    /// Like [`on_position`](Self::on_position), with `PastEnd` resolved by
    /// `policy`
    pub fn on_position_with(&self, position: f64, policy: EndPolicy) -> PlaybackDecision {
        match self.on_position(position) {
            PlaybackDecision::PastEnd => self.resolve_end(policy),
            decision => decision,
        }
    }

    /// Apply `policy` to a `PastEnd` decision
    pub fn resolve_end(&self, policy: EndPolicy) -> PlaybackDecision {
        match policy {
            EndPolicy::Stop => PlaybackDecision::PastEnd,
            EndPolicy::Loop => self
                .ranges
                .iter()
                .map(Range::start)
                .min_by(f64::total_cmp)
                .map_or(PlaybackDecision::PastEnd, PlaybackDecision::SeekTo),
        }
    }
}
