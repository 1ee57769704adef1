use crate::game::math::{lerp, span_progress};
use glam::Vec2;
use log::{debug, warn};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Move,
    Rotate,
    Opacity,
    Speed,
}

impl EventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Rotate => "rotate",
            Self::Opacity => "opacity",
            Self::Speed => "speed",
        }
    }

    /// Value held by a category that never received a segment.
    const fn resting_sample(&self) -> Sample {
        match self {
            Self::Move => Sample::Position(Vec2::ZERO),
            Self::Rotate | Self::Opacity | Self::Speed => Sample::Scalar(0.0),
        }
    }
}

/// Normalized payload of one segment. Move is in centered pixel space, Speed
/// carries cumulative floor position (not velocity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentValue {
    Move { start: Vec2, end: Vec2 },
    Rotate { start: f32, end: f32 },
    Opacity { start: f32, end: f32 },
    Speed { start_floor: f32, end_floor: f32 },
}

impl SegmentValue {
    #[inline(always)]
    pub fn at(&self, progress: f32) -> Sample {
        match *self {
            Self::Move { start, end } => Sample::Position(start.lerp(end, progress)),
            Self::Rotate { start, end } | Self::Opacity { start, end } => {
                Sample::Scalar(lerp(start, end, progress))
            }
            Self::Speed { start_floor, end_floor } => {
                Sample::Scalar(lerp(start_floor, end_floor, progress))
            }
        }
    }

    #[inline(always)]
    pub fn start_sample(&self) -> Sample {
        self.at(0.0)
    }

    #[inline(always)]
    pub fn end_sample(&self) -> Sample {
        self.at(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Position(Vec2),
    Scalar(f32),
}

impl Sample {
    /// Scalar view; a position collapses to its x component.
    #[inline(always)]
    pub fn scalar(self) -> f32 {
        match self {
            Self::Scalar(v) => v,
            Self::Position(p) => p.x,
        }
    }

    #[inline(always)]
    pub fn position(self) -> Vec2 {
        match self {
            Self::Position(p) => p,
            Self::Scalar(v) => Vec2::new(v, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Seconds, chart-local.
    pub start_time: f32,
    pub end_time: f32,
    pub value: SegmentValue,
}

impl Segment {
    #[inline(always)]
    pub fn sample(&self, time: f32) -> Sample {
        self.value.at(span_progress(self.start_time, self.end_time, time))
    }
}

/// Forward-only playback pointer over one category of a line's segments.
///
/// Segments whose `end_time` has passed are dropped for good, so `advance`
/// must be called with non-decreasing times.
#[derive(Debug, Clone)]
pub struct EventCursor {
    kind: EventKind,
    segments: VecDeque<Segment>,
    last: Sample,
    last_time: f32,
    warned_exhausted: bool,
}

impl EventCursor {
    pub fn new(kind: EventKind, segments: Vec<Segment>) -> Self {
        let last = segments
            .first()
            .map_or(kind.resting_sample(), |seg| seg.value.start_sample());
        Self {
            kind,
            segments: segments.into(),
            last,
            last_time: f32::NEG_INFINITY,
            warned_exhausted: false,
        }
    }

    /// Segments not yet discarded.
    #[cfg(test)]
    fn remaining(&self) -> usize {
        self.segments.len()
    }

    /// Drains every segment that ended at or before `now` and samples the
    /// survivor. With nothing left the last known value is held.
    pub fn advance(&mut self, now: f32) -> Sample {
        if now < self.last_time {
            debug!(
                "{} cursor moved backwards ({} -> {}); consumed segments are not revisited",
                self.kind.as_str(),
                self.last_time,
                now
            );
        }
        self.last_time = now;

        while let Some(head) = self.segments.front() {
            if head.end_time > now {
                break;
            }
            self.last = head.value.end_sample();
            self.segments.pop_front();
        }

        match self.segments.front() {
            Some(head) => {
                self.last = head.sample(now);
            }
            None if !self.warned_exhausted => {
                warn!(
                    "{} events exhausted at {:.3}s; holding last value",
                    self.kind.as_str(),
                    now
                );
                self.warned_exhausted = true;
            }
            None => {}
        }
        self.last
    }
}
