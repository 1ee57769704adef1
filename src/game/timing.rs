use crate::game::events::{EventKind, Segment, SegmentValue};
use crate::game::math::{lerp, span_progress};
use crate::game::parsing::official::{RawEvent, RawSpeedEvent};
use glam::Vec2;
use log::warn;
use std::cmp::Ordering;

// One tick is 1/32 of a beat: 60 / 32 = 1.875 seconds per tick at 1 BPM.
pub const SECONDS_PER_TICK_AT_1_BPM: f32 = 1.875;

// Authored speed 1.0 scrolls 0.6 screen heights per second.
pub const SPEED_HEIGHT_FACTOR: f32 = 0.6;
// Authored note x of 1.0 is 0.05625 screen widths from the line center.
pub const NOTE_X_WIDTH_FACTOR: f32 = 0.05625;
// Notes further than this many screen heights from the line are cut off.
pub const BREAK_THRESHOLD_HEIGHTS: f32 = 2.0;

#[inline(always)]
pub fn tick_to_seconds(bpm: f32, ticks: f32) -> f32 {
    SECONDS_PER_TICK_AT_1_BPM / bpm * ticks
}

/// Render surface size used for every chart-space to pixel-space conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    pub width: f32,
    pub height: f32,
}

impl ViewportMetrics {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// `[0, 1]` UV coordinates to pixels centered on the viewport.
    #[inline(always)]
    pub fn move_to_pixels(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new((x - 0.5) * self.width, (y - 0.5) * self.height)
    }

    /// Authored speed to floor position units per second.
    #[inline(always)]
    pub fn speed_to_pixels(&self, value: f32) -> f32 {
        SPEED_HEIGHT_FACTOR * self.height * value
    }

    #[inline(always)]
    pub fn note_x_to_pixels(&self, x: f32) -> f32 {
        NOTE_X_WIDTH_FACTOR * x * self.width
    }

    #[inline(always)]
    pub fn break_threshold(&self) -> f32 {
        BREAK_THRESHOLD_HEIGHTS * self.height
    }
}

/// The four normalized segment timelines of one line.
#[derive(Debug, Clone, Default)]
pub struct LineSegments {
    pub moves: Vec<Segment>,
    pub rotates: Vec<Segment>,
    pub opacities: Vec<Segment>,
    pub speeds: Vec<Segment>,
}

#[inline(always)]
fn by_start_tick(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Less)
}

/// Normalizes move, rotate or opacity events: ticks to seconds and, for
/// moves, UV to centered pixels. Events are ordered by their raw start tick.
pub fn normalize_events(
    bpm: f32,
    events: &[RawEvent],
    kind: EventKind,
    viewport: ViewportMetrics,
) -> Vec<Segment> {
    let mut sorted = events.to_vec();
    sorted.sort_by(|a, b| by_start_tick(a.start_time, b.start_time));

    sorted
        .into_iter()
        .map(|ev| {
            let value = match kind {
                EventKind::Move => SegmentValue::Move {
                    start: viewport.move_to_pixels(ev.start, ev.start2),
                    end: viewport.move_to_pixels(ev.end, ev.end2),
                },
                EventKind::Rotate => SegmentValue::Rotate { start: ev.start, end: ev.end },
                EventKind::Opacity => SegmentValue::Opacity { start: ev.start, end: ev.end },
                EventKind::Speed => SegmentValue::Speed { start_floor: ev.start, end_floor: ev.end },
            };
            Segment {
                start_time: tick_to_seconds(bpm, ev.start_time),
                end_time: tick_to_seconds(bpm, ev.end_time),
                value,
            }
        })
        .collect()
}

/// Normalizes speed events into cumulative floor position intervals: each
/// segment spans `[running, running + speed * duration]`.
pub fn normalize_speed_events(
    bpm: f32,
    events: &[RawSpeedEvent],
    viewport: ViewportMetrics,
) -> Vec<Segment> {
    let mut sorted = events.to_vec();
    sorted.sort_by(|a, b| by_start_tick(a.start_time, b.start_time));

    if sorted.iter().any(|ev| ev.value < 0.0) {
        warn!("Speed events contain negative values; floor position will run backwards.");
    }

    let mut running = 0.0_f32;
    sorted
        .into_iter()
        .map(|ev| {
            let start_time = tick_to_seconds(bpm, ev.start_time);
            let end_time = tick_to_seconds(bpm, ev.end_time);
            let length = viewport.speed_to_pixels(ev.value) * (end_time - start_time);
            let start_floor = running;
            let end_floor = start_floor + length;
            running = end_floor;
            Segment {
                start_time,
                end_time,
                value: SegmentValue::Speed { start_floor, end_floor },
            }
        })
        .collect()
}

pub fn normalize_line_events(
    bpm: f32,
    moves: &[RawEvent],
    rotates: &[RawEvent],
    opacities: &[RawEvent],
    speeds: &[RawSpeedEvent],
    viewport: ViewportMetrics,
) -> LineSegments {
    LineSegments {
        moves: normalize_events(bpm, moves, EventKind::Move, viewport),
        rotates: normalize_events(bpm, rotates, EventKind::Rotate, viewport),
        opacities: normalize_events(bpm, opacities, EventKind::Opacity, viewport),
        speeds: normalize_speed_events(bpm, speeds, viewport),
    }
}

/// Cumulative floor position at `time` over sorted, contiguous speed segments.
///
/// Segments are half-open `[start, end)`; the end of the final segment still
/// resolves to its end floor. Times outside every segment resolve to 0.
pub fn floor_position_at(time: f32, speeds: &[Segment]) -> f32 {
    let idx = speeds.partition_point(|seg| seg.start_time <= time);
    if idx == 0 {
        return 0.0;
    }
    let seg = speeds[idx - 1];
    let SegmentValue::Speed { start_floor, end_floor } = seg.value else {
        return 0.0;
    };
    let is_last = idx == speeds.len();
    if time < seg.end_time || (is_last && time == seg.end_time) {
        lerp(start_floor, end_floor, span_progress(seg.start_time, seg.end_time, time))
    } else {
        0.0
    }
}
