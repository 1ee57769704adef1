//! Serde mirror of the official judgment-line chart document.
//!
//! Times are in ticks (1/32 of a beat at the line's BPM), move positions are
//! normalized to `[0, 1]`, and speeds are raw authored values. Nothing here is
//! converted; `game::timing` turns these records into seconds and pixels.

use serde::Deserialize;

pub const SUPPORTED_FORMAT_VERSIONS: [i64; 1] = [3];

/// Only the version field, read before the rest of the document so that an
/// unsupported layout is rejected without trying to interpret it.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct FormatHeader {
    #[serde(rename = "formatVersion")]
    pub format_version: Option<i64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChartDocument {
    pub format_version: i64,
    #[serde(default)]
    pub offset: f32,
    #[serde(default)]
    pub judge_line_list: Vec<RawJudgeLine>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawJudgeLine {
    pub bpm: f32,
    #[serde(default)]
    pub judge_line_move_events: Vec<RawEvent>,
    #[serde(default)]
    pub judge_line_rotate_events: Vec<RawEvent>,
    #[serde(default)]
    pub judge_line_disappear_events: Vec<RawEvent>,
    #[serde(default)]
    pub speed_events: Vec<RawSpeedEvent>,
    #[serde(default)]
    pub notes_above: Vec<RawNote>,
    #[serde(default)]
    pub notes_below: Vec<RawNote>,
}

/// Move, rotate and disappear events share one shape. `start2`/`end2` only
/// carry data for move events (the y coordinate).
#[derive(Deserialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub start_time: f32,
    pub end_time: f32,
    #[serde(default)]
    pub start: f32,
    #[serde(default)]
    pub end: f32,
    #[serde(default)]
    pub start2: f32,
    #[serde(default)]
    pub end2: f32,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawSpeedEvent {
    pub start_time: f32,
    pub end_time: f32,
    #[serde(default)]
    pub value: f32,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawNote {
    #[serde(rename = "type")]
    pub kind: i64,
    pub time: f32,
    #[serde(default)]
    pub position_x: f32,
    #[serde(default)]
    pub hold_time: f32,
    #[serde(default = "default_note_speed")]
    pub speed: f32,
}

const fn default_note_speed() -> f32 {
    1.0
}

#[inline(always)]
pub fn is_supported_format(version: i64) -> bool {
    SUPPORTED_FORMAT_VERSIONS.contains(&version)
}
