use crate::core::audio::{HitSound, SoundSink};
use crate::core::gfx::{ANCHOR_BOTTOM, ANCHOR_CENTER, ANCHOR_TOP, Renderer, WHITE};
use crate::game::events::Segment;
use crate::game::line::LineTransform;
use crate::game::math::rotate_translate;
use crate::game::parsing::official::RawNote;
use crate::game::timing::{ViewportMetrics, floor_position_at, tick_to_seconds};
use glam::Vec2;

pub const NOTE_WIDTH: f32 = 50.0;
pub const NOTE_HEIGHT: f32 = 20.0;
pub const HOLD_CAP_HEIGHT: f32 = 10.0;
// Notes scrolled this far past the line are masked; the slack absorbs float error.
const MASK_FLOOR_POSITION: f32 = -0.0001;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoteKind {
    Tap,
    Drag,
    Hold,
    Flick,
}

impl NoteKind {
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Tap),
            2 => Some(Self::Drag),
            3 => Some(Self::Hold),
            4 => Some(Self::Flick),
            _ => None,
        }
    }

    pub const fn hitsound(&self) -> HitSound {
        match self {
            Self::Tap | Self::Hold => HitSound::Tap,
            Self::Drag => HitSound::Drag,
            Self::Flick => HitSound::Flick,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Above,
    Below,
}

impl Side {
    #[inline(always)]
    pub const fn sign(&self) -> f32 {
        match self {
            Self::Above => 1.0,
            Self::Below => -1.0,
        }
    }
}

/// Where a note is in its lifecycle. `Hit` is terminal; `Broken` only holds
/// for the frame in which the note sat beyond the line's break threshold.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteState {
    Scheduled,
    Holding,
    Broken,
    Hit,
}

/// Per-frame result handed back to the owning line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteOutcome {
    Ok,
    Hit,
    Break,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HoldData {
    pub duration: f32,
    /// Floor position units the body shrinks by per second.
    pub speed: f32,
    /// Body length at load time.
    pub length: f32,
}

#[derive(Clone, Debug)]
pub struct Note {
    pub kind: NoteKind,
    pub hit_time: f32,
    pub end_time: f32,
    pub x_offset: f32,
    /// Floor position of the line's speed timeline at `hit_time`.
    pub floor_position: f32,
    pub speed_multiplier: f32,
    pub side: Side,
    pub hold: Option<HoldData>,

    pub state: NoteState,
    pub is_hit: bool,
    pub remaining_length: f32,
    pub current_floor_position: f32,
    pub current_end_floor_position: f32,
    pub current_position: Vec2,
    pub current_end_position: Vec2,
    pub current_rotation: f32,
}

impl Note {
    pub fn new(
        kind: NoteKind,
        hit_time: f32,
        x_offset: f32,
        floor_position: f32,
        speed_multiplier: f32,
        side: Side,
        hold: Option<HoldData>,
    ) -> Self {
        let end_time = hold.map_or(hit_time, |h| hit_time + h.duration);
        let length = hold.map_or(0.0, |h| h.length);
        Self {
            kind,
            hit_time,
            end_time,
            x_offset,
            floor_position,
            speed_multiplier,
            side,
            hold,
            state: NoteState::Scheduled,
            is_hit: false,
            remaining_length: length,
            current_floor_position: floor_position,
            current_end_floor_position: floor_position,
            current_position: Vec2::ZERO,
            current_end_position: Vec2::ZERO,
            current_rotation: 0.0,
        }
    }

    /// Converts an authored note. Holds scroll with their own converted speed,
    /// so their speed multiplier is fixed at 1.
    pub fn from_raw(
        kind: NoteKind,
        raw: &RawNote,
        side: Side,
        bpm: f32,
        speeds: &[Segment],
        viewport: ViewportMetrics,
    ) -> Self {
        let hit_time = tick_to_seconds(bpm, raw.time);
        let x_offset = viewport.note_x_to_pixels(raw.position_x);
        let floor_position = floor_position_at(hit_time, speeds);

        if kind == NoteKind::Hold {
            let duration = tick_to_seconds(bpm, raw.hold_time);
            let speed = viewport.speed_to_pixels(raw.speed);
            let hold = HoldData { duration, speed, length: duration * speed };
            Self::new(kind, hit_time, x_offset, floor_position, 1.0, side, Some(hold))
        } else {
            Self::new(kind, hit_time, x_offset, floor_position, raw.speed, side, None)
        }
    }

    #[inline(always)]
    pub fn is_hold(&self) -> bool {
        self.hold.is_some()
    }

    /// Holds authored with no length are never drawn.
    #[inline(always)]
    pub fn is_visible(&self) -> bool {
        self.hold.is_none_or(|h| h.length != 0.0)
    }

    /// Steps the note to `now` against its line's transform for this frame.
    pub fn update(&mut self, now: f32, line: &LineTransform, sounds: &mut dyn SoundSink) -> NoteOutcome {
        if self.state == NoteState::Hit {
            return NoteOutcome::Hit;
        }

        if now >= self.hit_time {
            if !self.is_hit {
                sounds.play_sound(self.kind.hitsound());
                self.is_hit = true;
            }

            match self.hold {
                Some(hold) if now <= self.end_time => {
                    self.remaining_length = hold.length - (now - self.hit_time) * hold.speed;
                    // Pin the body to the line while it is being held.
                    self.current_floor_position = 0.0;
                    self.current_end_floor_position = self.remaining_length;
                    self.state = NoteState::Holding;
                }
                _ => {
                    self.current_position =
                        rotate_translate(line.position, line.rotation, self.x_offset, 0.0);
                    self.state = NoteState::Hit;
                    return NoteOutcome::Hit;
                }
            }
        } else {
            self.current_floor_position =
                (self.floor_position - line.floor_position) * self.speed_multiplier;
            self.current_end_floor_position = self.current_floor_position + self.remaining_length;
        }

        if self.current_floor_position > line.break_threshold {
            self.state = NoteState::Broken;
            return NoteOutcome::Break;
        }
        if self.state == NoteState::Broken {
            self.state = NoteState::Scheduled;
        }

        let sign = self.side.sign();
        self.current_position = rotate_translate(
            line.position,
            line.rotation,
            self.x_offset,
            self.current_floor_position * sign,
        );
        if self.is_hold() {
            self.current_end_position = rotate_translate(
                line.position,
                line.rotation,
                self.x_offset,
                self.current_end_floor_position * sign,
            );
        }
        self.current_rotation = line.rotation;

        NoteOutcome::Ok
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        if self.current_floor_position < MASK_FLOOR_POSITION || !self.is_visible() {
            return;
        }

        let rot = self.current_rotation;
        if self.is_hold() {
            if !self.is_hit {
                renderer.render_rect(
                    self.current_position,
                    Vec2::new(NOTE_WIDTH, HOLD_CAP_HEIGHT),
                    rot,
                    WHITE,
                    ANCHOR_BOTTOM,
                );
            }
            renderer.render_rect(
                self.current_position,
                Vec2::new(NOTE_WIDTH, self.remaining_length * self.side.sign()),
                rot,
                WHITE,
                ANCHOR_TOP,
            );
            renderer.render_rect(
                self.current_end_position,
                Vec2::new(NOTE_WIDTH, HOLD_CAP_HEIGHT),
                rot,
                WHITE,
                ANCHOR_TOP,
            );
        } else {
            renderer.render_rect(
                self.current_position,
                Vec2::new(NOTE_WIDTH, NOTE_HEIGHT),
                rot,
                WHITE,
                ANCHOR_CENTER,
            );
        }
    }
}
