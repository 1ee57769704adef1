use crate::core::audio::SoundSink;
use crate::core::gfx::{ANCHOR_CENTER, Color, Renderer};
use crate::game::chart::ChartError;
use crate::game::events::{EventCursor, EventKind};
use crate::game::note::{Note, NoteKind, NoteOutcome, Side};
use crate::game::parsing::official::RawJudgeLine;
use crate::game::timing::{ViewportMetrics, normalize_line_events};
use glam::Vec2;
use log::{debug, info};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

// Line rectangle size in screen heights.
pub const LINE_WIDTH_HEIGHTS: f32 = 5.76;
pub const LINE_THICKNESS_HEIGHTS: f32 = 0.0075;
pub const DEFAULT_LINE_COLOR: [f32; 3] = [0.996, 1.0, 0.663];

/// A line's placement for the current frame, read by its notes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTransform {
    pub position: Vec2,
    pub rotation: f32,
    pub opacity: f32,
    pub floor_position: f32,
    pub break_threshold: f32,
}

/// Notes sharing one speed multiplier, in ascending floor position order.
#[derive(Debug, Clone)]
pub struct NoteGroup {
    pub speed_multiplier: f32,
    pub notes: Vec<Note>,
    /// Leading notes that survived this frame's scan and may be drawn.
    pub cutoff: usize,
}

impl NoteGroup {
    fn new(speed_multiplier: f32) -> Self {
        Self { speed_multiplier, notes: Vec::new(), cutoff: 0 }
    }

    /// Runs every due note through its state machine. Hit notes leave the
    /// queue; a broken note ends the scan for this frame.
    ///
    /// Survivors are compacted towards the front as the scan goes, and the
    /// hit notes collected between them and the unscanned tail are dropped
    /// in one pass at the end.
    pub fn update(&mut self, now: f32, line: &LineTransform, sounds: &mut dyn SoundSink) {
        let mut write = 0;
        let mut read = 0;
        while read < self.notes.len() {
            match self.notes[read].update(now, line, sounds) {
                NoteOutcome::Hit => read += 1,
                NoteOutcome::Break => break,
                NoteOutcome::Ok => {
                    self.notes.swap(write, read);
                    write += 1;
                    read += 1;
                }
            }
        }
        if read > write {
            self.notes.drain(write..read);
        }
        self.cutoff = write;
    }

    #[inline(always)]
    pub fn visible(&self) -> &[Note] {
        &self.notes[..self.cutoff.min(self.notes.len())]
    }
}

pub struct JudgeLine {
    pub index: usize,
    pub bpm: f32,
    moves: EventCursor,
    rotates: EventCursor,
    opacities: EventCursor,
    speeds: EventCursor,
    pub transform: LineTransform,
    pub groups: SmallVec<[NoteGroup; 4]>,
    pub color: [f32; 3],
    viewport: ViewportMetrics,
}

impl JudgeLine {
    pub fn from_raw(
        index: usize,
        raw: &RawJudgeLine,
        viewport: ViewportMetrics,
        color: [f32; 3],
    ) -> Result<Self, ChartError> {
        if !(raw.bpm.is_finite() && raw.bpm > 0.0) {
            return Err(ChartError::InvalidBpm { line: index, bpm: raw.bpm });
        }

        let segments = normalize_line_events(
            raw.bpm,
            &raw.judge_line_move_events,
            &raw.judge_line_rotate_events,
            &raw.judge_line_disappear_events,
            &raw.speed_events,
            viewport,
        );

        let mut notes = Vec::with_capacity(raw.notes_above.len() + raw.notes_below.len());
        let sides = raw
            .notes_above
            .iter()
            .map(|n| (n, Side::Above))
            .chain(raw.notes_below.iter().map(|n| (n, Side::Below)));
        for (raw_note, side) in sides {
            let kind = NoteKind::from_code(raw_note.kind)
                .ok_or(ChartError::UnknownNoteType { line: index, kind: raw_note.kind })?;
            notes.push(Note::from_raw(kind, raw_note, side, raw.bpm, &segments.speeds, viewport));
        }
        // Stable, so above notes stay ahead of below notes at equal positions.
        notes.sort_by(|a, b| a.floor_position.total_cmp(&b.floor_position));

        let groups = group_by_speed(notes);
        let line = Self {
            index,
            bpm: raw.bpm,
            moves: EventCursor::new(EventKind::Move, segments.moves),
            rotates: EventCursor::new(EventKind::Rotate, segments.rotates),
            opacities: EventCursor::new(EventKind::Opacity, segments.opacities),
            speeds: EventCursor::new(EventKind::Speed, segments.speeds),
            transform: LineTransform {
                position: Vec2::ZERO,
                rotation: 0.0,
                opacity: 0.0,
                floor_position: 0.0,
                break_threshold: viewport.break_threshold(),
            },
            groups,
            color,
            viewport,
        };
        info!(
            "Line {}: bpm {}, {} notes in {} speed groups",
            line.index,
            line.bpm,
            line.note_count(),
            line.groups.len()
        );
        for group in &line.groups {
            debug!(
                "Line {}: speed x{} group holds {} notes",
                line.index,
                group.speed_multiplier,
                group.notes.len()
            );
        }
        Ok(line)
    }

    /// Advances the four event cursors to `now`.
    pub fn update(&mut self, now: f32) {
        self.transform.position = self.moves.advance(now).position();
        self.transform.rotation = self.rotates.advance(now).scalar();
        self.transform.opacity = self.opacities.advance(now).scalar();
        self.transform.floor_position = self.speeds.advance(now).scalar();
    }

    /// Steps every note group against the transform set by `update`.
    pub fn update_notes(&mut self, now: f32, sounds: &mut dyn SoundSink) {
        let transform = self.transform;
        for group in &mut self.groups {
            group.update(now, &transform, sounds);
        }
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        if self.transform.opacity <= 0.0 {
            return;
        }
        let [r, g, b] = self.color;
        let color: Color = [r, g, b, self.transform.opacity];
        let h = self.viewport.height;
        renderer.render_rect(
            self.transform.position,
            Vec2::new(LINE_WIDTH_HEIGHTS * h, LINE_THICKNESS_HEIGHTS * h),
            self.transform.rotation,
            color,
            ANCHOR_CENTER,
        );
    }

    pub fn render_notes(&self, renderer: &mut dyn Renderer) {
        for group in &self.groups {
            for note in group.visible() {
                note.render(renderer);
            }
        }
    }

    /// Notes still queued on this line.
    pub fn note_count(&self) -> usize {
        self.groups.iter().map(|g| g.notes.len()).sum()
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.groups.iter().flat_map(|g| g.notes.iter())
    }
}

/// Splits floor-ordered notes into per-speed groups, keeping first-appearance
/// group order and the relative order inside each group.
fn group_by_speed(notes: Vec<Note>) -> SmallVec<[NoteGroup; 4]> {
    let mut groups: SmallVec<[NoteGroup; 4]> = SmallVec::new();
    let mut by_speed: FxHashMap<u32, usize> = FxHashMap::default();
    for note in notes {
        let slot = *by_speed.entry(note.speed_multiplier.to_bits()).or_insert_with(|| {
            groups.push(NoteGroup::new(note.speed_multiplier));
            groups.len() - 1
        });
        groups[slot].notes.push(note);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::HitSound;
    use crate::core::gfx::DrawList;
    use crate::game::note::NoteState;
    use crate::game::parsing::official::{RawEvent, RawNote, RawSpeedEvent};

    const VIEW: ViewportMetrics = ViewportMetrics::new(800.0, 600.0);

    fn note(kind: i64, time: f32, speed: f32) -> RawNote {
        RawNote { kind, time, position_x: 0.0, hold_time: 0.0, speed }
    }

    // bpm 120: 32 ticks = 0.5 s. One speed segment covering 0..20 s at 1.0,
    // so floor position = 360 * seconds.
    fn raw_line(above: Vec<RawNote>, below: Vec<RawNote>) -> RawJudgeLine {
        RawJudgeLine {
            bpm: 120.0,
            judge_line_move_events: vec![RawEvent {
                start_time: 0.0,
                end_time: 640.0,
                start: 0.5,
                end: 0.5,
                start2: 0.5,
                end2: 0.5,
            }],
            judge_line_rotate_events: vec![RawEvent { start_time: 0.0, end_time: 640.0, ..RawEvent::default() }],
            judge_line_disappear_events: vec![RawEvent {
                start_time: 0.0,
                end_time: 640.0,
                start: 1.0,
                end: 1.0,
                ..RawEvent::default()
            }],
            speed_events: vec![RawSpeedEvent { start_time: 0.0, end_time: 1280.0, value: 1.0 }],
            notes_above: above,
            notes_below: below,
        }
    }

    #[test]
    fn notes_group_by_speed_in_first_appearance_order() {
        let raw = raw_line(
            vec![note(1, 64.0, 2.0), note(1, 32.0, 1.0), note(2, 96.0, 2.0)],
            vec![note(4, 48.0, 1.0)],
        );
        let line = JudgeLine::from_raw(0, &raw, VIEW, DEFAULT_LINE_COLOR).expect("valid line");
        assert_eq!(line.note_count(), 4);
        assert_eq!(line.groups.len(), 2);
        assert_eq!(line.groups[0].speed_multiplier, 1.0, "the earliest note scrolls at 1.0");
        let times: Vec<f32> = line.groups[0].notes.iter().map(|n| n.hit_time).collect();
        assert_eq!(times, vec![0.5, 0.75]);
        let kinds: Vec<NoteKind> = line.groups[1].notes.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NoteKind::Tap, NoteKind::Drag]);
    }

    #[test]
    fn rejects_unknown_note_type_and_bad_bpm() {
        let raw = raw_line(vec![note(9, 0.0, 1.0)], Vec::new());
        assert!(matches!(
            JudgeLine::from_raw(3, &raw, VIEW, DEFAULT_LINE_COLOR),
            Err(ChartError::UnknownNoteType { line: 3, kind: 9 })
        ));

        let mut raw = raw_line(Vec::new(), Vec::new());
        raw.bpm = 0.0;
        assert!(matches!(
            JudgeLine::from_raw(1, &raw, VIEW, DEFAULT_LINE_COLOR),
            Err(ChartError::InvalidBpm { line: 1, .. })
        ));
    }

    #[test]
    fn update_samples_all_cursors() {
        let mut line = JudgeLine::from_raw(0, &raw_line(Vec::new(), Vec::new()), VIEW, DEFAULT_LINE_COLOR)
            .expect("valid line");
        line.update(1.0);
        assert_eq!(line.transform.position, Vec2::ZERO, "UV center maps to the origin");
        assert!((line.transform.opacity - 1.0).abs() <= 1e-6);
        assert!((line.transform.floor_position - 360.0).abs() <= 1e-2);
        assert_eq!(line.transform.break_threshold, 1200.0);
    }

    #[test]
    fn hit_notes_leave_the_queue() {
        let raw = raw_line(vec![note(1, 32.0, 1.0), note(2, 64.0, 1.0), note(1, 160.0, 1.0)], Vec::new());
        let mut line = JudgeLine::from_raw(0, &raw, VIEW, DEFAULT_LINE_COLOR).expect("valid line");
        let mut sounds = Vec::new();
        line.update(1.0);
        line.update_notes(1.0, &mut sounds);
        assert_eq!(sounds, vec![HitSound::Tap, HitSound::Drag]);
        assert_eq!(line.note_count(), 1);
        assert_eq!(line.groups[0].cutoff, 1);
    }

    #[test]
    fn break_cuts_off_later_notes_in_the_group() {
        // Floor positions 360, 3600 and 3960: the second is beyond 1200.
        let raw = raw_line(vec![note(1, 64.0, 1.0), note(1, 640.0, 1.0), note(1, 704.0, 1.0)], Vec::new());
        let mut line = JudgeLine::from_raw(0, &raw, VIEW, DEFAULT_LINE_COLOR).expect("valid line");
        let mut sounds = Vec::new();
        line.update(0.0);
        line.update_notes(0.0, &mut sounds);
        let group = &line.groups[0];
        assert_eq!(group.notes.len(), 3, "broken notes stay queued");
        assert_eq!(group.cutoff, 1);
        assert_eq!(group.visible().len(), 1);

        let mut list = DrawList::new();
        line.render_notes(&mut list);
        assert_eq!(list.rect_count(), 1, "nothing past the broken note is drawn");
    }

    #[test]
    fn broken_note_stays_queued_and_cutoff_extends_again() {
        // Floor positions 360 and 1440; the threshold is 1200.
        let raw = raw_line(vec![note(1, 64.0, 1.0), note(1, 256.0, 1.0)], Vec::new());
        let mut line = JudgeLine::from_raw(0, &raw, VIEW, DEFAULT_LINE_COLOR).expect("valid line");
        let mut sounds = Vec::new();

        line.update(0.0);
        line.update_notes(0.0, &mut sounds);
        assert_eq!((line.groups[0].cutoff, line.groups[0].notes.len()), (1, 2));

        line.update(0.5);
        line.update_notes(0.5, &mut sounds);
        let group = &line.groups[0];
        assert_eq!((group.cutoff, group.notes.len()), (1, 2), "1260 away is still past the threshold");
        assert_eq!(group.notes[1].state, NoteState::Broken);

        line.update(0.7);
        line.update_notes(0.7, &mut sounds);
        let group = &line.groups[0];
        assert_eq!(group.notes.len(), 2, "nothing was hit");
        assert_eq!(group.cutoff, 2, "the broken note is back inside the threshold");
        assert_eq!(group.notes[1].state, NoteState::Scheduled);
        assert!(sounds.is_empty());

        let mut list = DrawList::new();
        line.render_notes(&mut list);
        assert_eq!(list.rect_count(), 2);
    }

    #[test]
    fn compaction_keeps_survivor_order_around_hits() {
        // Hits at 0.5 s and 1.0 s interleave with notes still pending.
        let raw = raw_line(
            vec![note(1, 32.0, 1.0), note(2, 48.0, 1.0), note(1, 64.0, 1.0), note(4, 96.0, 1.0), note(2, 128.0, 1.0)],
            Vec::new(),
        );
        let mut line = JudgeLine::from_raw(0, &raw, VIEW, DEFAULT_LINE_COLOR).expect("valid line");
        let mut sounds = Vec::new();
        line.update(0.5);
        line.update_notes(0.5, &mut sounds);
        assert_eq!(sounds, vec![HitSound::Tap]);

        line.update(1.0);
        line.update_notes(1.0, &mut sounds);
        let group = &line.groups[0];
        let kinds: Vec<NoteKind> = group.notes.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NoteKind::Flick, NoteKind::Drag], "queue order must be preserved");
        assert_eq!(group.cutoff, 2);
        assert_eq!(sounds, vec![HitSound::Tap, HitSound::Drag, HitSound::Tap]);
    }

    #[test]
    fn hit_note_ahead_leaves_only_the_later_note() {
        let raw = raw_line(vec![note(1, 64.0, 1.0), note(1, 256.0, 1.0)], Vec::new());
        let mut line = JudgeLine::from_raw(0, &raw, VIEW, DEFAULT_LINE_COLOR).expect("valid line");
        let mut sounds = Vec::new();
        line.update(0.0);
        line.update_notes(0.0, &mut sounds);
        assert_eq!(line.groups[0].cutoff, 1, "second note is 1440 away");

        line.update(0.5);
        line.update_notes(0.5, &mut sounds);
        assert_eq!(line.groups[0].cutoff, 1, "second note is still 1260 away");

        line.update(1.0);
        line.update_notes(1.0, &mut sounds);
        assert_eq!(line.groups[0].cutoff, 1);
        assert_eq!(line.note_count(), 1);
        assert!(line.groups[0].notes[0].current_floor_position <= 1200.0);
    }

    #[test]
    fn line_is_drawn_with_opacity_and_hidden_when_transparent() {
        let mut line = JudgeLine::from_raw(0, &raw_line(Vec::new(), Vec::new()), VIEW, DEFAULT_LINE_COLOR)
            .expect("valid line");
        line.update(0.5);
        let mut list = DrawList::new();
        line.render(&mut list);
        assert_eq!(list.rect_count(), 1);
        match list.commands[0] {
            crate::core::gfx::DrawCommand::Rect { size, color, .. } => {
                assert!((size.x - 3456.0).abs() <= 1e-2);
                assert!((size.y - 4.5).abs() <= 1e-4);
                assert_eq!(color[3], 1.0);
            }
            ref other => panic!("expected a rect, got {other:?}"),
        }

        line.transform.opacity = 0.0;
        list.clear();
        line.render(&mut list);
        assert!(list.is_empty());
    }
}
