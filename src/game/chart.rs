use crate::core::audio::{HitsoundCue, SoundSink, secs_to_frame};
use crate::core::gfx::Renderer;
use crate::game::line::{DEFAULT_LINE_COLOR, JudgeLine};
use crate::game::parsing::official::{ChartDocument, FormatHeader, is_supported_format};
use crate::game::timing::ViewportMetrics;
use log::{debug, info};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Unsupported chart formatVersion {0}")]
    UnsupportedFormat(i64),

    #[error("Chart has no formatVersion field")]
    MissingFormatVersion,

    #[error("Line {line} has invalid bpm {bpm}")]
    InvalidBpm { line: usize, bpm: f32 },

    #[error("Line {line} has unknown note type {kind}")]
    UnknownNoteType { line: usize, kind: i64 },

    #[error("Malformed chart JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not read chart: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Chart {
    pub format_version: i64,
    /// Seconds of music before chart time zero.
    pub offset: f32,
    pub lines: Vec<JudgeLine>,
}

impl Chart {
    pub fn from_path(path: &Path, viewport: ViewportMetrics) -> Result<Self, ChartError> {
        let json = std::fs::read_to_string(path)?;
        info!("Loading chart '{}'", path.display());
        Self::from_json_str(&json, viewport)
    }

    /// Parses and builds a chart. The format version is checked on its own
    /// before the rest of the document is interpreted.
    pub fn from_json_str(json: &str, viewport: ViewportMetrics) -> Result<Self, ChartError> {
        let header: FormatHeader = serde_json::from_str(json)?;
        let version = header.format_version.ok_or(ChartError::MissingFormatVersion)?;
        if !is_supported_format(version) {
            return Err(ChartError::UnsupportedFormat(version));
        }
        let doc: ChartDocument = serde_json::from_str(json)?;
        Self::from_document(&doc, viewport)
    }

    pub fn from_document(doc: &ChartDocument, viewport: ViewportMetrics) -> Result<Self, ChartError> {
        if !is_supported_format(doc.format_version) {
            return Err(ChartError::UnsupportedFormat(doc.format_version));
        }

        let lines = doc
            .judge_line_list
            .iter()
            .enumerate()
            .map(|(index, raw)| JudgeLine::from_raw(index, raw, viewport, DEFAULT_LINE_COLOR))
            .collect::<Result<Vec<_>, _>>()?;

        let chart = Self { format_version: doc.format_version, offset: doc.offset, lines };
        info!(
            "Chart loaded: formatVersion {}, offset {:.3}s, {} lines, {} notes",
            chart.format_version,
            chart.offset,
            chart.lines.len(),
            chart.note_count()
        );
        Ok(chart)
    }

    pub fn with_line_color(mut self, color: [f32; 3]) -> Self {
        for line in &mut self.lines {
            line.color = color;
        }
        self
    }

    /// Music time to chart time.
    #[inline(always)]
    pub fn to_chart_time(&self, now: f32) -> f32 {
        now - self.offset
    }

    /// Steps the whole chart to chart time `now`. Every line transform is
    /// advanced before any note reads one.
    pub fn update(&mut self, now: f32, sounds: &mut dyn SoundSink) {
        for line in &mut self.lines {
            line.update(now);
        }
        for line in &mut self.lines {
            line.update_notes(now, sounds);
        }
    }

    /// Draws every line, then every visible note.
    pub fn render(&self, renderer: &mut dyn Renderer) {
        for line in &self.lines {
            line.render(renderer);
        }
        for line in &self.lines {
            line.render_notes(renderer);
        }
    }

    /// Notes not yet hit, across all lines.
    pub fn note_count(&self) -> usize {
        self.lines.iter().map(JudgeLine::note_count).sum()
    }

    /// Music time at which the last queued note (hold tail included) ends.
    pub fn last_note_end(&self) -> Option<f32> {
        self.lines
            .iter()
            .flat_map(JudgeLine::notes)
            .map(|note| note.end_time + self.offset)
            .reduce(f32::max)
    }

    /// Hit sounds for every queued note placed on the music timeline, in line
    /// and group order. Notes before the start of the music are skipped.
    pub fn hitsound_cues(&self, sample_rate: u32) -> Vec<HitsoundCue> {
        let cues: Vec<HitsoundCue> = self
            .lines
            .iter()
            .flat_map(JudgeLine::notes)
            .filter_map(|note| {
                let seconds = note.hit_time as f64 + self.offset as f64;
                secs_to_frame(seconds, sample_rate).map(|frame| HitsoundCue {
                    frame,
                    sound: note.kind.hitsound(),
                })
            })
            .collect();
        debug!("Scheduled {} hit sound cues at {} Hz", cues.len(), sample_rate);
        cues
    }
}
