use crate::game::line::DEFAULT_LINE_COLOR;
use crate::game::timing::ViewportMetrics;
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

const CONFIG_PATH: &str = "phisync.ini";
const CONFIG_PATH_ENV: &str = "PHISYNC_CONFIG";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content);
        Ok(())
    }

    pub fn parse(&mut self, content: &str) {
        self.sections.clear();

        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let section = line[1..line.len() - 1].trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            // Key/value pair: key=value
            if let Some(eq_idx) = line.find('=') {
                let (key_raw, value_raw) = line.split_at(eq_idx);
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                let value = value_raw[1..].trim().to_string();
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

/// How frame times are produced: the wall clock, or fixed `1/fps` steps for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Realtime,
    Offline,
}

impl PlaybackMode {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "Realtime",
            Self::Offline => "Offline",
        }
    }
}

impl FromStr for PlaybackMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realtime" => Ok(Self::Realtime),
            "offline" => Ok(Self::Offline),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub display_width: u32,
    pub display_height: u32,
    pub video_fps: u32,
    pub playback_mode: PlaybackMode,
    pub chart_path: PathBuf,
    // 0 = derive from the last note's end time.
    pub music_length_seconds: f32,
    pub hitsound_sample_rate: u32,
    pub log_level: LogLevel,
    pub line_color: [f32; 3],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_width: 800,
            display_height: 600,
            video_fps: 60,
            playback_mode: PlaybackMode::Offline,
            chart_path: PathBuf::from("chart.json"),
            music_length_seconds: 0.0,
            hitsound_sample_rate: 48_000,
            log_level: LogLevel::Info,
            line_color: DEFAULT_LINE_COLOR,
        }
    }
}

impl Config {
    pub fn viewport(&self) -> ViewportMetrics {
        ViewportMetrics::new(self.display_width as f32, self.display_height as f32)
    }

    /// Fills a config from parsed INI data, keeping the default for any key
    /// that is missing or does not parse.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let default = Self::default();

        let positive_u32 = |key: &str, fallback: u32| {
            conf.get("Options", key)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(fallback)
        };

        let playback_mode = match conf.get("Options", "PlaybackMode") {
            Some(v) => PlaybackMode::from_str(&v).unwrap_or_else(|()| {
                warn!("Unknown PlaybackMode '{v}', using {}", default.playback_mode.as_str());
                default.playback_mode
            }),
            None => default.playback_mode,
        };
        let log_level = match conf.get("Options", "LogLevel") {
            Some(v) => LogLevel::from_str(&v).unwrap_or_else(|()| {
                warn!("Unknown LogLevel '{v}', using {}", default.log_level.as_str());
                default.log_level
            }),
            None => default.log_level,
        };
        let line_color = match conf.get("Options", "LineColor") {
            Some(v) => parse_color(&v).unwrap_or_else(|| {
                warn!("Malformed LineColor '{v}', using the default");
                default.line_color
            }),
            None => default.line_color,
        };

        Self {
            display_width: positive_u32("DisplayWidth", default.display_width),
            display_height: positive_u32("DisplayHeight", default.display_height),
            video_fps: positive_u32("VideoFps", default.video_fps),
            playback_mode,
            chart_path: conf
                .get("Options", "ChartPath")
                .filter(|v| !v.is_empty())
                .map_or(default.chart_path, PathBuf::from),
            music_length_seconds: conf
                .get("Options", "MusicLengthSeconds")
                .and_then(|v| v.parse::<f32>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(default.music_length_seconds),
            hitsound_sample_rate: positive_u32("HitsoundSampleRate", default.hitsound_sample_rate),
            log_level,
            line_color,
        }
    }
}

/// Parses `r,g,b` with each channel in `[0, 1]`.
fn parse_color(s: &str) -> Option<[f32; 3]> {
    let mut out = [0.0_f32; 3];
    let mut parts = s.split(',');
    for slot in &mut out {
        let v = parts.next()?.trim().parse::<f32>().ok()?;
        if !(0.0..=1.0).contains(&v) {
            return None;
        }
        *slot = v;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

// Global configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- File I/O ---

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV).map_or_else(|| PathBuf::from(CONFIG_PATH), PathBuf::from)
}

fn default_config_contents() -> String {
    let default = Config::default();
    let [r, g, b] = default.line_color;

    // [Options] section - keys in alphabetical order
    let mut content = String::new();
    content.push_str("[Options]\n");
    content.push_str(&format!("ChartPath={}\n", default.chart_path.display()));
    content.push_str(&format!("DisplayHeight={}\n", default.display_height));
    content.push_str(&format!("DisplayWidth={}\n", default.display_width));
    content.push_str(&format!("HitsoundSampleRate={}\n", default.hitsound_sample_rate));
    content.push_str(&format!("LineColor={r},{g},{b}\n"));
    content.push_str(&format!("LogLevel={}\n", default.log_level.as_str()));
    content.push_str(&format!("MusicLengthSeconds={}\n", default.music_length_seconds));
    content.push_str(&format!("PlaybackMode={}\n", default.playback_mode.as_str()));
    content.push_str(&format!("VideoFps={}\n", default.video_fps));
    content
}

fn create_default_config_file(path: &Path) -> Result<(), std::io::Error> {
    info!("'{}' not found, creating with default values.", path.display());
    std::fs::write(path, default_config_contents())
}

/// Reads `path` into a config, writing a default file first if none exists.
pub fn load_from(path: &Path) -> Config {
    if !path.exists()
        && let Err(e) = create_default_config_file(path)
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(path) {
        Ok(()) => {
            let cfg = Config::from_ini(&conf);
            info!("Configuration loaded from '{}'.", path.display());
            cfg
        }
        Err(e) => {
            warn!("Failed to load '{}': {e}. Using default values.", path.display());
            Config::default()
        }
    }
}

pub fn load() {
    let cfg = load_from(&config_path());
    *CONFIG.lock().unwrap_or_else(PoisonError::into_inner) = cfg;
}

pub fn get() -> Config {
    CONFIG.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ini(content: &str) -> SimpleIni {
        let mut conf = SimpleIni::new();
        conf.parse(content);
        conf
    }

    #[test]
    fn reads_every_option() {
        let conf = ini(
            "; comment\n[Options]\nDisplayWidth = 1280\nDisplayHeight=720\nVideoFps=30\n\
             PlaybackMode=realtime\nChartPath=charts/a.json\nMusicLengthSeconds=95.5\n\
             HitsoundSampleRate=44100\nLogLevel=debug\nLineColor=1.0, 0.5, 0\n",
        );
        let cfg = Config::from_ini(&conf);
        assert_eq!((cfg.display_width, cfg.display_height, cfg.video_fps), (1280, 720, 30));
        assert_eq!(cfg.playback_mode, PlaybackMode::Realtime);
        assert_eq!(cfg.chart_path, PathBuf::from("charts/a.json"));
        assert_eq!(cfg.music_length_seconds, 95.5);
        assert_eq!(cfg.hitsound_sample_rate, 44_100);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.line_color, [1.0, 0.5, 0.0]);
        assert_eq!(cfg.viewport(), ViewportMetrics::new(1280.0, 720.0));
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let conf = ini("[Options]\nDisplayWidth=wide\nVideoFps=0\nPlaybackMode=Turbo\nLineColor=2,0,0\n");
        let cfg = Config::from_ini(&conf);
        let default = Config::default();
        assert_eq!(cfg.display_width, default.display_width);
        assert_eq!(cfg.video_fps, default.video_fps, "zero fps is rejected");
        assert_eq!(cfg.playback_mode, PlaybackMode::Offline);
        assert_eq!(cfg.line_color, DEFAULT_LINE_COLOR);
    }

    #[test]
    fn keys_outside_options_are_ignored() {
        let cfg = Config::from_ini(&ini("DisplayWidth=1\n[Other]\nDisplayHeight=2\n"));
        assert_eq!(cfg.display_width, 800);
        assert_eq!(cfg.display_height, 600);
    }

    #[test]
    fn default_file_round_trips_to_defaults() {
        let cfg = Config::from_ini(&ini(&default_config_contents()));
        let default = Config::default();
        assert_eq!(cfg.display_width, default.display_width);
        assert_eq!(cfg.playback_mode, default.playback_mode);
        assert_eq!(cfg.log_level, default.log_level);
        assert_eq!(cfg.chart_path, default.chart_path);
        assert_eq!(cfg.line_color, default.line_color);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = std::env::temp_dir().join(format!("phisync-test-{}.ini", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let cfg = load_from(&path);
        assert!(path.exists(), "a default config should have been written");
        assert_eq!(cfg.video_fps, 60);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn log_levels_parse_case_insensitively() {
        assert_eq!(LogLevel::from_str("TRACE"), Ok(LogLevel::Trace));
        assert_eq!(LogLevel::from_str(" warning "), Ok(LogLevel::Warn));
        assert!(LogLevel::from_str("loud").is_err());
        assert_eq!(LogLevel::Error.as_level_filter(), log::LevelFilter::Error);
    }
}
