mod config;
mod core;
mod game;

use crate::config::PlaybackMode;
use crate::core::audio::{AudioCommand, HitSound, spawn_sfx_thread};
use crate::core::clock::{FixedStepClock, RealtimeClock};
use crate::core::gfx::DrawList;
use crate::game::chart::Chart;
use log::{debug, info};
use std::time::Duration;

// Extra playback after the last note when the music length is not configured.
const TRAILING_SECONDS: f32 = 1.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let mut chart = Chart::from_path(&cfg.chart_path, cfg.viewport())?.with_line_color(cfg.line_color);
    let music_length = if cfg.music_length_seconds > 0.0 {
        cfg.music_length_seconds
    } else {
        chart.last_note_end().unwrap_or(0.0).max(0.0) + TRAILING_SECONDS
    };

    let cues = chart.hitsound_cues(cfg.hitsound_sample_rate);
    info!(
        "{} hit sound cues over {:.2}s of music at {} Hz",
        cues.len(),
        music_length,
        cfg.hitsound_sample_rate
    );

    if let (Some(first), Some(last)) = (cues.first(), cues.last()) {
        debug!(
            "First cue {} at frame {}, last cue {} at frame {}",
            first.sound.as_str(),
            first.frame,
            last.sound.as_str(),
            last.frame
        );
    }

    let (mut sfx, sfx_thread) = spawn_sfx_thread();
    let mut draw_list = DrawList::new();
    let mut frames: u64 = 0;
    let mut peak_draws = 0;

    match cfg.playback_mode {
        PlaybackMode::Offline => {
            let clock = FixedStepClock::new(cfg.video_fps, music_length);
            info!(
                "Offline playback: {} frames at {} fps ({:.4}s per frame)",
                clock.total_frames(),
                cfg.video_fps,
                clock.frame_time()
            );
            for now in clock.times() {
                chart.update(chart.to_chart_time(now), &mut sfx);
                draw_list.clear();
                chart.render(&mut draw_list);
                peak_draws = peak_draws.max(draw_list.len());
                frames += 1;
            }
        }
        PlaybackMode::Realtime => {
            let frame_time = Duration::from_secs_f32(1.0 / cfg.video_fps.max(1) as f32);
            let clock = RealtimeClock::start();
            info!("Realtime playback for {music_length:.2}s");
            loop {
                let now = clock.now();
                if now > music_length {
                    break;
                }
                chart.update(chart.to_chart_time(now), &mut sfx);
                draw_list.clear();
                chart.render(&mut draw_list);
                peak_draws = peak_draws.max(draw_list.len());
                frames += 1;
                std::thread::sleep(frame_time);
            }
        }
    }

    let _ = sfx.send(AudioCommand::Shutdown);
    let played = sfx_thread.join().map_err(|_| "hit sound thread panicked")?;
    for sound in HitSound::ALL {
        debug!(
            "{} ({}): played {} times",
            sound.as_str(),
            sound.asset_path(),
            played.get(&sound).copied().unwrap_or(0)
        );
    }
    info!(
        "Playback finished: {} frames, peak {} draw calls, {} notes left unhit",
        frames,
        peak_draws,
        chart.note_count()
    );
    Ok(())
}
