use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

/* ============================== Public API ============================== */

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HitSound {
    Tap,
    Drag,
    Flick,
}

impl HitSound {
    pub const ALL: [HitSound; 3] = [Self::Tap, Self::Drag, Self::Flick];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tap => "tap",
            Self::Drag => "drag",
            Self::Flick => "flick",
        }
    }

    /// Resource path relative to the resources directory.
    pub const fn asset_path(&self) -> &'static str {
        match self {
            Self::Tap => "sounds/tap.ogg",
            Self::Drag => "sounds/drag.ogg",
            Self::Flick => "sounds/flick.ogg",
        }
    }
}

/// Fire-and-forget hit sound trigger. The simulation never waits on it.
pub trait SoundSink {
    fn play_sound(&mut self, sound: HitSound);
}

impl SoundSink for Vec<HitSound> {
    #[inline(always)]
    fn play_sound(&mut self, sound: HitSound) {
        self.push(sound);
    }
}

// Commands to the sound thread
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AudioCommand {
    PlaySfx(HitSound),
    Shutdown,
}

impl SoundSink for Sender<AudioCommand> {
    #[inline(always)]
    fn play_sound(&mut self, sound: HitSound) {
        // A closed channel only means nobody is listening any more.
        let _ = self.send(AudioCommand::PlaySfx(sound));
    }
}

/// One hit sound placed on the music timeline, for offline mixing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HitsoundCue {
    pub frame: u64,
    pub sound: HitSound,
}

/// Sample frame at which a cue starting `seconds` into the music begins,
/// truncated toward zero. Cues that land a whole frame or more before the
/// start of the music have no frame.
#[inline]
pub fn secs_to_frame(seconds: f64, sample_rate: u32) -> Option<u64> {
    let frame = (seconds * sample_rate as f64).trunc();
    if !frame.is_finite() || frame < 0.0 {
        None
    } else {
        Some(frame as u64)
    }
}

/// Play counts reported by the sound thread when it shuts down.
pub type PlayCounts = FxHashMap<HitSound, u32>;

/// Spawns the sound thread and returns its command sender. The thread only
/// tallies what it was asked to play; device output lives outside this crate.
pub fn spawn_sfx_thread() -> (Sender<AudioCommand>, thread::JoinHandle<PlayCounts>) {
    let (command_sender, command_receiver) = channel();
    let handle = thread::spawn(move || sfx_thread(command_receiver));
    info!("Hit sound thread started.");
    (command_sender, handle)
}

/* ============================ Engine internals ============================ */

fn sfx_thread(command_receiver: Receiver<AudioCommand>) -> PlayCounts {
    let mut counts = PlayCounts::default();
    while let Ok(cmd) = command_receiver.recv() {
        match cmd {
            AudioCommand::PlaySfx(sound) => {
                debug!("SFX: {}", sound.as_str());
                *counts.entry(sound).or_insert(0) += 1;
            }
            AudioCommand::Shutdown => break,
        }
    }
    if counts.is_empty() {
        warn!("Hit sound thread exiting without having played anything.");
    }
    counts
}
