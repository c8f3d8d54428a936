//! Local audible cue capability

use std::io::Write;
use tracing::warn;

/// Plays a short audible cue on the local device
pub trait Chime: Send + Sync {
    fn play(&self) -> Result<(), String>;
}

/// Play the chime, logging and swallowing any failure
pub fn ring(chime: &dyn Chime) {
    if let Err(e) = chime.play() {
        warn!("Audio playback prevented: {}", e);
    }
}

/// Used where no audio output exists
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChime;

impl Chime for NullChime {
    fn play(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Rings the terminal bell on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl Chime for TerminalBell {
    fn play(&self) -> Result<(), String> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(b"\x07")
            .and_then(|()| stdout.flush())
            .map_err(|e| format!("Failed to ring terminal bell: {}", e))
    }
}
