//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Ringpulse")]
#[command(about = "Audio-reactive ring visualizer", long_about = None)]
pub struct Args {
    /// Audio file to load and play at startup (or drop one onto the window)
    #[arg(long, value_name = "FILE")]
    pub audio: Option<PathBuf>,

    /// Prototype model to clone into the rings
    #[arg(long, value_name = "FILE", default_value = "models/prototype.glb")]
    pub model: PathBuf,

    /// Playback volume, 0.0 to 1.0
    #[arg(long, value_name = "VOLUME", default_value = "0.1")]
    pub volume: f32,
}

impl Args {
    /// Playback volume clamped to the valid range
    pub fn clamped_volume(&self) -> f32 {
        if !(0.0..=1.0).contains(&self.volume) {
            log::warn!("Volume {} out of range, clamping", self.volume);
        }
        self.volume.clamp(0.0, 1.0)
    }
}
