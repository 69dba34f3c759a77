//! Audio ingestion: file decode, playback and spectrum analysis.
//!
//! A loaded track is fully decoded to mono samples up front; playback runs
//! through a rodio sink while a dedicated analysis thread follows the
//! playback cursor, computing byte frequency magnitudes into a shared array
//! read by the frame loop.

use std::f32::consts::PI;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::params::AnalyzerConfig;

/// Audio system for one loaded track.
///
/// Dropping it tears the whole pipeline down: the analysis thread is joined
/// and playback stops, so re-loading a track never leaves a previous one
/// running.
pub struct AudioSystem {
    /// Shared byte frequency magnitudes, refreshed by the analysis thread
    magnitudes: Arc<Mutex<Vec<u8>>>,

    sink: Arc<Sink>,
    duration_s: f32,

    stop: Arc<AtomicBool>,
    analysis_thread: Option<thread::JoinHandle<()>>,

    /// Audio output stream (kept alive for the lifetime of the track)
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
}

impl AudioSystem {
    /// Decode `path`, start playback at `volume` and spawn the analysis
    /// thread.
    pub fn load(path: &Path, config: &AnalyzerConfig, volume: f32) -> anyhow::Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;

        let (samples, sample_rate) = decode_samples(path)?;
        let duration_s = samples.len() as f32 / sample_rate as f32;
        log::info!(
            "Loaded {}: {:.1}s @ {}Hz",
            path.display(),
            duration_s,
            sample_rate
        );

        let (stream, stream_handle) =
            OutputStream::try_default().context("No audio output device found")?;
        let sink = Arc::new(Sink::try_new(&stream_handle).context("Failed to create sink")?);
        sink.set_volume(volume);

        let file = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let source = Decoder::new(BufReader::new(file))
            .with_context(|| format!("Failed to decode {}", path.display()))?;
        sink.append(source);

        let magnitudes = Arc::new(Mutex::new(vec![0u8; config.bin_count()]));
        let stop = Arc::new(AtomicBool::new(false));

        let analysis_thread = spawn_analysis_thread(
            config.clone(),
            Arc::new(samples),
            sample_rate,
            Arc::clone(&sink),
            Arc::clone(&magnitudes),
            Arc::clone(&stop),
        );

        Ok(Self {
            magnitudes,
            sink,
            duration_s,
            stop,
            analysis_thread: Some(analysis_thread),
            _stream: stream,
            _stream_handle: stream_handle,
        })
    }

    /// Snapshot of the current frequency magnitude array.
    pub fn magnitudes(&self) -> Vec<u8> {
        self.magnitudes.lock().unwrap().clone()
    }

    /// Current playback position (seconds).
    pub fn position_s(&self) -> f32 {
        self.sink.get_pos().as_secs_f32()
    }

    /// Track duration (seconds).
    pub fn duration_s(&self) -> f32 {
        self.duration_s
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.analysis_thread.take() {
            let _ = handle.join();
        }
        self.sink.stop();
    }
}

/// Decode a whole audio file to mono f32 samples.
///
/// # Returns
/// Tuple of (mono samples, sample rate in Hz)
pub fn decode_samples(path: &Path) -> anyhow::Result<(Vec<f32>, u32)> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("Unrecognized audio format: {}", path.display()))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("No audio track in {}", path.display()))?;

    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(2)
        .max(1);
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Unsupported codec: {}", path.display()))?;

    let mut samples: Vec<f32> = Vec::new();
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        let Ok(decoded) = decoder.decode(&packet) else {
            continue; // skip damaged packets
        };

        let spec = *decoded.spec();
        let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks(channels) {
            samples.push(frame.iter().sum::<f32>() / channels as f32);
        }
    }

    if samples.is_empty() {
        bail!("Decoded no audio from {}", path.display());
    }

    Ok((samples, sample_rate))
}

/// Spawn the spectrum analysis thread.
///
/// On a fixed interval it reads the playback cursor, analyzes the window of
/// samples ending there and refreshes the shared magnitude array in place.
fn spawn_analysis_thread(
    config: AnalyzerConfig,
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    sink: Arc<Sink>,
    magnitudes: Arc<Mutex<Vec<u8>>>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut analyzer = SpectrumAnalyzer::new(config.clone());
        let mut out = vec![0u8; config.bin_count()];

        while !stop.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(config.update_interval_ms));

            let cursor = (sink.get_pos().as_secs_f64() * sample_rate as f64) as usize;
            analyzer.analyze(&samples, cursor, &mut out);

            magnitudes.lock().unwrap().copy_from_slice(&out);
        }
    })
}

/// Windowed FFT analysis producing byte frequency magnitudes.
///
/// Magnitudes are normalized by the FFT size, temporally smoothed, converted
/// to decibels and mapped linearly from `[min_db, max_db]` onto `[0, 255]`.
pub struct SpectrumAnalyzer {
    config: AnalyzerConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(config.fft_size);
        let window = (0..config.fft_size)
            .map(|i| hann_window(i, config.fft_size))
            .collect();

        Self {
            smoothed: vec![0.0; config.bin_count()],
            buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            window,
            fft,
            config,
        }
    }

    /// Analyze the window of samples ending at `cursor`, writing one byte
    /// per bin into `out`. Samples outside the track read as silence, so a
    /// cursor near the start or past the end is fine.
    pub fn analyze(&mut self, samples: &[f32], cursor: usize, out: &mut [u8]) {
        let size = self.config.fft_size;
        let start = cursor as i64 - size as i64;

        for i in 0..size {
            let idx = start + i as i64;
            let sample = if idx >= 0 {
                samples.get(idx as usize).copied().unwrap_or(0.0)
            } else {
                0.0
            };
            self.buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let tau = self.config.smoothing;
        for (k, byte) in out.iter_mut().enumerate().take(self.config.bin_count()) {
            let magnitude = self.buffer[k].norm() / size as f32;
            self.smoothed[k] = tau * self.smoothed[k] + (1.0 - tau) * magnitude;

            let db = 20.0 * self.smoothed[k].log10();
            *byte = db_to_byte(db, self.config.min_db, self.config.max_db);
        }
    }
}

/// Map a decibel magnitude onto [0, 255] over the configured dB range.
fn db_to_byte(db: f32, min_db: f32, max_db: f32) -> u8 {
    let scaled = 255.0 / (max_db - min_db) * (db - min_db);
    scaled.clamp(0.0, 255.0) as u8
}

/// Hann window function for FFT analysis
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let size = 256;

        // Hann window is 0 at the edges, 1 at the center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_db_to_byte_boundaries() {
        assert_eq!(db_to_byte(-100.0, -100.0, -30.0), 0);
        assert_eq!(db_to_byte(-30.0, -100.0, -30.0), 255);
        assert_eq!(db_to_byte(-20.0, -100.0, -30.0), 255);
        assert_eq!(db_to_byte(-120.0, -100.0, -30.0), 0);
        assert_eq!(db_to_byte(f32::NEG_INFINITY, -100.0, -30.0), 0);

        // Monotonic in between
        let mid_low = db_to_byte(-80.0, -100.0, -30.0);
        let mid_high = db_to_byte(-50.0, -100.0, -30.0);
        assert!(mid_low < mid_high);
    }

    #[test]
    fn test_analyzer_silence_is_all_zero() {
        let config = AnalyzerConfig::default();
        let mut analyzer = SpectrumAnalyzer::new(config.clone());
        let mut out = vec![0u8; config.bin_count()];

        let samples = vec![0.0f32; 4096];
        analyzer.analyze(&samples, 1024, &mut out);

        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_analyzer_sine_peaks_at_its_bin() {
        let config = AnalyzerConfig::default();
        let size = config.fft_size;
        let bin = 8;

        // Full-scale sine exactly on bin 8 of the analysis window
        let samples: Vec<f32> = (0..size * 4)
            .map(|n| (2.0 * PI * bin as f32 * n as f32 / size as f32).sin())
            .collect();

        let mut analyzer = SpectrumAnalyzer::new(config.clone());
        let mut out = vec![0u8; config.bin_count()];
        analyzer.analyze(&samples, size, &mut out);

        // A full-scale tone saturates its own bin and towers over far bins
        assert_eq!(out[bin], 255);
        assert!(out[bin] > out[bin + 16]);
        assert!(out[bin + 64] < 64);
    }

    #[test]
    fn test_analyzer_cursor_out_of_range_is_silence() {
        let config = AnalyzerConfig::default();
        let mut analyzer = SpectrumAnalyzer::new(config.clone());
        let mut out = vec![0u8; config.bin_count()];

        let samples = vec![0.5f32; 16];

        // Cursor at 0: the whole window precedes the track
        analyzer.analyze(&samples, 0, &mut out);
        assert!(out.iter().all(|&b| b == 0));

        // Cursor far past the end: the window is entirely silence
        let mut analyzer = SpectrumAnalyzer::new(config.clone());
        analyzer.analyze(&samples, 1_000_000, &mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_analyzer_smoothing_decays_after_signal_stops() {
        let config = AnalyzerConfig::default();
        let size = config.fft_size;
        let bin = 4;

        let mut samples: Vec<f32> = (0..size)
            .map(|n| (2.0 * PI * bin as f32 * n as f32 / size as f32).sin())
            .collect();
        samples.extend(std::iter::repeat(0.0).take(size * 8));

        let mut analyzer = SpectrumAnalyzer::new(config.clone());
        let mut out = vec![0u8; config.bin_count()];

        analyzer.analyze(&samples, size, &mut out);
        let loud = out[bin];

        // Keep analyzing silence: the smoothed magnitude decays toward zero
        let mut previous = loud;
        for step in 2..8 {
            analyzer.analyze(&samples, size * step, &mut out);
            assert!(out[bin] <= previous);
            previous = out[bin];
        }
        assert!(previous < loud);
    }
}
