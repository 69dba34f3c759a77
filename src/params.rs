//! Parameter definitions with documented ranges and semantics.
//!
//! All fixed values of the visualization live here: ring layout, torus
//! geometry, spectrum-analyzer configuration, audio-to-visual mapping and
//! camera/render settings.

use std::f32::consts::PI;

/// Descriptor for one ring of cloned prototype instances.
///
/// Immutable input to the ring layout generator.
#[derive(Debug, Clone)]
pub struct RingSpec {
    /// Ring radius in scene units (0 is valid: degenerate ring at the origin)
    pub radius: f32,

    /// Per-instance vertical scale (the resting height of each clone)
    pub scale_y: f32,

    /// Number of instances evenly spaced around the circle (0 is valid)
    pub count: usize,

    /// Emissive tint applied to each clone's material (linear RGB)
    pub tint: [f32; 3],
}

/// The three fixed rings of the scene: 24 + 16 + 32 = 72 instances.
pub fn default_rings() -> [RingSpec; 3] {
    [
        RingSpec {
            radius: 1.6,
            scale_y: 2.5,
            count: 24,
            tint: [0.8, 0.0, 1.0], // magenta
        },
        RingSpec {
            radius: 1.0,
            scale_y: 5.0,
            count: 16,
            tint: [0.0, 0.1, 1.0], // blue
        },
        RingSpec {
            radius: 2.2,
            scale_y: 1.0,
            count: 32,
            tint: [0.0, 0.8, 1.0], // cyan
        },
    ]
}

/// Decorative torus ring around the whole group.
#[derive(Debug, Clone)]
pub struct TorusSpec {
    /// Distance from torus center to tube center (scene units)
    pub radius: f32,

    /// Tube radius (scene units, thin wire look)
    pub tube_radius: f32,

    /// Segments around the tube cross-section
    pub radial_segments: usize,

    /// Segments around the main ring
    pub tubular_segments: usize,

    /// Emissive color (linear RGB)
    pub emissive: [f32; 3],

    /// Diffuse base color (linear RGB)
    pub base_color: [f32; 3],
}

impl Default for TorusSpec {
    fn default() -> Self {
        Self {
            radius: 2.6,
            tube_radius: 0.01,
            radial_segments: 16,
            tubular_segments: 100,
            emissive: [0.2, 0.3, 1.0],
            base_color: [0.0, 0.5, 0.0],
        }
    }
}

/// Spectrum analyzer configuration.
///
/// The magnitude array has `fft_size / 2` bins, refreshed on a fixed
/// interval by the analysis thread. Byte conversion follows the usual
/// analyser convention: temporally smoothed magnitudes, converted to dB and
/// mapped linearly from `[min_db, max_db]` onto `[0, 255]`.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// FFT window size in samples (must be a power of two)
    pub fft_size: usize,

    /// Analysis refresh interval (milliseconds); 16 ms ≈ one 60 Hz frame
    pub update_interval_ms: u64,

    /// Temporal smoothing constant in [0, 1): 0 = no smoothing
    pub smoothing: f32,

    /// Magnitude mapped to byte 0 (decibels)
    pub min_db: f32,

    /// Magnitude mapped to byte 255 (decibels)
    pub max_db: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            update_interval_ms: 16,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

impl AnalyzerConfig {
    /// Number of frequency bins in the magnitude array
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be a power of two, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(format!(
                "Smoothing must be in [0, 1), got {}",
                self.smoothing
            ));
        }
        if self.min_db >= self.max_db {
            return Err(format!(
                "dB range must be increasing, got [{}, {}]",
                self.min_db, self.max_db
            ));
        }
        Ok(())
    }
}

/// Mapping from byte frequency magnitudes to visual parameters.
#[derive(Debug, Clone)]
pub struct VisualMapping {
    /// Scale factor: normalized magnitude (m/255) → vertical scale offset
    /// Formula: scale_y = start_scale + (m/255) * this
    pub scale_gain: f32,

    /// Bloom strength floor (applied even at magnitude 0)
    /// Formula: strength = base + m[0] / divisor
    pub bloom_strength_base: f32,

    /// Divisor turning the bass bin into extra bloom strength
    pub bloom_strength_divisor: f32,

    /// Bloom radius at magnitude 0; fades to 0 as m[0] reaches the pivot
    /// Formula: radius = max(0, span / pivot * (pivot - m[0]))
    pub bloom_radius_span: f32,

    /// Magnitude at which bloom radius reaches 0
    pub bloom_radius_pivot: f32,

    /// Group yaw decrement per frame (radians)
    pub yaw_step: f32,
}

impl Default for VisualMapping {
    fn default() -> Self {
        Self {
            scale_gain: 5.0,
            bloom_strength_base: 2.0,
            bloom_strength_divisor: 300.0,
            bloom_radius_span: 0.5,
            bloom_radius_pivot: 200.0,
            yaw_step: 0.001,
        }
    }
}

/// Bloom post-processing settings (resting values before audio modulation).
#[derive(Debug, Clone, Copy)]
pub struct BloomSettings {
    /// Brightness threshold for the bright pass (0 = everything blooms)
    pub threshold: f32,

    /// Additive strength of the blurred bloom layer
    pub strength: f32,

    /// Blur radius multiplier (0 = tight glow)
    pub radius: f32,

    /// Exposure applied before tone mapping
    pub exposure: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            strength: 2.0,
            radius: 0.0,
            exposure: 1.0,
        }
    }
}

/// Orbit camera constraints.
#[derive(Debug, Clone)]
pub struct OrbitConstraints {
    /// Minimum distance from the origin (scene units)
    pub min_distance: f32,

    /// Maximum distance from the origin (scene units)
    pub max_distance: f32,

    /// Maximum polar angle from +Y (radians); π/2 keeps the camera at or
    /// above the horizontal plane
    pub max_polar: f32,

    /// Minimum polar angle from +Y (radians, keeps look_at well-defined)
    pub min_polar: f32,

    /// Drag sensitivity (radians per pixel)
    pub rotate_speed: f32,

    /// Zoom sensitivity (scene units per scroll line)
    pub zoom_speed: f32,
}

impl Default for OrbitConstraints {
    fn default() -> Self {
        Self {
            min_distance: 5.0,
            max_distance: 8.0,
            max_polar: PI / 2.0,
            min_polar: 0.05,
            rotate_speed: 0.005,
            zoom_speed: 0.5,
        }
    }
}

/// Rendering configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (scene units)
    pub near_plane: f32,

    /// Far clipping plane (scene units)
    pub far_plane: f32,

    /// Initial camera position (scene units)
    pub initial_eye: [f32; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 40.0,
            near_plane: 1.0,
            far_plane: 100.0,
            initial_eye: [-5.0, 2.3, -5.5],
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rings_total_count() {
        let rings = default_rings();
        let total: usize = rings.iter().map(|r| r.count).sum();
        assert_eq!(total, 72);
    }

    #[test]
    fn test_analyzer_config_bin_count() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.bin_count(), 128);
    }

    #[test]
    fn test_analyzer_config_validation() {
        assert!(AnalyzerConfig::default().validate().is_ok());

        let mut bad_size = AnalyzerConfig::default();
        bad_size.fft_size = 300;
        assert!(bad_size.validate().is_err());

        let mut bad_smoothing = AnalyzerConfig::default();
        bad_smoothing.smoothing = 1.0;
        assert!(bad_smoothing.validate().is_err());

        let mut bad_range = AnalyzerConfig::default();
        bad_range.min_db = -20.0;
        assert!(bad_range.validate().is_err());
    }
}
