//! Per-frame audio-to-visual mapping.
//!
//! Pure state computation, separated from rendering side effects: the frame
//! loop feeds in the current magnitude snapshot and applies the returned
//! frame to the scene and the bloom chain.

use crate::params::VisualMapping;

/// Visual parameters for one rendered frame.
#[derive(Debug, Clone)]
pub struct VisualFrame {
    /// Additive bloom strength, driven by the bass bin
    pub bloom_strength: f32,

    /// Bloom blur radius, fading out as the bass bin rises
    pub bloom_radius: f32,

    /// New group yaw (radians)
    pub yaw: f32,

    /// Vertical scale per visualization entry, aligned with `base_scales`
    pub scales: Vec<f32>,
}

/// Compute the visual state for one frame.
///
/// Each entry reads bin `i mod magnitudes.len()`, so every object reacts to
/// some frequency even when there are more objects than bins. Bin 0 (bass)
/// drives the global bloom. With no magnitudes yet (no track loaded) the
/// scene stays at rest.
pub fn compute_visual_frame(
    base_scales: &[f32],
    magnitudes: &[u8],
    previous_yaw: f32,
    mapping: &VisualMapping,
) -> VisualFrame {
    if magnitudes.is_empty() {
        return VisualFrame {
            bloom_strength: mapping.bloom_strength_base,
            bloom_radius: 0.0,
            yaw: previous_yaw,
            scales: base_scales.to_vec(),
        };
    }

    let bass = magnitudes[0] as f32;

    let radius =
        mapping.bloom_radius_span / mapping.bloom_radius_pivot * (mapping.bloom_radius_pivot - bass);
    let bloom_radius = radius.max(0.0);

    let bloom_strength = mapping.bloom_strength_base + bass / mapping.bloom_strength_divisor;

    let scales = base_scales
        .iter()
        .enumerate()
        .map(|(i, base)| {
            let magnitude = magnitudes[i % magnitudes.len()] as f32 / 255.0;
            base + magnitude * mapping.scale_gain
        })
        .collect();

    VisualFrame {
        bloom_strength,
        bloom_radius,
        yaw: previous_yaw - mapping.yaw_step,
        scales,
    }
}

/// Playback progress as a percentage of track duration, clamped to [0, 100].
pub fn progress_percent(position_s: f32, duration_s: f32) -> f32 {
    if duration_s <= 0.0 {
        return 0.0;
    }
    (100.0 * position_s / duration_s).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> VisualMapping {
        VisualMapping::default()
    }

    #[test]
    fn test_scale_boundaries() {
        let frame = compute_visual_frame(&[3.0], &[0], 0.0, &mapping());
        assert_eq!(frame.scales[0], 3.0);

        let frame = compute_visual_frame(&[3.0], &[255], 0.0, &mapping());
        assert!((frame.scales[0] - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_index_modulo_wraparound() {
        // 5 entries over 3 bins: entries i and i + 3 read the same bin
        let base = [1.0; 5];
        let frame = compute_visual_frame(&base, &[10, 20, 30], 0.0, &mapping());
        assert_eq!(frame.scales[0], frame.scales[3]);
        assert_eq!(frame.scales[1], frame.scales[4]);
        assert_ne!(frame.scales[0], frame.scales[1]);
    }

    #[test]
    fn test_bloom_radius_never_negative() {
        for m in 0..=255u8 {
            let frame = compute_visual_frame(&[1.0], &[m], 0.0, &mapping());
            assert!(frame.bloom_radius >= 0.0, "radius negative at m={}", m);
        }

        // Clamp boundary: radius hits exactly 0 at the pivot magnitude
        let frame = compute_visual_frame(&[1.0], &[200], 0.0, &mapping());
        assert_eq!(frame.bloom_radius, 0.0);
        let frame = compute_visual_frame(&[1.0], &[255], 0.0, &mapping());
        assert_eq!(frame.bloom_radius, 0.0);
    }

    #[test]
    fn test_end_to_end_scenario() {
        // Magnitudes [100, 50, 200] with base scale 3
        let base = [3.0; 3];
        let frame = compute_visual_frame(&base, &[100, 50, 200], 0.0, &mapping());

        assert!((frame.scales[0] - (3.0 + 100.0 / 255.0 * 5.0)).abs() < 1e-5);
        assert!((frame.scales[1] - (3.0 + 50.0 / 255.0 * 5.0)).abs() < 1e-5);
        assert!((frame.scales[2] - (3.0 + 200.0 / 255.0 * 5.0)).abs() < 1e-5);
        assert!((frame.scales[0] - 4.96).abs() < 0.01);
        assert!((frame.scales[1] - 3.98).abs() < 0.01);
        assert!((frame.scales[2] - 6.92).abs() < 0.01);

        assert!((frame.bloom_radius - 0.25).abs() < 1e-6);
        assert!((frame.bloom_strength - (2.0 + 100.0 / 300.0)).abs() < 1e-6);
    }

    #[test]
    fn test_yaw_advances_by_fixed_step() {
        let frame = compute_visual_frame(&[1.0], &[0], 1.5, &mapping());
        assert!((frame.yaw - (1.5 - 0.001)).abs() < 1e-7);

        // Monotonic over several frames
        let mut yaw = 0.0;
        for _ in 0..10 {
            let prev = yaw;
            yaw = compute_visual_frame(&[1.0], &[128], yaw, &mapping()).yaw;
            assert!(yaw < prev);
        }
    }

    #[test]
    fn test_no_magnitudes_is_resting_state() {
        let frame = compute_visual_frame(&[2.5, 5.0], &[], 0.7, &mapping());
        assert_eq!(frame.scales, vec![2.5, 5.0]);
        assert_eq!(frame.yaw, 0.7);
        assert_eq!(frame.bloom_radius, 0.0);
        assert_eq!(frame.bloom_strength, 2.0);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0.0, 120.0), 0.0);
        assert!((progress_percent(60.0, 120.0) - 50.0).abs() < 1e-6);
        assert_eq!(progress_percent(120.0, 120.0), 100.0);
        // Cursor slightly past the end still reads 100%
        assert_eq!(progress_percent(121.0, 120.0), 100.0);
        // Degenerate duration
        assert_eq!(progress_percent(1.0, 0.0), 0.0);
    }
}
