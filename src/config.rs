//! Threshold derivation for both decoder variants.
//!
//! All widths are expressed in samples and truncated to integers once, here,
//! at construction time. Nothing downstream ever compares a float against a
//! sample counter.

/// Width thresholds for the gap-based front end (`GapDecoder`).
#[derive(Debug, Clone, Copy)]
pub struct GapThresholds {
    pub gap_width: u32,
    pub gap_min: u32,
    pub gap_max: u32,
    pub long_width: u32,
    pub short_width: u32,
    pub start_min: u32,
    pub start_max: u32,
    pub long_threshold: u32,
    pub short_threshold: u32,
    pub end_threshold: u32,
}

impl GapThresholds {
    pub fn new(sps: f64) -> Self {
        let gap_width = (4.0 * sps) as u32;
        let gap_min = gap_width / 2;
        let gap_max = gap_width + gap_width / 2 + 4;

        let long_width = (8.0 * sps) as u32;
        let short_width = (4.0 * sps) as u32;

        let start_min = long_width;
        let start_max = (1.5 * long_width as f64) as u32;

        let long_threshold = long_width - long_width / 8;
        let short_threshold = short_width - short_width / 8;

        let end_threshold = (1.5 * long_width as f64) as u32;

        GapThresholds {
            gap_width,
            gap_min,
            gap_max,
            long_width,
            short_width,
            start_min,
            start_max,
            long_threshold,
            short_threshold,
            end_threshold,
        }
    }
}

/// Width thresholds for the window-sum front end (`WindowDecoder`).
#[derive(Debug, Clone, Copy)]
pub struct WindowThresholds {
    pub bit_window: u32,
    pub mean_window: u32,
    pub start_min: u32,
    pub start_max: u32,
}

impl WindowThresholds {
    pub fn new(sps: f64) -> Self {
        WindowThresholds {
            bit_window: (4.5 * sps) as u32,
            mean_window: (2.5 * sps) as u32,
            start_min: (4.0 * sps) as u32,
            start_max: (5.0 * sps) as u32,
        }
    }
}

/// Converts a claimed sample rate (Hz) into samples-per-microsecond, rejecting
/// non-positive or non-finite values.
pub fn samples_per_microsecond(sample_rate_hz: f64) -> crate::Result<f64> {
    if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return Err(crate::Error::InvalidSampleRate { sample_rate_hz });
    }
    Ok(sample_rate_hz / 1_000_000.0)
}
