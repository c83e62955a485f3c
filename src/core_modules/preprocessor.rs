// THEORY:
// The `FramePreprocessor` is the normalization layer every other stage relies
// on. It collapses the caller's color samples to a single luminance channel
// and smooths away sensor noise, so that downstream differencing reacts to
// scene changes rather than pixel flicker.
//
// It also owns the *lighting baseline*: a scalar mean luminance resampled on
// a fixed cadence. When adaptive thresholding is enabled, the baseline shifts
// the operating threshold upward in poor lighting, where sensor noise swamps
// the base value. Dark scenes (noisy gain-boosted sensors) add a small
// offset; bright scenes (blown-out highlights, hard shadows) add a larger
// one; mid-range lighting uses the base threshold unmodified.

use image::GrayImage;
use log::debug;

use crate::config::DetectorConfig;
use crate::core_modules::frame::Frame;
use crate::error::DetectorError;

/// Ticks between lighting-baseline recomputations.
const LIGHTING_SAMPLE_INTERVAL: u64 = 30;
/// Mean luminance below which a scene counts as dark.
const DARK_SCENE_LUMINANCE: f64 = 50.0;
/// Mean luminance above which a scene counts as bright.
const BRIGHT_SCENE_LUMINANCE: f64 = 200.0;
/// Threshold offset applied in dark scenes.
const DARK_SCENE_OFFSET: f64 = 10.0;
/// Threshold offset applied in bright scenes.
const BRIGHT_SCENE_OFFSET: f64 = 20.0;

/// Grayscale + blur normalization and lighting-baseline tracking.
pub struct FramePreprocessor {
    /// Smoothing kernel size, forced odd at construction.
    blur_kernel_size: u32,
    adaptive_threshold: bool,
    base_threshold: f64,
    current_threshold: f64,
    lighting_baseline: f64,
    ticks_seen: u64,
    /// Channel count locked in by the first frame.
    expected_channels: Option<u8>,
}

impl FramePreprocessor {
    pub fn new(config: &DetectorConfig) -> Self {
        // Even kernel sizes are rounded up to the next odd value; a separable
        // Gaussian needs a center tap.
        let blur_kernel_size = if config.blur_kernel_size % 2 == 0 {
            config.blur_kernel_size + 1
        } else {
            config.blur_kernel_size
        };
        Self {
            blur_kernel_size,
            adaptive_threshold: config.adaptive_threshold,
            base_threshold: config.motion_threshold,
            current_threshold: config.motion_threshold,
            lighting_baseline: 0.0,
            ticks_seen: 0,
            expected_channels: None,
        }
    }

    /// Converts a raw frame to a smoothed grayscale frame and refreshes the
    /// lighting baseline on its sampling cadence.
    pub fn process(&mut self, frame: &Frame) -> Result<GrayImage, DetectorError> {
        frame.validate()?;

        match self.expected_channels {
            None => self.expected_channels = Some(frame.channels),
            Some(expected) if expected != frame.channels => {
                return Err(DetectorError::InvalidFrame(format!(
                    "frame has {} channels but earlier frames had {}",
                    frame.channels, expected
                )));
            }
            Some(_) => {}
        }

        let gray = to_luminance(frame);
        let blurred = if self.blur_kernel_size > 1 {
            imageproc::filter::gaussian_blur_f32(&gray, sigma_for_kernel(self.blur_kernel_size))
        } else {
            gray
        };

        if self.ticks_seen % LIGHTING_SAMPLE_INTERVAL == 0 {
            self.lighting_baseline = mean_luminance(&blurred);
            if self.adaptive_threshold {
                self.current_threshold = if self.lighting_baseline < DARK_SCENE_LUMINANCE {
                    self.base_threshold + DARK_SCENE_OFFSET
                } else if self.lighting_baseline > BRIGHT_SCENE_LUMINANCE {
                    self.base_threshold + BRIGHT_SCENE_OFFSET
                } else {
                    self.base_threshold
                };
            }
            debug!(
                "lighting baseline {:.1}, effective threshold {:.1}",
                self.lighting_baseline, self.current_threshold
            );
        }
        self.ticks_seen += 1;

        Ok(blurred)
    }

    /// The threshold currently in effect, after any lighting adjustment.
    pub fn effective_threshold(&self) -> f64 {
        self.current_threshold
    }

    /// Mean luminance of the most recently sampled frame.
    pub fn lighting_baseline(&self) -> f64 {
        self.lighting_baseline
    }

    /// The smoothing kernel size actually in use (odd-rounded).
    pub fn blur_kernel_size(&self) -> u32 {
        self.blur_kernel_size
    }
}

/// Collapses packed samples to Rec. 601 luminance.
fn to_luminance(frame: &Frame) -> GrayImage {
    let pixel_count = frame.width as usize * frame.height as usize;
    let mut luma = Vec::with_capacity(pixel_count);
    match frame.channels {
        1 => luma.extend_from_slice(frame.data),
        channels => {
            for pixel in frame.data.chunks_exact(channels as usize) {
                let value = 0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32
                    + 0.114 * pixel[2] as f32;
                luma.push(value.round().min(255.0) as u8);
            }
        }
    }
    GrayImage::from_raw(frame.width, frame.height, luma)
        .expect("luminance buffer matches frame dimensions")
}

/// Sigma a given kernel size implies, matching OpenCV's derivation so the
/// field-tuned kernel sizes keep their meaning.
fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn mean_luminance(image: &GrayImage) -> f64 {
    let sum: u64 = image.as_raw().iter().map(|&p| p as u64).sum();
    sum as f64 / image.as_raw().len() as f64
}
