// THEORY:
// The `DifferenceEngine` is the primary change detector: pixel-wise absolute
// difference between consecutive preprocessed frames, binarized against the
// effective threshold. Detection is deliberately previous-frame vs
// current-frame rather than frame-vs-background: that keeps latency at one
// frame and leaves the background model to do drift correction only.
//
// The very first tick has nothing to compare against; the engine signals
// "not ready" by returning `None` rather than treating warm-up as an error.

use image::GrayImage;

/// Per-tick output of the differencing stage.
pub struct FrameDelta {
    /// Raw absolute-difference magnitude per pixel.
    pub magnitude: GrayImage,
    /// Binary mask: 255 where `|current - previous| > threshold`, else 0.
    pub mask: GrayImage,
}

/// Computes change magnitude between consecutive frames and binarizes it.
#[derive(Default)]
pub struct DifferenceEngine {
    previous: Option<GrayImage>,
    mean_difference: f64,
}

impl DifferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Differences `current` against the previous frame, retaining `current`
    /// for the next tick. Returns `None` on the first call after construction
    /// or [`reset`](Self::reset).
    pub fn compute(&mut self, current: &GrayImage, threshold: f64) -> Option<FrameDelta> {
        let Some(previous) = self.previous.replace(current.clone()) else {
            return None;
        };
        debug_assert_eq!(previous.dimensions(), current.dimensions());

        let pixel_count = current.as_raw().len();
        let mut magnitude = Vec::with_capacity(pixel_count);
        let mut mask = Vec::with_capacity(pixel_count);
        let mut total: u64 = 0;

        for (&cur, &prev) in current.as_raw().iter().zip(previous.as_raw()) {
            let diff = cur.abs_diff(prev);
            total += diff as u64;
            magnitude.push(diff);
            mask.push(if diff as f64 > threshold { 255 } else { 0 });
        }
        self.mean_difference = total as f64 / pixel_count as f64;

        let (width, height) = current.dimensions();
        Some(FrameDelta {
            magnitude: GrayImage::from_raw(width, height, magnitude)
                .expect("magnitude buffer matches frame dimensions"),
            mask: GrayImage::from_raw(width, height, mask)
                .expect("mask buffer matches frame dimensions"),
        })
    }

    /// Mean absolute difference of the most recent comparison. Diagnostic only.
    pub fn mean_difference(&self) -> f64 {
        self.mean_difference
    }

    /// `(width, height)` of the retained previous frame, if any.
    pub fn previous_dimensions(&self) -> Option<(u32, u32)> {
        self.previous.as_ref().map(|frame| frame.dimensions())
    }

    /// Drops the retained previous frame; the next `compute` reports not ready.
    pub fn reset(&mut self) {
        self.previous = None;
        self.mean_difference = 0.0;
    }
}
