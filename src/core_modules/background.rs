// THEORY:
// The `BackgroundModel` maintains a slowly-adapting estimate of the static
// scene. It is not the primary detector (detection is previous-frame vs
// current-frame differencing); its job is drift control. By blending each
// still frame into a floating-point accumulator at a small rate, gradual
// changes such as daylight shifting are absorbed without ever registering as
// motion, while the orchestrator throttles or freezes the blend rate whenever
// a moving object is in the scene so the object is not baked into the
// background.

use image::GrayImage;
use ndarray::{Array2, Zip};

/// Exponentially-weighted running background estimate.
#[derive(Clone, Default)]
pub struct BackgroundModel {
    accumulator: Option<Array2<f32>>,
}

impl BackgroundModel {
    pub fn new() -> Self {
        Self { accumulator: None }
    }

    /// Blends `frame` into the running estimate:
    /// `background = background * (1 - rate) + frame * rate`.
    ///
    /// The first call after construction or [`reset`](Self::reset) seeds the
    /// estimate directly from the frame, with no blending.
    pub fn update(&mut self, frame: &GrayImage, rate: f32) {
        let frame_array = to_array(frame);
        match self.accumulator.as_mut() {
            None => self.accumulator = Some(frame_array),
            Some(background) => {
                debug_assert_eq!(background.dim(), frame_array.dim());
                Zip::from(background).and(&frame_array).for_each(|bg, &sample| {
                    *bg = sample * rate + *bg * (1.0 - rate);
                });
            }
        }
    }

    /// Clears the estimate to uninitialized; the next `update` reseeds.
    /// Calling this twice in a row is the same as calling it once.
    pub fn reset(&mut self) {
        self.accumulator = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.accumulator.is_some()
    }

    /// `(width, height)` of the persisted estimate, if seeded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.accumulator
            .as_ref()
            .map(|bg| (bg.ncols() as u32, bg.nrows() as u32))
    }

    /// Renders the accumulator back to an 8-bit image for inspection.
    pub fn estimate(&self) -> Option<GrayImage> {
        self.accumulator.as_ref().map(|bg| {
            let (height, width) = bg.dim();
            let raw: Vec<u8> = bg.iter().map(|&v| v.clamp(0.0, 255.0) as u8).collect();
            GrayImage::from_raw(width as u32, height as u32, raw)
                .expect("accumulator is dense and row-major")
        })
    }

    /// Direct read access for tests and diagnostics.
    pub(crate) fn accumulator(&self) -> Option<&Array2<f32>> {
        self.accumulator.as_ref()
    }
}

fn to_array(frame: &GrayImage) -> Array2<f32> {
    let (width, height) = frame.dimensions();
    let samples: Vec<f32> = frame.as_raw().iter().map(|&p| p as f32).collect();
    Array2::from_shape_vec((height as usize, width as usize), samples)
        .expect("raw gray buffer is row-major and dense")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn uniform(value: u8, width: u32, height: u32) -> GrayImage {
        GrayImage::from_raw(width, height, vec![value; (width * height) as usize]).unwrap()
    }

    #[test]
    fn first_update_seeds_without_blending() {
        let mut model = BackgroundModel::new();
        model.update(&uniform(100, 4, 4), 0.01);
        let bg = model.accumulator().unwrap();
        assert_approx_eq!(bg[[0, 0]], 100.0);
        assert_eq!(model.dimensions(), Some((4, 4)));
    }

    #[test]
    fn later_updates_blend_exponentially() {
        let mut model = BackgroundModel::new();
        model.update(&uniform(100, 4, 4), 0.5);
        model.update(&uniform(200, 4, 4), 0.5);
        let bg = model.accumulator().unwrap();
        assert_approx_eq!(bg[[2, 2]], 150.0);

        model.update(&uniform(200, 4, 4), 0.5);
        let bg = model.accumulator().unwrap();
        assert_approx_eq!(bg[[2, 2]], 175.0);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut model = BackgroundModel::new();
        model.update(&uniform(100, 4, 4), 0.5);
        model.reset();
        model.reset();
        assert!(!model.is_initialized());

        // The next update reseeds identically either way.
        model.update(&uniform(42, 4, 4), 0.5);
        let bg = model.accumulator().unwrap();
        assert_approx_eq!(bg[[0, 0]], 42.0);
    }

    #[test]
    fn estimate_round_trips_the_accumulator() {
        let mut model = BackgroundModel::new();
        assert!(model.estimate().is_none());
        model.update(&uniform(77, 3, 2), 0.01);
        let snapshot = model.estimate().unwrap();
        assert_eq!(snapshot.dimensions(), (3, 2));
        assert_eq!(snapshot.get_pixel(1, 1)[0], 77);
    }
}
