// THEORY:
// All tunable behavior of the pipeline lives in one immutable value supplied
// at construction. There is no process-wide mutable state and no mid-run
// mutation: a host that wants different parameters builds a new pipeline.
// Validation happens once, up front, so that every stage downstream can trust
// the numbers it is handed.

use crate::error::DetectorError;

/// Tunable parameters for a [`MotionPipeline`](crate::pipeline::MotionPipeline).
///
/// The defaults are field-tuned values for a 640x480 surveillance stream and
/// are a reasonable starting point for most fixed-camera scenes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    /// Base per-pixel change magnitude (0-255) for a pixel to count as "changed".
    pub motion_threshold: f64,
    /// Minimum pixel area for a region to be considered significant.
    pub min_contour_area: usize,
    /// Maximum pixel area, filtering out full-frame changes such as camera shake.
    pub max_contour_area: usize,
    /// Gaussian smoothing kernel size in pixels. Must be odd; even values are
    /// rounded up to the next odd value.
    pub blur_kernel_size: u32,
    /// Square structuring-element size for the morphological open/close/dilate
    /// passes.
    pub morphology_kernel_size: u32,
    /// Trailing window length (in ticks) for the persistence vote.
    pub persistence_frames: usize,
    /// Default background blend rate applied when the scene is still.
    pub background_update_rate: f32,
    /// Adjust the operating threshold from the tracked lighting baseline.
    pub adaptive_threshold: bool,
    /// Periodically reset all transient state to bound background drift.
    pub auto_reset_background: bool,
    /// Seconds between automatic full resets when `auto_reset_background` is on.
    pub reset_interval: f64,
    /// Union regions whose centers are close or whose boxes overlap.
    pub merge_nearby_regions: bool,
    /// Maximum center-to-center distance (pixels) for two regions to merge.
    pub merge_distance: f64,
    /// Pixel area at or above which a region is tagged [`RegionKind::Large`](crate::core_modules::region::RegionKind).
    pub large_object_area_threshold: usize,
    /// Cap on regions reported per tick; `None` reports all survivors.
    pub max_regions_per_tick: Option<usize>,
    /// Minimum seconds between two emitted motion events.
    pub alert_cooldown: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            motion_threshold: 25.0,
            min_contour_area: 500,
            max_contour_area: 50_000,
            blur_kernel_size: 21,
            morphology_kernel_size: 5,
            persistence_frames: 3,
            background_update_rate: 0.01,
            adaptive_threshold: true,
            auto_reset_background: true,
            reset_interval: 300.0,
            merge_nearby_regions: false,
            merge_distance: 50.0,
            large_object_area_threshold: 3000,
            max_regions_per_tick: None,
            alert_cooldown: 2.0,
        }
    }
}

impl DetectorConfig {
    /// Checks every parameter once, at pipeline construction.
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.motion_threshold < 0.0 {
            return Err(DetectorError::Configuration(format!(
                "motion_threshold must be non-negative, got {}",
                self.motion_threshold
            )));
        }
        if self.min_contour_area > self.max_contour_area {
            return Err(DetectorError::Configuration(format!(
                "min_contour_area ({}) exceeds max_contour_area ({})",
                self.min_contour_area, self.max_contour_area
            )));
        }
        if self.blur_kernel_size == 0 {
            return Err(DetectorError::Configuration(
                "blur_kernel_size must be positive".into(),
            ));
        }
        if self.morphology_kernel_size == 0 {
            return Err(DetectorError::Configuration(
                "morphology_kernel_size must be positive".into(),
            ));
        }
        if self.persistence_frames == 0 {
            return Err(DetectorError::Configuration(
                "persistence_frames must be at least 1".into(),
            ));
        }
        if !(self.background_update_rate > 0.0 && self.background_update_rate <= 1.0) {
            return Err(DetectorError::Configuration(format!(
                "background_update_rate must be in (0, 1], got {}",
                self.background_update_rate
            )));
        }
        if self.auto_reset_background && self.reset_interval <= 0.0 {
            return Err(DetectorError::Configuration(format!(
                "reset_interval must be positive, got {}",
                self.reset_interval
            )));
        }
        if self.merge_distance < 0.0 {
            return Err(DetectorError::Configuration(format!(
                "merge_distance must be non-negative, got {}",
                self.merge_distance
            )));
        }
        if self.alert_cooldown < 0.0 {
            return Err(DetectorError::Configuration(format!(
                "alert_cooldown must be non-negative, got {}",
                self.alert_cooldown
            )));
        }
        if self.max_regions_per_tick == Some(0) {
            return Err(DetectorError::Configuration(
                "max_regions_per_tick must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}
