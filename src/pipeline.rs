// THEORY:
// The `pipeline` module is the top-level API for the whole detection engine.
// One `MotionPipeline` instance owns every stage and drives a single frame
// through them per tick:
//
//   raw frame -> preprocess -> difference -> regions -> persistence vote
//             -> background bookkeeping -> cooldown-gated event emission
//
// The pipeline is single-threaded and synchronous by design: a tick is fully
// processed before the next frame is accepted, all state lives inside the
// instance, and dropping the instance is the only cleanup there is. Hosts
// that juggle streams, UIs or logging do that concurrency on their side of
// the boundary.
//
// Failure semantics: a malformed frame loses that tick and nothing else, and
// any detected inconsistency between the incoming stream and persisted state
// resets the pipeline instead of crashing it. A continuous detection stream
// must outlive any single bad frame.

use log::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::core_modules::background::BackgroundModel;
use crate::core_modules::difference::DifferenceEngine;
use crate::core_modules::frame::Frame;
use crate::core_modules::persistence::PersistenceFilter;
use crate::core_modules::preprocessor::FramePreprocessor;
use crate::core_modules::region::Region;
use crate::core_modules::region_extractor::RegionExtractor;
use crate::error::DetectorError;
use crate::sink::EventSink;

/// Background blend rate while unconfirmed motion is present.
const TRANSIENT_MOTION_RATE: f32 = 0.001;
/// Consecutive motion ticks after which the background stops updating
/// entirely, so a lingering object is not absorbed into the scene.
const SUSTAINED_MOTION_TICKS: u32 = 10;

/// A confirmed, cooldown-gated motion detection.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionEvent {
    /// Tick index at which the event fired (first processed frame is tick 1).
    pub tick: u64,
    /// The regions that triggered the event.
    pub regions: Vec<Region>,
    /// Summed pixel area of all regions.
    pub total_area: usize,
    /// The effective per-pixel threshold in force when the event fired.
    pub threshold: f64,
    /// Capture timestamp of the triggering frame, in seconds.
    pub timestamp: f64,
}

/// The main, top-level struct for the detection engine.
pub struct MotionPipeline {
    config: DetectorConfig,
    preprocessor: FramePreprocessor,
    background: BackgroundModel,
    difference: DifferenceEngine,
    extractor: RegionExtractor,
    persistence: PersistenceFilter,
    tick_count: u64,
    consecutive_motion_ticks: u32,
    last_event_time: Option<f64>,
    last_background_reset: Option<f64>,
    total_events: u64,
}

impl MotionPipeline {
    /// Builds a pipeline, validating the configuration up front. This is the
    /// only place a configuration error can surface.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        Ok(Self {
            preprocessor: FramePreprocessor::new(&config),
            background: BackgroundModel::new(),
            difference: DifferenceEngine::new(),
            extractor: RegionExtractor::new(&config),
            persistence: PersistenceFilter::new(config.persistence_frames),
            config,
            tick_count: 0,
            consecutive_motion_ticks: 0,
            last_event_time: None,
            last_background_reset: None,
            total_events: 0,
        })
    }

    /// Processes one frame and reports a confirmed motion event, if any.
    ///
    /// Per-tick errors are recoverable diagnostics: an [`InvalidFrame`]
    /// skips the tick, a [`StateMismatch`] means the pipeline reset itself
    /// and will reseed on the next well-formed frame.
    ///
    /// [`InvalidFrame`]: DetectorError::InvalidFrame
    /// [`StateMismatch`]: DetectorError::StateMismatch
    pub fn tick(&mut self, frame: &Frame) -> Result<Option<MotionEvent>, DetectorError> {
        let gray = self.preprocessor.process(frame)?;

        // Periodic full reset bounds accumulated drift. Partial resets are
        // not supported: either all transient state is stale or none is.
        if self.config.auto_reset_background {
            let anchor = *self.last_background_reset.get_or_insert(frame.timestamp);
            if frame.timestamp - anchor > self.config.reset_interval {
                info!("periodic background reset at t={:.1}s", frame.timestamp);
                self.reset_transient_state();
                self.last_background_reset = Some(frame.timestamp);
            }
        }

        // A resolution change mid-stream invalidates every grid we hold.
        if let Some((width, height)) = self.background.dimensions() {
            if (width, height) != gray.dimensions() {
                warn!(
                    "frame resolution changed from {}x{} to {}x{}; resetting",
                    width,
                    height,
                    gray.width(),
                    gray.height()
                );
                self.reset_transient_state();
                return Err(DetectorError::StateMismatch {
                    expected_width: width,
                    expected_height: height,
                    actual_width: gray.width(),
                    actual_height: gray.height(),
                });
            }
        }

        self.tick_count += 1;
        let threshold = self.preprocessor.effective_threshold();
        let Some(delta) = self.difference.compute(&gray, threshold) else {
            // First tick after construction or a reset: seed and report
            // no decision.
            self.background
                .update(&gray, self.config.background_update_rate);
            return Ok(None);
        };

        let regions = self.extractor.extract(&delta.mask);
        let has_motion = !regions.is_empty();
        let persistent_motion = self.persistence.observe(has_motion);

        if has_motion {
            self.consecutive_motion_ticks += 1;
        } else {
            self.consecutive_motion_ticks = 0;
        }

        // Background bookkeeping: track the static scene at the default rate,
        // crawl while motion is transient, freeze once it is sustained.
        if !has_motion {
            self.background
                .update(&gray, self.config.background_update_rate);
        } else if self.consecutive_motion_ticks < SUSTAINED_MOTION_TICKS {
            self.background.update(&gray, TRANSIENT_MOTION_RATE);
        }

        debug!(
            "tick {}: {} region(s), mean diff {:.2}, persistence {}/{}",
            self.tick_count,
            regions.len(),
            self.difference.mean_difference(),
            self.persistence.motion_count(),
            self.config.persistence_frames
        );

        // The vote can stay satisfied for a tick after motion stops (and is
        // trivially satisfied by a window of one); an event must also have
        // regions on the tick it fires.
        if has_motion && persistent_motion && self.cooldown_elapsed(frame.timestamp) {
            self.last_event_time = Some(frame.timestamp);
            self.total_events += 1;
            let total_area = regions.iter().map(|region| region.area).sum();
            info!(
                "verified motion at tick {}: {} region(s), total area {}, threshold {:.1}",
                self.tick_count,
                regions.len(),
                total_area,
                threshold
            );
            return Ok(Some(MotionEvent {
                tick: self.tick_count,
                regions,
                total_area,
                threshold,
                timestamp: frame.timestamp,
            }));
        }

        Ok(None)
    }

    /// Like [`tick`](Self::tick), forwarding any emitted event to `sink`.
    /// Returns whether an event fired.
    pub fn process_with_sink(
        &mut self,
        frame: &Frame,
        sink: &mut dyn EventSink,
    ) -> Result<bool, DetectorError> {
        match self.tick(frame)? {
            Some(event) => {
                sink.handle_event(&event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Manual full reset, equivalent to the periodic one: background model,
    /// previous frame and motion history all start over.
    pub fn reset_background(&mut self) {
        info!("manual background reset");
        self.reset_transient_state();
        self.last_background_reset = None;
    }

    fn reset_transient_state(&mut self) {
        self.background.reset();
        self.difference.reset();
        self.persistence.reset();
        self.consecutive_motion_ticks = 0;
    }

    fn cooldown_elapsed(&self, now: f64) -> bool {
        match self.last_event_time {
            None => true,
            Some(last) => now - last > self.config.alert_cooldown,
        }
    }

    /// Ticks that reached the decision stages; ticks lost to per-tick errors
    /// are not counted.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Verified events emitted so far.
    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    /// Mean absolute frame difference of the last comparison.
    pub fn mean_frame_difference(&self) -> f64 {
        self.difference.mean_difference()
    }

    /// Mean luminance of the most recently sampled frame.
    pub fn lighting_baseline(&self) -> f64 {
        self.preprocessor.lighting_baseline()
    }

    /// The per-pixel threshold currently in force.
    pub fn effective_threshold(&self) -> f64 {
        self.preprocessor.effective_threshold()
    }

    /// Diagnostic snapshot of the background estimate, if seeded.
    pub fn background_estimate(&self) -> Option<image::GrayImage> {
        self.background.estimate()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}
