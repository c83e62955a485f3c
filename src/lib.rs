// THEORY:
// This file is the main entry point for the `sentry_vision` library crate.
// It exposes the `MotionPipeline` and its associated data structures as the
// clean, high-level interface for the detection engine, while the stage
// implementations stay encapsulated under `core_modules`.
//
// The crate is a computational library boundary: frames in, events out. It
// owns no camera, no network socket and no file. Hosts feed it one frame per
// tick and decide what to do with the events it returns.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod sink;

pub use config::DetectorConfig;
pub use core_modules::frame::Frame;
pub use core_modules::region::{BoundingBox, Region, RegionKind};
pub use error::DetectorError;
pub use pipeline::{MotionEvent, MotionPipeline};
pub use sink::{EventSink, LogSink};
