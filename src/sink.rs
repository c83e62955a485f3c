// THEORY:
// Event delivery is a collaborator concern, not a pipeline concern. The
// pipeline computes; whatever happens to a confirmed event afterwards
// (appending to a log file, saving an annotated snapshot, poking a webhook)
// belongs to the host. `EventSink` is that seam: implement it once and hand
// it to `process_with_sink`, and the detection loop stays free of I/O.

use log::info;

use crate::pipeline::MotionEvent;

/// Receives ownership-by-reference of each confirmed motion event.
pub trait EventSink {
    fn handle_event(&mut self, event: &MotionEvent);
}

/// Reports events through the `log` facade. Useful as-is for headless
/// deployments where the host already routes logs somewhere durable.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn handle_event(&mut self, event: &MotionEvent) {
        info!(
            "motion event: tick {}, {} object(s), total area {}, threshold {:.1}, t={:.3}s",
            event.tick,
            event.regions.len(),
            event.total_area,
            event.threshold,
            event.timestamp
        );
    }
}
