// THEORY:
// `Frame` is the caller's side of the contract: a borrowed view over one raw
// image buffer plus the metadata the pipeline needs to interpret it. The
// pipeline never owns or acquires frames; it reads this view for the duration
// of a single tick and derives its own grayscale copy. Keeping the input
// borrowed makes the per-tick data flow obvious: nothing from the caller's
// buffer survives the tick.

use crate::error::DetectorError;

/// A single raw video frame supplied by the caller for one tick.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Packed pixel samples, row-major, `channels` bytes per pixel.
    pub data: &'a [u8],
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Samples per pixel: 1 (gray), 3 (RGB) or 4 (RGBA).
    pub channels: u8,
    /// Capture time in seconds. Drives the cooldown and reset clocks, so it
    /// must be monotonically non-decreasing across ticks.
    pub timestamp: f64,
}

impl<'a> Frame<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, channels: u8, timestamp: f64) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            timestamp,
        }
    }

    /// Checks the buffer is well-formed before any stage touches it.
    pub(crate) fn validate(&self) -> Result<(), DetectorError> {
        if self.width == 0 || self.height == 0 {
            return Err(DetectorError::InvalidFrame(format!(
                "zero-area frame ({}x{})",
                self.width, self.height
            )));
        }
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(DetectorError::InvalidFrame(format!(
                "unsupported channel count {}",
                self.channels
            )));
        }
        let expected = self.width as usize * self.height as usize * self.channels as usize;
        if self.data.len() != expected {
            return Err(DetectorError::InvalidFrame(format!(
                "buffer holds {} bytes but {}x{}x{} requires {}",
                self.data.len(),
                self.width,
                self.height,
                self.channels,
                expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_frames() {
        let data = vec![0u8; 4 * 4 * 3];
        let frame = Frame::new(&data, 4, 4, 3, 0.0);
        frame.validate().unwrap();
    }

    #[test]
    fn rejects_zero_area() {
        let frame = Frame::new(&[], 0, 4, 3, 0.0);
        assert!(matches!(
            frame.validate(),
            Err(DetectorError::InvalidFrame(_))
        ));
    }

    #[test]
    fn rejects_short_buffer() {
        let data = vec![0u8; 10];
        let frame = Frame::new(&data, 4, 4, 3, 0.0);
        assert!(matches!(
            frame.validate(),
            Err(DetectorError::InvalidFrame(_))
        ));
    }

    #[test]
    fn rejects_odd_channel_counts() {
        let data = vec![0u8; 4 * 4 * 2];
        let frame = Frame::new(&data, 4, 4, 2, 0.0);
        assert!(matches!(
            frame.validate(),
            Err(DetectorError::InvalidFrame(_))
        ));
    }
}
