// THEORY:
// `Region` is a "dumb" data container: one filtered, bounded area of detected
// pixel change in a single frame. It has no memory of previous frames and no
// behavior beyond simple geometry. The extractor produces a fresh list every
// tick; the persistence filter and orchestrator consume it and throw it away.

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Center of the box in continuous pixel coordinates.
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// True when the two boxes share any pixel.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        BoundingBox {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }
}

/// Size classification used by callers for differentiated handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegionKind {
    /// Area below the large-object threshold.
    Ordinary,
    /// Area at or above the large-object threshold, roughly human-sized or
    /// bigger at typical surveillance distances.
    Large,
}

/// A single detected motion region for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub bounds: BoundingBox,
    /// Pixel count of the originating connected component (or the sum of the
    /// components folded into a merged region).
    pub area: usize,
    pub kind: RegionKind,
}
