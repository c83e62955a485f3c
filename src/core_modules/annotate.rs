// THEORY:
// Annotation helpers for callers that want a live preview: convert a raw
// frame to RGB and outline the detected regions on it. The pipeline itself
// never draws (rendering is a caller concern), but every host of this
// detector ends up wanting the same bounding-box overlay, so the crate ships
// it once.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::core_modules::frame::Frame;
use crate::core_modules::region::{Region, RegionKind};
use crate::error::DetectorError;

/// Outline color for ordinary motion regions.
const MOTION_BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Outline color for large ("human-sized") regions.
const ALERT_BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Expands a caller frame into an owned RGB canvas suitable for drawing.
pub fn frame_to_rgb(frame: &Frame) -> Result<RgbImage, DetectorError> {
    frame.validate()?;
    let mut canvas = RgbImage::new(frame.width, frame.height);
    let channels = frame.channels as usize;
    for (pixel, sample) in canvas
        .pixels_mut()
        .zip(frame.data.chunks_exact(channels))
    {
        *pixel = match channels {
            1 => Rgb([sample[0], sample[0], sample[0]]),
            _ => Rgb([sample[0], sample[1], sample[2]]),
        };
    }
    Ok(canvas)
}

/// Outlines each region on the canvas, large regions in the alert color.
pub fn draw_regions(canvas: &mut RgbImage, regions: &[Region]) {
    for region in regions {
        let color = match region.kind {
            RegionKind::Large => ALERT_BOX_COLOR,
            RegionKind::Ordinary => MOTION_BOX_COLOR,
        };
        let rect = Rect::at(region.bounds.x as i32, region.bounds.y as i32)
            .of_size(region.bounds.width.max(1), region.bounds.height.max(1));
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::region::BoundingBox;

    #[test]
    fn gray_frames_expand_to_rgb() {
        let data = vec![128u8; 16];
        let frame = Frame::new(&data, 4, 4, 1, 0.0);
        let canvas = frame_to_rgb(&frame).unwrap();
        assert_eq!(canvas.get_pixel(1, 1), &Rgb([128, 128, 128]));
    }

    #[test]
    fn regions_are_outlined_in_their_kind_color() {
        let data = vec![0u8; 32 * 32 * 3];
        let frame = Frame::new(&data, 32, 32, 3, 0.0);
        let mut canvas = frame_to_rgb(&frame).unwrap();
        let regions = vec![
            Region {
                bounds: BoundingBox {
                    x: 2,
                    y: 2,
                    width: 6,
                    height: 6,
                },
                area: 36,
                kind: RegionKind::Ordinary,
            },
            Region {
                bounds: BoundingBox {
                    x: 12,
                    y: 12,
                    width: 10,
                    height: 10,
                },
                area: 100,
                kind: RegionKind::Large,
            },
        ];
        draw_regions(&mut canvas, &regions);
        assert_eq!(canvas.get_pixel(2, 2), &Rgb([0, 255, 0]));
        assert_eq!(canvas.get_pixel(12, 12), &Rgb([255, 0, 0]));
        // Interior stays untouched: boxes are hollow.
        assert_eq!(canvas.get_pixel(5, 5), &Rgb([0, 0, 0]));
    }
}
