// THEORY:
// The `RegionExtractor` is the spatial grouping layer. It takes the raw
// binary change mask from the differencing stage and turns it into a short
// list of coherent regions a caller can reason about:
//
// 1. Morphological opening removes isolated noise pixels.
// 2. Morphological closing fills small gaps inside a moving silhouette.
// 3. Two extra dilation passes bridge nearby fragments of one object.
// 4. Eight-way connected-component labelling yields bounding boxes with
//    pixel-area measurements.
// 5. The area band filter discards specks and full-frame disturbances.
// 6. An optional merge pass unions regions that clearly belong to one object
//    (centers within the merge distance, or overlapping boxes).
// 7. An optional cap keeps only the largest regions.
//
// The extractor is a stateless utility: for a fixed mask and configuration
// the output is order-stable (descending area when the cap applies,
// first-appearance scan order otherwise).

use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, dilate, open};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::config::DetectorConfig;
use crate::core_modules::region::{BoundingBox, Region, RegionKind};

/// Extra dilation passes after open/close, bridging fragments of one object.
const BRIDGE_DILATION_PASSES: usize = 2;

/// Morphological cleanup, connected-region extraction, area filtering and
/// optional nearby-region merging.
pub struct RegionExtractor {
    /// Half-width of the square structuring element; 0 disables morphology.
    morph_radius: u8,
    min_area: usize,
    max_area: usize,
    merge_nearby: bool,
    merge_distance: f64,
    large_area_threshold: usize,
    max_regions: Option<usize>,
}

impl RegionExtractor {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            morph_radius: (config.morphology_kernel_size / 2).min(u8::MAX as u32) as u8,
            min_area: config.min_contour_area,
            max_area: config.max_contour_area,
            merge_nearby: config.merge_nearby_regions,
            merge_distance: config.merge_distance,
            large_area_threshold: config.large_object_area_threshold,
            max_regions: config.max_regions_per_tick,
        }
    }

    /// Runs the full mask-to-regions pipeline for one tick.
    pub fn extract(&self, mask: &GrayImage) -> Vec<Region> {
        let cleaned = self.clean_mask(mask);
        let mut regions = self.label_regions(&cleaned);

        if self.merge_nearby {
            regions = self.merge_regions(regions);
        }

        if let Some(cap) = self.max_regions {
            if regions.len() > cap {
                regions.sort_by(|a, b| b.area.cmp(&a.area));
                regions.truncate(cap);
            }
        }

        regions
    }

    /// Opening, closing, then the bridging dilation passes.
    fn clean_mask(&self, mask: &GrayImage) -> GrayImage {
        if self.morph_radius == 0 {
            return mask.clone();
        }
        let mut cleaned = open(mask, Norm::LInf, self.morph_radius);
        cleaned = close(&cleaned, Norm::LInf, self.morph_radius);
        for _ in 0..BRIDGE_DILATION_PASSES {
            cleaned = dilate(&cleaned, Norm::LInf, self.morph_radius);
        }
        cleaned
    }

    /// Connected components plus the area band filter and size tagging.
    fn label_regions(&self, mask: &GrayImage) -> Vec<Region> {
        let labelled = connected_components(mask, Connectivity::Eight, Luma([0u8]));

        // Components keyed by first appearance in scan order, so the output
        // is deterministic regardless of which label ids the labelling picked.
        let mut stats: Vec<ComponentStats> = Vec::new();
        let mut index_of_label: HashMap<u32, usize> = HashMap::new();
        for (x, y, pixel) in labelled.enumerate_pixels() {
            let label = pixel[0];
            if label == 0 {
                continue;
            }
            let index = *index_of_label.entry(label).or_insert_with(|| {
                stats.push(ComponentStats::new());
                stats.len() - 1
            });
            stats[index].absorb(x, y);
        }

        stats
            .into_iter()
            .filter(|component| {
                component.area >= self.min_area && component.area <= self.max_area
            })
            .map(|component| Region {
                bounds: component.bounds(),
                area: component.area,
                kind: self.classify(component.area),
            })
            .collect()
    }

    /// Greedy union-find over all pairs: regions whose centers lie within the
    /// merge distance, or whose boxes overlap, collapse into one enclosing
    /// region. Groups keep the position of their lowest-index member, making
    /// the result independent of pair visit order.
    fn merge_regions(&self, regions: Vec<Region>) -> Vec<Region> {
        if regions.len() < 2 {
            return regions;
        }

        let mut parent: Vec<usize> = (0..regions.len()).collect();
        for i in 0..regions.len() {
            for j in (i + 1)..regions.len() {
                if !self.should_merge(&regions[i], &regions[j]) {
                    continue;
                }
                let (root_i, root_j) = (find(&mut parent, i), find(&mut parent, j));
                if root_i != root_j {
                    // Lower index wins, keeping input-order tie-breaking.
                    parent[root_i.max(root_j)] = root_i.min(root_j);
                }
            }
        }

        let mut merged: Vec<Option<Region>> = vec![None; regions.len()];
        for (index, region) in regions.into_iter().enumerate() {
            let root = find(&mut parent, index);
            match &mut merged[root] {
                None => merged[root] = Some(region),
                Some(accumulated) => {
                    accumulated.bounds = accumulated.bounds.union(&region.bounds);
                    accumulated.area += region.area;
                }
            }
        }

        merged
            .into_iter()
            .flatten()
            // A union can outgrow the band; the camera-shake ceiling still
            // applies to it.
            .filter(|region| region.area <= self.max_area)
            .map(|mut region| {
                region.kind = self.classify(region.area);
                region
            })
            .collect()
    }

    fn should_merge(&self, a: &Region, b: &Region) -> bool {
        if a.bounds.overlaps(&b.bounds) {
            return true;
        }
        let (ax, ay) = a.bounds.center();
        let (bx, by) = b.bounds.center();
        let distance = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt();
        distance <= self.merge_distance
    }

    fn classify(&self, area: usize) -> RegionKind {
        if area >= self.large_area_threshold {
            RegionKind::Large
        } else {
            RegionKind::Ordinary
        }
    }
}

/// Find with path halving.
fn find(parent: &mut [usize], mut index: usize) -> usize {
    while parent[index] != index {
        parent[index] = parent[parent[index]];
        index = parent[index];
    }
    index
}

/// Running bounding box and pixel count for one labelled component.
struct ComponentStats {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: usize,
}

impl ComponentStats {
    fn new() -> Self {
        Self {
            min_x: u32::MAX,
            min_y: u32::MAX,
            max_x: 0,
            max_y: 0,
            area: 0,
        }
    }

    fn absorb(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.area += 1;
    }

    fn bounds(&self) -> BoundingBox {
        BoundingBox {
            x: self.min_x,
            y: self.min_y,
            width: self.max_x - self.min_x + 1,
            height: self.max_y - self.min_y + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mask helper: paints filled rectangles of foreground onto black.
    fn mask_with_blocks(width: u32, height: u32, blocks: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for &(x, y, w, h) in blocks {
            for py in y..y + h {
                for px in x..x + w {
                    mask.put_pixel(px, py, Luma([255u8]));
                }
            }
        }
        mask
    }

    /// Exact-geometry configuration: morphology disabled so input areas are
    /// preserved verbatim.
    fn exact_config() -> DetectorConfig {
        DetectorConfig {
            morphology_kernel_size: 1,
            min_contour_area: 20,
            max_contour_area: 10_000,
            large_object_area_threshold: 3000,
            merge_nearby_regions: false,
            max_regions_per_tick: None,
            ..DetectorConfig::default()
        }
    }

    #[test]
    fn empty_mask_yields_no_regions() {
        let extractor = RegionExtractor::new(&exact_config());
        assert!(extractor.extract(&GrayImage::new(64, 64)).is_empty());
    }

    #[test]
    fn opening_removes_isolated_noise_pixels() {
        let config = DetectorConfig {
            morphology_kernel_size: 3,
            min_contour_area: 1,
            ..exact_config()
        };
        let extractor = RegionExtractor::new(&config);
        let mask = mask_with_blocks(64, 64, &[(30, 30, 1, 1), (10, 40, 2, 1)]);
        assert!(extractor.extract(&mask).is_empty());
    }

    #[test]
    fn areas_stay_within_the_configured_band() {
        let extractor = RegionExtractor::new(&exact_config());
        // Below the band, inside it, and a screen-filling disturbance above it.
        let mask = mask_with_blocks(
            200,
            200,
            &[(0, 0, 4, 4), (10, 100, 20, 20), (50, 0, 150, 80)],
        );
        let regions = extractor.extract(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 400);
        assert!(regions
            .iter()
            .all(|r| r.area >= 20 && r.area <= 10_000));
    }

    #[test]
    fn extraction_order_follows_scan_order() {
        let extractor = RegionExtractor::new(&exact_config());
        let mask = mask_with_blocks(100, 100, &[(60, 10, 10, 10), (5, 50, 10, 10)]);
        let regions = extractor.extract(&mask);
        assert_eq!(regions.len(), 2);
        // Topmost block appears first regardless of horizontal position.
        assert_eq!(regions[0].bounds.y, 10);
        assert_eq!(regions[1].bounds.y, 50);
    }

    #[test]
    fn nearby_regions_merge_into_one_enclosing_region() {
        let config = DetectorConfig {
            merge_nearby_regions: true,
            merge_distance: 100.0,
            ..exact_config()
        };
        let extractor = RegionExtractor::new(&config);
        // Two 10x10 blocks whose boxes sit 20px apart.
        let mask = mask_with_blocks(100, 50, &[(10, 10, 10, 10), (40, 10, 10, 10)]);
        let regions = extractor.extract(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(
            regions[0].bounds,
            BoundingBox {
                x: 10,
                y: 10,
                width: 40,
                height: 10
            }
        );
        assert_eq!(regions[0].area, 200);
    }

    #[test]
    fn merge_is_transitive_across_a_chain() {
        let config = DetectorConfig {
            merge_nearby_regions: true,
            merge_distance: 30.0,
            ..exact_config()
        };
        let extractor = RegionExtractor::new(&config);
        // a-b and b-c are within range; a-c alone would not be.
        let mask = mask_with_blocks(
            120,
            40,
            &[(0, 10, 10, 10), (25, 10, 10, 10), (50, 10, 10, 10)],
        );
        let regions = extractor.extract(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].bounds.width, 60);
        assert_eq!(regions[0].area, 300);
    }

    #[test]
    fn distant_regions_stay_separate() {
        let config = DetectorConfig {
            merge_nearby_regions: true,
            merge_distance: 10.0,
            ..exact_config()
        };
        let extractor = RegionExtractor::new(&config);
        let mask = mask_with_blocks(200, 50, &[(10, 10, 10, 10), (150, 10, 10, 10)]);
        assert_eq!(extractor.extract(&mask).len(), 2);
    }

    #[test]
    fn large_objects_are_tagged() {
        let extractor = RegionExtractor::new(&exact_config());
        // 70x70 = 4900 >= 3000; 25x24 = 600 stays ordinary.
        let mask = mask_with_blocks(200, 200, &[(0, 0, 70, 70), (100, 100, 25, 24)]);
        let regions = extractor.extract(&mask);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].kind, RegionKind::Large);
        assert_eq!(regions[0].area, 4900);
        assert_eq!(regions[1].kind, RegionKind::Ordinary);
        assert_eq!(regions[1].area, 600);
    }

    #[test]
    fn cap_keeps_the_largest_regions_in_descending_order() {
        let config = DetectorConfig {
            max_regions_per_tick: Some(2),
            ..exact_config()
        };
        let extractor = RegionExtractor::new(&config);
        let mask = mask_with_blocks(
            200,
            200,
            &[(0, 0, 5, 5), (50, 0, 10, 10), (100, 0, 8, 8), (0, 100, 12, 12)],
        );
        let regions = extractor.extract(&mask);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].area, 144);
        assert_eq!(regions[1].area, 100);
    }

    #[test]
    fn morphology_grows_and_bridges_fragments() {
        let config = DetectorConfig {
            morphology_kernel_size: 3,
            min_contour_area: 50,
            max_contour_area: 10_000,
            ..exact_config()
        };
        let extractor = RegionExtractor::new(&config);
        // Two 10x10 blocks separated by a 3px gap: the bridging dilation
        // passes (radius 1, twice) close the gap into one component.
        let mask = mask_with_blocks(60, 30, &[(5, 5, 10, 10), (18, 5, 10, 10)]);
        let regions = extractor.extract(&mask);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].bounds.width >= 23);
    }
}
