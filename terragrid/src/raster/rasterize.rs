//! Scanline polygon fill.

use super::BitRaster;
use crate::coord::DataView;
use crate::raster::Raster;

/// A closed ring of block-space points. The closing edge is implicit.
pub type Ring = Vec<(f64, f64)>;

/// Fills every cell of `view` whose centre lies inside `rings`.
///
/// Uses the even-odd rule over all rings together, so a ring nested inside
/// another cuts a hole in it.
pub fn fill_rings(view: &DataView, rings: &[Ring]) -> BitRaster {
    let mut raster = Raster::for_view(view);
    fill_rings_into(&mut raster, view, rings);
    raster
}

/// Like [`fill_rings`], setting cells on an existing raster.
pub fn fill_rings_into(raster: &mut BitRaster, view: &DataView, rings: &[Ring]) {
    let mut crossings: Vec<f64> = Vec::new();

    for row in 0..view.height() {
        let y = view.y() as f64 + row as f64 + 0.5;

        crossings.clear();
        for ring in rings {
            collect_crossings(ring, y, &mut crossings);
        }
        if crossings.len() < 2 {
            continue;
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            // Cells whose centre x + 0.5 lies in [start, end)
            let start = (span[0] - 0.5).ceil() as i64 - view.x() as i64;
            let end = (span[1] - 0.5).ceil() as i64 - view.x() as i64;
            let start = start.clamp(0, view.width() as i64) as usize;
            let end = end.clamp(0, view.width() as i64) as usize;
            for col in start..end {
                raster.set(col, row, true);
            }
        }
    }
}

fn collect_crossings(ring: &Ring, y: f64, out: &mut Vec<f64>) {
    if ring.len() < 3 {
        return;
    }
    for i in 0..ring.len() {
        let (x0, y0) = ring[i];
        let (x1, y1) = ring[(i + 1) % ring.len()];
        // Half-open rule so shared vertices count once
        if (y0 <= y && y < y1) || (y1 <= y && y < y0) {
            let t = (y - y0) / (y1 - y0);
            out.push(x0 + t * (x1 - x0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Ring {
        vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }

    #[test]
    fn test_fills_square() {
        let view = DataView::square(0, 0, 8);
        let raster = fill_rings(&view, &[square(2.0, 2.0, 6.0, 6.0)]);

        assert!(raster.get(2, 2));
        assert!(raster.get(5, 5));
        assert!(!raster.get(1, 2));
        assert!(!raster.get(6, 5));
        assert_eq!(raster.data().iter().filter(|&&v| v).count(), 16);
    }

    #[test]
    fn test_hole_is_empty() {
        let view = DataView::square(0, 0, 8);
        let rings = [square(0.0, 0.0, 8.0, 8.0), square(2.0, 2.0, 4.0, 4.0)];
        let raster = fill_rings(&view, &rings);

        assert!(raster.get(0, 0));
        assert!(!raster.get(2, 2));
        assert!(!raster.get(3, 3));
        assert!(raster.get(4, 4));
    }

    #[test]
    fn test_offset_view_clips() {
        let view = DataView::square(100, 100, 4);
        let raster = fill_rings(&view, &[square(98.0, 98.0, 102.0, 102.0)]);

        assert!(raster.get(0, 0));
        assert!(raster.get(1, 1));
        assert!(!raster.get(2, 2));
    }

    #[test]
    fn test_degenerate_ring_ignored() {
        let view = DataView::square(0, 0, 4);
        let raster = fill_rings(&view, &[vec![(0.0, 0.0), (4.0, 4.0)]]);
        assert!(raster.data().iter().all(|v| !v));
    }
}
