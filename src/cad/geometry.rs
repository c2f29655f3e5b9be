//! Bbox / geometry primitives (§4.1).
//!
//! Every higher CAD module (reader, bounds engine, region inspector) builds
//! on this handful of pure functions: axis-aligned rectangles, intersection,
//! a linear-interpolation quantile, and the IQR outlier filter used to keep
//! a single malformed entity from blowing up a drawing's renderable bounds.

use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in drawing units (millimeters by convention).
///
/// `width`/`height` are always non-negative; a box with either at zero is
/// considered empty and never intersects anything (§4.1 Intersection).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bbox {
    /// Construct a box, clamping a malformed (negative) width/height to zero.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Bbox {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Construct directly from two opposite corners, normalizing order.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let (x1, x2) = (x1.min(x2), x1.max(x2));
        let (y1, y2) = (y1.min(y2), y1.max(y2));
        Bbox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Right edge.
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Top edge.
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// True when this box has zero area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Geometric center, used by the IQR outlier filter.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Rectangle intersection per §4.1: `not (a.x2 < b.x1 or a.x1 > b.x2 or
    /// a.y2 < b.y1 or a.y1 > b.y2)`. An empty box (this or `other`) never
    /// intersects.
    pub fn intersects(&self, other: &Bbox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        !(self.x2() < other.x || self.x > other.x2() || self.y2() < other.y || self.y > other.y2())
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Bbox) -> Bbox {
        Bbox::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.x2().max(other.x2()),
            self.y2().max(other.y2()),
        )
    }
}

/// Merge a slice of boxes into the smallest box containing all of them.
/// Returns `None` for an empty slice.
pub fn merge_boxes(boxes: &[Bbox]) -> Option<Bbox> {
    let mut iter = boxes.iter();
    let first = *iter.next()?;
    Some(iter.fold(first, |acc, b| acc.union(b)))
}

/// Linear-interpolation quantile (§4.1): `q <= 0` returns the minimum,
/// `q >= 1` the maximum, otherwise `pos = (n-1) * q` blended between the
/// floor and ceiling ranked values. `values` need not be pre-sorted.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if q <= 0.0 {
        return sorted[0];
    }
    if q >= 1.0 {
        return sorted[sorted.len() - 1];
    }

    let pos = (sorted.len() - 1) as f64 * q;
    let floor = pos.floor() as usize;
    let ceil = pos.ceil() as usize;
    if floor == ceil {
        return sorted[floor];
    }
    let frac = pos - floor as f64;
    sorted[floor] + (sorted[ceil] - sorted[floor]) * frac
}

/// Reject outlier box centers via the IQR rule (§4.1), independently per
/// axis: a center is kept when it falls within `[q1 - 4*iqr, q3 + 4*iqr]`
/// on both x and y (`iqr` floored at 1.0 so a degenerate zero-spread axis
/// never produces a zero-width accept band). Filtering is skipped
/// entirely under 20 boxes. If the filtered set would drop below
/// `max(10, 0.2*n)` entries, filtering is rejected wholesale and the
/// original list is returned unchanged.
pub fn iqr_filter(boxes: &[Bbox]) -> Vec<Bbox> {
    let n = boxes.len();
    if n < 20 {
        return boxes.to_vec();
    }

    let centers: Vec<(f64, f64)> = boxes.iter().map(|b| b.center()).collect();
    let xs: Vec<f64> = centers.iter().map(|c| c.0).collect();
    let ys: Vec<f64> = centers.iter().map(|c| c.1).collect();

    let (x_lo, x_hi) = axis_bounds(&xs);
    let (y_lo, y_hi) = axis_bounds(&ys);

    let filtered: Vec<Bbox> = boxes
        .iter()
        .zip(centers.iter())
        .filter(|(_, (cx, cy))| *cx >= x_lo && *cx <= x_hi && *cy >= y_lo && *cy <= y_hi)
        .map(|(b, _)| *b)
        .collect();

    let min_keep = ((n as f64) * 0.2).max(10.0);
    if (filtered.len() as f64) < min_keep {
        boxes.to_vec()
    } else {
        filtered
    }
}

fn axis_bounds(values: &[f64]) -> (f64, f64) {
    let q1 = quantile(values, 0.25);
    let q3 = quantile(values, 0.75);
    let iqr = (q3 - q1).max(1.0);
    (q1 - 4.0 * iqr, q3 + 4.0 * iqr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_respects_crossing_edges() {
        // LINE from (-50, 150) to (150, 150): bbox is a zero-height sliver,
        // but it still crosses the query region per §8 scenario 3.
        let line = Bbox::from_corners(-50.0, 150.0, 150.0, 150.0);
        let region = Bbox::new(0.0, 100.0, 100.0, 100.0);
        assert!(line.intersects(&region));
    }

    #[test]
    fn empty_box_never_intersects() {
        let empty = Bbox::new(0.0, 0.0, 0.0, 10.0);
        let region = Bbox::new(-5.0, -5.0, 20.0, 20.0);
        assert!(!empty.intersects(&region));
    }

    #[test]
    fn quantile_endpoints_and_midpoint() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
        assert_eq!(quantile(&values, 0.5), 2.5);
    }

    #[test]
    fn iqr_filter_rejects_extreme_outlier() {
        let mut boxes: Vec<Bbox> = (0..30)
            .map(|i| Bbox::new(i as f64, i as f64, 1.0, 1.0))
            .collect();
        boxes.push(Bbox::new(1_000_000_000.0, 1_000_000_000.0, 1.0, 1.0));
        let filtered = iqr_filter(&boxes);
        assert!(filtered.len() < boxes.len());
        assert!(filtered.iter().all(|b| b.x < 1_000.0));
    }

    #[test]
    fn iqr_filter_skips_filtering_under_twenty_boxes() {
        let boxes = vec![
            Bbox::new(0.0, 0.0, 1.0, 1.0),
            Bbox::new(100.0, 100.0, 1.0, 1.0),
            Bbox::new(1_000_000.0, 1_000_000.0, 1.0, 1.0),
        ];
        // n=3 < 20: filtering is skipped entirely, original list untouched.
        let filtered = iqr_filter(&boxes);
        assert_eq!(filtered.len(), boxes.len());
    }

    #[test]
    fn merge_boxes_covers_all_inputs() {
        let boxes = vec![Bbox::new(0.0, 0.0, 1.0, 1.0), Bbox::new(5.0, 5.0, 1.0, 1.0)];
        let merged = merge_boxes(&boxes).unwrap();
        assert_eq!(merged.x, 0.0);
        assert_eq!(merged.y, 0.0);
        assert_eq!(merged.x2(), 6.0);
        assert_eq!(merged.y2(), 6.0);
    }
}
