//! Closed numeric intervals
//!
//! A [`Range`] is a closed interval `[start, end]` over `f64`. The unit is up
//! to the caller (milliseconds or seconds), as long as it is consistent
//! within a single call.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Range construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("Invalid range: [{start}, {end}] has a NaN bound")]
    InvalidRange { start: f64, end: f64 },
}

/// Which endpoint of a range is being looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Start,
    End,
}

/// A closed interval with `start <= end`
///
/// Serialized as a two element array, `[start, end]`. Deserialization goes
/// through [`make`], so reversed pairs are swapped and NaN bounds rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct Range {
    start: f64,
    end: f64,
}

impl Range {
    /// Create a range, swapping the bounds if needed
    pub fn new(start: f64, end: f64) -> Result<Self, RangeError> {
        if start.is_nan() || end.is_nan() {
            return Err(RangeError::InvalidRange { start, end });
        }

        if start > end {
            Ok(Self { start: end, end: start })
        } else {
            Ok(Self { start, end })
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Value at the given edge
    pub fn edge(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Start => self.start,
            Edge::End => self.end,
        }
    }

    /// Length of the interval (may be infinite)
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the range covers a single point
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, value: f64) -> bool {
        in_range(value, self)
    }
}

impl TryFrom<(f64, f64)> for Range {
    type Error = RangeError;

    fn try_from((start, end): (f64, f64)) -> Result<Self, Self::Error> {
        Range::new(start, end)
    }
}

impl From<Range> for (f64, f64) {
    fn from(range: Range) -> Self {
        (range.start, range.end)
    }
}

/// Build a range from two bounds in any order
pub fn make(start: f64, end: f64) -> Result<Range, RangeError> {
    Range::new(start, end)
}

/// Closed containment test
pub fn in_range(value: f64, range: &Range) -> bool {
    range.start <= value && value <= range.end
}

/// Whether two ranges share at least one point
///
/// True when any endpoint of one lies inside the other. Ranges that only
/// touch at a boundary overlap.
pub fn overlap(a: &Range, b: &Range) -> bool {
    in_range(a.start, b) || in_range(a.end, b) || in_range(b.start, a) || in_range(b.end, a)
}

/// Merge two ranges
///
/// Returns the single covering range when they overlap, otherwise both
/// ranges ordered by start.
pub fn merge(a: Range, b: Range) -> Vec<Range> {
    if overlap(&a, &b) {
        return vec![Range {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        }];
    }

    if a.start > b.start {
        vec![b, a]
    } else {
        vec![a, b]
    }
}

/// Order by start, then by end
pub fn range_cmp(a: &Range, b: &Range) -> Ordering {
    a.start
        .total_cmp(&b.start)
        .then_with(|| a.end.total_cmp(&b.end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: f64, end: f64) -> Range {
        make(start, end).unwrap()
    }

    #[test]
    fn test_make_swaps_bounds() {
        let range = r(5.0, 1.0);
        assert_eq!(range.start(), 1.0);
        assert_eq!(range.end(), 5.0);
    }

    #[test]
    fn test_make_is_order_independent() {
        let pairs = [(0.0, 1.0), (-3.5, 2.25), (7.0, 7.0), (1e9, -1e9)];
        for (a, b) in pairs {
            assert_eq!(make(a, b), make(b, a));
        }
    }

    #[test]
    fn test_make_rejects_nan() {
        assert!(matches!(
            make(f64::NAN, 1.0),
            Err(RangeError::InvalidRange { .. })
        ));
        assert!(make(1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_make_accepts_infinity() {
        let range = r(f64::INFINITY, f64::NEG_INFINITY);
        assert_eq!(range.start(), f64::NEG_INFINITY);
        assert_eq!(range.end(), f64::INFINITY);
    }

    #[test]
    fn test_overlap_touching_boundaries() {
        assert!(overlap(&r(0.0, 1.0), &r(1.0, 2.0)));
        assert!(!overlap(&r(0.0, 1.0), &r(1.5, 2.0)));
    }

    #[test]
    fn test_overlap_containment_is_symmetric() {
        let wide = r(0.0, 10.0);
        let narrow = r(2.0, 3.0);
        assert!(overlap(&wide, &narrow));
        assert!(overlap(&narrow, &wide));
    }

    #[test]
    fn test_overlap_symmetric_grid() {
        let ranges = [
            r(0.0, 1.0),
            r(0.5, 0.75),
            r(1.0, 3.0),
            r(4.0, 4.0),
            r(f64::NEG_INFINITY, 0.0),
            r(2.0, f64::INFINITY),
        ];
        for a in &ranges {
            for b in &ranges {
                assert_eq!(overlap(a, b), overlap(b, a), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_overlap_unbounded() {
        let everything = r(f64::NEG_INFINITY, f64::INFINITY);
        assert!(overlap(&everything, &r(5.0, 6.0)));
        assert!(overlap(&r(f64::NEG_INFINITY, 0.0), &r(0.0, 1.0)));
        assert!(!overlap(&r(f64::NEG_INFINITY, 0.0), &r(0.5, 1.0)));
    }

    #[test]
    fn test_merge() {
        assert_eq!(merge(r(0.0, 2.0), r(1.0, 3.0)), vec![r(0.0, 3.0)]);
        assert_eq!(merge(r(3.0, 4.0), r(0.0, 1.0)), vec![r(0.0, 1.0), r(3.0, 4.0)]);
        assert_eq!(merge(r(0.0, 10.0), r(2.0, 3.0)), vec![r(0.0, 10.0)]);
    }

    #[test]
    fn test_serde_tuple_representation() {
        let json = serde_json::to_string(&r(1.5, 2.0)).unwrap();
        assert_eq!(json, "[1.5,2.0]");

        let parsed: Range = serde_json::from_str("[4, 2]").unwrap();
        assert_eq!(parsed, r(2.0, 4.0));
    }
}
