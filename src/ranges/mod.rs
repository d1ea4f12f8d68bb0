//! Time-range algebra
//!
//! Pure functions over closed numeric intervals, used to describe, merge
//! and query the sets of intervals that drive playback and export.

pub mod range;
pub mod set;

pub use range::{in_range, make, merge, overlap, range_cmp, Edge, Range, RangeError};
pub use set::{
    add_range, clamp_range, closest, is_normalized, merge_many, parse_ranges_text, transform,
    Closest,
};
