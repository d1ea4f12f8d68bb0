//! Operations over ordered sequences of ranges
//!
//! Input sequences carry no invariant: they may be unsorted, overlapping or
//! contain duplicates, since their order can encode playback or export
//! order. [`merge_many`] produces the normalized form (sorted, pairwise
//! disjoint, minimal).

use super::range::{in_range, make, merge, range_cmp, Edge, Range, RangeError};
use std::collections::VecDeque;

/// Result of looking up a position against a set of ranges
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Closest {
    /// The value lies inside this range (first match in scan order)
    In(Range),
    /// The value lies outside every range; `next` is the nearest range
    /// starting after it, if any
    Out { next: Option<Range> },
}

impl Closest {
    pub fn is_in(&self) -> bool {
        matches!(self, Closest::In(_))
    }
}

/// Normalize a set of ranges
pub fn merge_many(ranges: &[Range]) -> Vec<Range> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by(range_cmp);

    let mut pending: VecDeque<Range> = sorted.into();
    let mut merged = Vec::with_capacity(pending.len());

    while let Some(mut acc) = pending.pop_front() {
        while let Some(&next) = pending.front() {
            match merge(acc, next).as_slice() {
                [covering] => {
                    acc = *covering;
                    pending.pop_front();
                }
                _ => break,
            }
        }
        merged.push(acc);
    }

    merged
}

/// Add a range and normalize the result
pub fn add_range(ranges: &[Range], range: Range) -> Vec<Range> {
    let mut all = Vec::with_capacity(ranges.len() + 1);
    all.extend_from_slice(ranges);
    all.push(range);
    merge_many(&all)
}

/// Find the range containing `value`, or the next one after it
pub fn closest(value: f64, ranges: &[Range]) -> Closest {
    let mut next: Option<Range> = None;

    for range in ranges {
        if in_range(value, range) {
            return Closest::In(*range);
        }

        if range.start() > value && next.map_or(true, |n| range.start() < n.start()) {
            next = Some(*range);
        }
    }

    Closest::Out { next }
}

/// Map every endpoint through `f`, keeping the original order
///
/// `f` receives the value, the index of the range it belongs to and which
/// edge it is. Each mapped pair is rebuilt with [`make`], so bounds that end
/// up reversed are swapped back.
pub fn transform<F>(ranges: &[Range], mut f: F) -> Result<Vec<Range>, RangeError>
where
    F: FnMut(f64, usize, Edge) -> f64,
{
    ranges
        .iter()
        .enumerate()
        .map(|(index, range)| {
            let start = f(range.start(), index, Edge::Start);
            let end = f(range.end(), index, Edge::End);
            make(start, end)
        })
        .collect()
}

/// Clamp a range into the span covered by `bounds`
///
/// The span runs from the start of the first range to the end of the last
/// one. With no bounds the range is returned as is.
pub fn clamp_range(range: Range, bounds: &[Range]) -> Range {
    let (Some(first), Some(last)) = (bounds.first(), bounds.last()) else {
        return range;
    };

    let lo = first.start();
    let hi = last.end().max(lo);
    let clamp = |v: f64| v.max(lo).min(hi);

    // clamping never yields NaN
    make(clamp(range.start()), clamp(range.end())).unwrap_or(range)
}

/// Parse ranges from text, one `start end` pair per line
///
/// Blank lines and lines whose first two fields are not numbers are
/// skipped.
pub fn parse_ranges_text(text: &str) -> Vec<Range> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let start = fields.next()?.parse::<f64>().ok()?;
            let end = fields.next()?.parse::<f64>().ok()?;
            make(start, end).ok()
        })
        .collect()
}

/// Whether the set is sorted, pairwise disjoint and minimal
pub fn is_normalized(ranges: &[Range]) -> bool {
    ranges.windows(2).all(|w| w[0].end() < w[1].start())
}
