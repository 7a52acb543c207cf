//! Inclusive year intervals with optional open bounds.
//!
//! A `YearWindow` bounds the validity of a searchable manufacturer name.
//! `None` on either side means the interval is unbounded on that side, which
//! is how a request "from 2018 onward" or a pre-acquisition alias "until 2020"
//! is represented.

use serde::{Deserialize, Serialize};

/// Inclusive interval of calendar years. `start = None` is open toward the
/// past, `end = None` open toward the future.
/// The `Default` window is unbounded on both sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl YearWindow {
    /// The window covering all years.
    pub const UNBOUNDED: YearWindow = YearWindow { start: None, end: None };

    pub fn new(start: i32, end: i32) -> Self {
        Self { start: Some(start), end: Some(end) }
    }

    /// `[year, +inf)`
    pub fn since(start: i32) -> Self {
        Self { start: Some(start), end: None }
    }

    /// `(-inf, year]`
    pub fn until(end: i32) -> Self {
        Self { start: None, end: Some(end) }
    }

    pub fn single(year: i32) -> Self {
        Self::new(year, year)
    }

    /// A window is well-formed when both bounds exist and are ordered, or at
    /// least one side is open.
    pub fn is_well_formed(&self) -> bool {
        match (self.start, self.end) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start.map_or(true, |s| year >= s) && self.end.map_or(true, |e| year <= e)
    }

    /// Intersection of two windows, `None` when they do not overlap.
    pub fn intersect(&self, other: &YearWindow) -> Option<YearWindow> {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (s, None) | (None, s) => s,
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (e, None) | (None, e) => e,
        };
        match (start, end) {
            (Some(s), Some(e)) if s > e => None,
            _ => Some(YearWindow { start, end }),
        }
    }

    /// True when the windows overlap or touch (adjacent years), i.e. their
    /// union is a single interval.
    pub fn touches(&self, other: &YearWindow) -> bool {
        let gap_after = match (self.end, other.start) {
            (Some(e), Some(s)) => s > e.saturating_add(1),
            _ => false,
        };
        let gap_before = match (other.end, self.start) {
            (Some(e), Some(s)) => s > e.saturating_add(1),
            _ => false,
        };
        !gap_after && !gap_before
    }

    /// Union of two overlapping or adjacent windows.
    pub fn merge(&self, other: &YearWindow) -> YearWindow {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        YearWindow { start, end }
    }
}

/// Collapse a set of windows into the minimal ordered set of disjoint
/// windows: sort by start (open start first) and sweep, merging every window
/// that overlaps or touches its predecessor.
pub fn merge_windows(mut windows: Vec<YearWindow>) -> Vec<YearWindow> {
    windows.sort_by_key(|w| (w.start.is_some(), w.start));
    let mut merged: Vec<YearWindow> = Vec::with_capacity(windows.len());
    for w in windows {
        match merged.last_mut() {
            Some(last) if last.touches(&w) => *last = last.merge(&w),
            _ => merged.push(w),
        }
    }
    merged
}
