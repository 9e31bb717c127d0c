// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interval boundaries along a single axis, and reductions over them.

use std::{num::NonZeroUsize, ops::Range};

use ndarray::{prelude::*, RemoveAxis, Slice};
use num_traits::Zero;

/// The start offsets of contiguous, half-open intervals covering an axis.
///
/// e.g. An axis of 10 samples with intervals of width 3 has starts [0, 3, 6,
/// 9], and the intervals are [0..3, 3..6, 6..9, 9..10]. Only the last interval
/// may be shorter than the width, and no interval is ever empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalBins {
    starts: Vec<usize>,
    axis_len: usize,
    width: usize,
}

impl IntervalBins {
    pub fn new(axis_len: usize, width: NonZeroUsize) -> IntervalBins {
        let width = width.get();
        IntervalBins {
            starts: (0..axis_len).step_by(width).collect(),
            axis_len,
            width,
        }
    }

    /// The first sample index of each interval. Strictly increasing, starting
    /// at 0 (if the axis isn't empty).
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// The number of intervals.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// The number of samples along the axis.
    pub fn axis_len(&self) -> usize {
        self.axis_len
    }

    /// The requested number of samples per interval.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The sample range of interval `i`. Panics if `i` is not less than
    /// [`IntervalBins::len`].
    pub fn range(&self, i: usize) -> Range<usize> {
        let start = self.starts[i];
        let end = self.starts.get(i + 1).copied().unwrap_or(self.axis_len);
        start..end
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.len()).map(|i| self.range(i))
    }

    /// The number of samples in each interval.
    pub fn sizes(&self) -> Vec<usize> {
        self.ranges().map(|r| r.len()).collect()
    }

    /// The interval that `sample` belongs to, if it's on the axis.
    pub fn interval_of(&self, sample: usize) -> Option<usize> {
        (sample < self.axis_len).then(|| sample / self.width)
    }
}

/// Fold every sample of each interval along `axis` into an accumulator that
/// starts as `init`. The output's `axis` has one element per interval.
pub(super) fn reduce_axis<A, D, F>(
    arr: ArrayView<A, D>,
    axis: Axis,
    bins: &IntervalBins,
    init: A,
    mut fold: F,
) -> Array<A, D>
where
    A: Clone,
    D: RemoveAxis,
    F: FnMut(&mut A, &A),
{
    let mut dim = arr.raw_dim();
    dim[axis.index()] = bins.len();
    let mut out = Array::from_elem(dim, init);
    for (mut out_lane, range) in out.axis_iter_mut(axis).zip(bins.ranges()) {
        for sample in arr.slice_axis(axis, Slice::from(range)).axis_iter(axis) {
            out_lane.zip_mut_with(&sample, |acc, s| fold(acc, s));
        }
    }
    out
}

pub(super) fn sum_axis<A, D>(arr: ArrayView<A, D>, axis: Axis, bins: &IntervalBins) -> Array<A, D>
where
    A: Clone + Zero,
    D: RemoveAxis,
{
    reduce_axis(arr, axis, bins, A::zero(), |acc, s| {
        *acc = acc.clone() + s.clone()
    })
}

/// Logical-AND reduction. Once an accumulator is false, no further samples are
/// consulted for it, and once a whole interval is false the rest of the
/// interval is skipped.
pub(super) fn and_axis<D>(arr: ArrayView<bool, D>, axis: Axis, bins: &IntervalBins) -> Array<bool, D>
where
    D: RemoveAxis,
{
    let mut dim = arr.raw_dim();
    dim[axis.index()] = bins.len();
    let mut out = Array::from_elem(dim, true);
    for (mut out_lane, range) in out.axis_iter_mut(axis).zip(bins.ranges()) {
        for sample in arr.slice_axis(axis, Slice::from(range)).axis_iter(axis) {
            if !out_lane.iter().any(|&b| b) {
                break;
            }
            out_lane.zip_mut_with(&sample, |acc, &s| *acc = *acc && s);
        }
    }
    out
}

/// Repeat each interval's values over the samples it covers.
pub(super) fn unpack_axis<A, D>(arr: ArrayView<A, D>, axis: Axis, bins: &IntervalBins) -> Array<A, D>
where
    A: Clone,
    D: RemoveAxis,
{
    let indices: Vec<usize> = (0..bins.axis_len()).map(|s| s / bins.width()).collect();
    arr.select(axis, &indices)
}
