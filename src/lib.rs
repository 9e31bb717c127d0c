// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Solution-interval bookkeeping for radio-interferometric calibration.

Antenna gains are not solved per time/frequency sample, but per *solution
interval*; a block of contiguous timesteps and channels that share one gain.
This crate derives the interval geometry, reduces per-sample quantities
(equation counts, flags) into per-interval quantities and propagates "no usable
data" flags up to the gain flags that a solver consults.
 */

pub mod constants;
pub mod flagging;
pub mod intervals;
pub mod params;

// Re-exports.
pub use flagging::{FlagBit, FlagLayout, FlagWord};
pub use intervals::{
    IntervalBins, IntervalError, IntervalGainState, IntervalGeometry, InvalidConfiguration,
    ModelShape,
};
pub use params::{IntervalArgs, IntervalOptions, ParamsError};
